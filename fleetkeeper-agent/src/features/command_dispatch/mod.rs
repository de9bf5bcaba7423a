pub mod controller;
pub mod repo;
pub mod service;

pub use controller::CommandController;
pub use repo::{CommandQueue, CommandReceiver, CommandTicket, QueuedCommand};
pub use service::CommandExecutor;
