pub mod service;

pub use service::AutoShutdownPolicy;
