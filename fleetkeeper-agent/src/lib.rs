pub mod features;
pub mod shared;
pub mod supervisor;

pub use supervisor::Supervisor;
