pub mod auto_shutdown;
pub mod command_dispatch;
#[cfg(feature = "docker")]
pub mod docker;
pub mod reconciliation;
pub mod state_store;
