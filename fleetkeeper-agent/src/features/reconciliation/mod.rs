pub mod controller;
pub mod service;

pub use controller::ReconciliationController;
pub use service::{refresh_snapshot, PassReport, Reconciler};
