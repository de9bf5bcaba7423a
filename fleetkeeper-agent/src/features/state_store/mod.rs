pub mod repo;

pub use repo::StateStore;
