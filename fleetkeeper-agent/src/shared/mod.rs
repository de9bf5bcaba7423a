pub mod config;
pub mod error;
pub mod runtime;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;
