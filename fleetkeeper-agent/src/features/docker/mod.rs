pub mod repo;

pub use repo::DockerRuntime;
