//! Fixtures and an in-memory backend shared by the test suites of the workspace.

pub mod fixtures;
pub mod memory;

pub use fixtures::{init_logging, laboratory_backend, laboratory_configuration, laboratory_dataset};
pub use memory::{Dataset, InMemoryBackend};
