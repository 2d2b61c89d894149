//! Running search plans against a storage backend.

pub mod backend;
pub mod error;
pub mod metrics;
pub mod postgres;

pub use backend::{Backend, Row, SearchResults, Stats, StatsValue};
pub use error::Error;
