//! Errors returned by the search service.

use thiserror::Error;

use query_engine_execution as execution;
use query_engine_models::TreeError;
use query_engine_translation::translation;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Tree(#[from] TreeError),
    #[error(transparent)]
    Translation(#[from] translation::error::Error),
    #[error(transparent)]
    Execution(#[from] execution::Error),
    /// A hidden field was searched, and no record matched it.
    #[error("no record has '{field}' {comparator} '{value}' to hand off to '{handoff_field}'")]
    NoHandoffMatch {
        field: String,
        comparator: String,
        value: String,
        handoff_field: String,
    },
    /// A hidden field was searched, and the matching records disagree on the displayed field.
    #[error(
        "records with '{field}' {comparator} '{value}' have several '{handoff_field}': {}",
        values.join(", ")
    )]
    AmbiguousHandoff {
        field: String,
        comparator: String,
        value: String,
        handoff_field: String,
        values: Vec<String>,
    },
}
