//! Errors for translation.

use thiserror::Error;

use query_engine_models::TreeError;

/// A type for translation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error(transparent)]
    Tree(#[from] TreeError),
    #[error("format '{0}' not found")]
    UnknownFormat(String),
    #[error("the query selects format '{selected}' but format '{requested}' was requested")]
    FormatMismatch { selected: String, requested: String },
    #[error("format '{format}' has no instance '{instance}'")]
    UnknownInstance { format: String, instance: String },
    #[error(
        "format '{format}': instances '{first}' and '{second}' are both reached by '{path}' from '{root}'"
    )]
    AmbiguousInstance {
        format: String,
        root: String,
        path: String,
        first: String,
        second: String,
    },
    #[error("format '{format}' has no field '{path}'")]
    UnknownField { format: String, path: String },
    #[error("field '{path}' is not searchable")]
    FieldNotSearchable { path: String },
    #[error("entity '{0}' not found")]
    UnknownEntity(String),
    #[error("entity '{entity}' has no relationship '{relationship}'")]
    UnknownRelationship {
        entity: String,
        relationship: String,
    },
    #[error("entity '{entity}' has no column '{column}'")]
    UnknownColumn { entity: String, column: String },
    #[error("field '{path}' does not accept units '{units}'")]
    InvalidUnits { path: String, units: String },
    #[error("field '{path}' does not support the comparator '{comparator}'")]
    ComparatorNotSupported { path: String, comparator: String },
    #[error("the selected search has no filled in condition")]
    NotPopulated,
    #[error("the default tree of format '{format}' has {count} empty conditions, expected exactly one")]
    BasicQuerySlot { format: String, count: usize },
}
