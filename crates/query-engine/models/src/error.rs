//! Errors raised while reading a query tree.

use thiserror::Error;

/// A query tree could not be turned into a typed [`crate::Node`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreeError {
    #[error("malformed query tree: {0}")]
    MalformedTree(String),
    #[error("unknown comparator '{0}'")]
    UnknownComparator(String),
    #[error("unknown group combinator '{0}'")]
    UnknownCombinator(String),
    #[error("unable to parse query: {0}")]
    Json(String),
}

impl TreeError {
    pub(crate) fn malformed(message: impl Into<String>) -> Self {
        TreeError::MalformedTree(message.into())
    }
}
