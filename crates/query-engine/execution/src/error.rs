//! Errors for search execution.

use thiserror::Error;

use query_engine_translation::translation;

/// Errors returned while running a search.
#[derive(Debug, Error)]
pub enum Error {
    /// The rows cannot be both kept distinct on these fields and ordered as requested.
    #[error("cannot order rows kept distinct on {}", fields.join(", "))]
    UnsupportedDistinctCombination { fields: Vec<String> },
    #[error("database error: {0}")]
    Database(#[source] sqlx::Error),
    #[error(transparent)]
    Translation(#[from] translation::error::Error),
    #[error("could not decode a result: {0}")]
    Decode(String),
}

/// SQLSTATE of "SELECT DISTINCT ON expressions must match initial ORDER BY expressions".
const INVALID_DISTINCT_ORDER: &str = "42P10";

impl Error {
    /// Classify an error raised by the database while running a search keeping rows distinct on
    /// `distinct_fields`.
    pub fn from_database(error: sqlx::Error, distinct_fields: &[String]) -> Error {
        match &error {
            sqlx::Error::Database(database_error)
                if database_error.code().as_deref() == Some(INVALID_DISTINCT_ORDER) =>
            {
                Error::UnsupportedDistinctCombination {
                    fields: distinct_fields.to_vec(),
                }
            }
            sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
                Error::Decode(error.to_string())
            }
            _ => Error::Database(error),
        }
    }
}
