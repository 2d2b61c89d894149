//! Metadata information regarding the database and the reporting formats built on top of it.

pub mod database;
pub mod formats;
pub mod units;
pub mod validation;

// re-export without modules
pub use database::*;
pub use formats::*;
pub use units::*;
pub use validation::ValidationError;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Metadata information.
///
/// Built once at startup and then only ever read. Callers needing a variation construct a new
/// value rather than changing a shared one.
#[derive(Clone, PartialEq, Eq, Debug, Default, Serialize, Deserialize, JsonSchema)]
pub struct Metadata {
    pub entities: Entities,
    pub formats: Formats,
}

impl Metadata {
    pub fn empty() -> Self {
        Metadata {
            entities: Entities::empty(),
            formats: Formats::empty(),
        }
    }

    /// Lookup a format by its id.
    pub fn format(&self, format_id: &str) -> Option<&Format> {
        self.formats.0.get(format_id)
    }

    /// Lookup an entity by its name.
    pub fn entity(&self, entity_name: &str) -> Option<&EntityInfo> {
        self.entities.0.get(entity_name)
    }

    /// The ids of every format, in declaration order.
    pub fn format_ids(&self) -> Vec<&str> {
        self.formats.0.keys().map(String::as_str).collect()
    }
}

/// Split a path into its hops. The empty path has no hops.
pub fn path_tokens(path: &str) -> Vec<&str> {
    if path.is_empty() {
        vec![]
    } else {
        path.split(query_engine_models::PATH_DELIMITER).collect()
    }
}

/// Join hops into a path, skipping empty hops.
pub fn join_tokens<'a>(tokens: impl IntoIterator<Item = &'a str>) -> String {
    tokens
        .into_iter()
        .filter(|token| !token.is_empty())
        .collect::<Vec<_>>()
        .join(query_engine_models::PATH_DELIMITER)
}
