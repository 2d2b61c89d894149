//! A user query: one tree per format, one of which is selected.

use std::collections::BTreeMap;

use crate::error::TreeError;
use crate::tree::Node;
use crate::wire;

/// A query keeps a tree for every format so the UI can switch formats without losing input.
/// Only the tree of the selected format is compiled.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "wire::RawQuery", into = "wire::RawQuery")]
pub struct Query {
    pub selected_format_id: String,
    pub searches: BTreeMap<String, Search>,
}

/// The tree of one format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Search {
    /// Display name of the format.
    pub name: String,
    pub tree: Node,
}

impl Query {
    /// Read a query from its JSON wire representation.
    pub fn from_json(value: serde_json::Value) -> Result<Query, TreeError> {
        let raw: wire::RawQuery =
            serde_json::from_value(value).map_err(|err| TreeError::Json(err.to_string()))?;
        Query::try_from(raw)
    }

    /// The JSON wire representation of this query.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(wire::RawQuery::from(self.clone())).unwrap_or_default()
    }

    /// The tree of the selected format, if the query has one.
    pub fn selected_tree(&self) -> Option<&Node> {
        self.tree_for(&self.selected_format_id)
    }

    pub fn tree_for(&self, format_id: &str) -> Option<&Node> {
        self.searches.get(format_id).map(|search| &search.tree)
    }
}

impl schemars::JsonSchema for Query {
    fn schema_name() -> String {
        "Query".to_string()
    }

    fn json_schema(gen: &mut schemars::gen::SchemaGenerator) -> schemars::schema::Schema {
        <wire::RawQuery as schemars::JsonSchema>::json_schema(gen)
    }
}
