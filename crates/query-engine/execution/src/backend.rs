//! The seam between search planning and storage.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use query_engine_metadata::metadata::Metadata;
use query_engine_translation::translation::query::SearchPlan;

use crate::error::Error;

/// One output row: a root record, the records related to it, and its annotations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    /// The primary key of the root record, as text.
    pub key: String,
    pub record: serde_json::Value,
    /// Keys of related records identifying a split row.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, Option<String>>,
    /// Related records by relationship path.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub related: BTreeMap<String, Vec<serde_json::Value>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsValue {
    pub value: String,
    /// The number of distinct root records having the value.
    pub count: u64,
}

/// The most frequent values of one reporting dimension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub name: String,
    pub display_name: String,
    pub values: Vec<StatsValue>,
    /// How many distinct values there are, including those cut off.
    pub distinct_values: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResults {
    pub rows: Vec<Row>,
    /// The number of rows without pagination.
    pub total_count: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stats: Option<Vec<Stats>>,
}

/// A storage layer able to run search plans.
#[async_trait]
pub trait Backend: Send + Sync {
    async fn search(&self, metadata: &Metadata, plan: &SearchPlan) -> Result<SearchResults, Error>;
}

/// Keep the `top_n` most frequent non-empty values, most frequent first and alphabetically among
/// equally frequent ones.
pub fn summarize_stats(
    name: &str,
    display_name: &str,
    top_n: usize,
    values: impl IntoIterator<Item = StatsValue>,
) -> Stats {
    let mut values: Vec<StatsValue> = values
        .into_iter()
        .filter(|stats_value| !stats_value.value.trim().is_empty())
        .collect();
    values.sort_by(|left, right| {
        right
            .count
            .cmp(&left.count)
            .then_with(|| left.value.cmp(&right.value))
    });
    let distinct_values = values.len();
    values.truncate(top_n);
    Stats {
        name: name.to_string(),
        display_name: display_name.to_string(),
        values,
        distinct_values,
    }
}
