//! Decide how the related records of each instance are loaded alongside the root records.
//!
//! Loading every related record of a matching root record is fine for instances merged into the
//! root's row. A split-rows many-to-many instance only shows the related records that match the
//! search themselves, so those, and the records reached through them, are loaded through a
//! subquery filtered by the search re-rooted at that instance.

use query_engine_metadata::metadata::Format;
use query_engine_models::{Node, PATH_DELIMITER};

use super::reroot;
use crate::translation::error::Error;

/// How the records at one relationship path are loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Prefetch {
    /// Every related record.
    Path(String),
    /// Only the related records reached through records of `instance` matching `tree`, which is
    /// relative to `instance`. `path` is the join path of `instance` or one extending it.
    Subquery {
        path: String,
        tree: Node,
        instance: String,
    },
}

impl Prefetch {
    pub fn path(&self) -> &str {
        match self {
            Prefetch::Path(path) | Prefetch::Subquery { path, .. } => path,
        }
    }
}

/// Whether `path` continues `prefix` by at least one hop.
pub fn extends(path: &str, prefix: &str) -> bool {
    path.strip_prefix(prefix)
        .is_some_and(|rest| rest.starts_with(PATH_DELIMITER))
}

/// Plan the prefetches of every non-root instance of the format, in declaration order.
///
/// Instances below a split-rows many-to-many instance are filtered by that instance's subquery,
/// the closest one when several enclose them. A plain path that is a prefix of another planned
/// path is dropped, since loading the longer path loads it too. Subqueries are always kept.
pub fn plan_prefetches(
    format_id: &str,
    format: &Format,
    tree: &Node,
) -> Result<Vec<Prefetch>, Error> {
    let mut filtered: Vec<(&str, &str, Node)> = vec![];
    for (instance_name, instance) in &format.model_instances {
        let many_related = &instance.many_related;
        let split = many_related.is_many_to_many && many_related.split_rows;
        if split && !instance.join_path.is_empty() {
            filtered.push((
                instance.join_path.as_str(),
                instance_name.as_str(),
                reroot::reroot_from_root(tree, format_id, format, instance_name)?,
            ));
        }
    }

    let mut planned = vec![];
    for instance in format.model_instances.values() {
        let path = instance.join_path.as_str();
        if path.is_empty() {
            continue;
        }
        let enclosing = filtered
            .iter()
            .filter(|(filtered_path, _, _)| {
                *filtered_path == path || extends(path, filtered_path)
            })
            .max_by_key(|(filtered_path, _, _)| filtered_path.len());
        match enclosing {
            Some((_, instance_name, rerooted)) => planned.push(Prefetch::Subquery {
                path: path.to_string(),
                tree: rerooted.clone(),
                instance: (*instance_name).to_string(),
            }),
            None => planned.push(Prefetch::Path(path.to_string())),
        }
    }

    let mut prefetches: Vec<Prefetch> = vec![];
    for prefetch in &planned {
        let subsumed = match prefetch {
            Prefetch::Path(path) => planned.iter().any(|other| extends(other.path(), path)),
            Prefetch::Subquery { .. } => false,
        };
        if !subsumed && !prefetches.contains(prefetch) {
            prefetches.push(prefetch.clone());
        }
    }
    Ok(prefetches)
}
