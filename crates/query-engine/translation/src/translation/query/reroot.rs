//! Rewrite field paths so they are relative to a different instance of the same format.
//!
//! Every instance knows the hops from the format's root to itself (`join_path`) and back
//! (`reverse_join_path`). The path from instance A to instance B climbs from A towards the root
//! until it reaches the branch B hangs off, then descends to B:
//!
//! * take the longest common prefix of both join paths;
//! * from A's reverse path, drop as many hops at the end as the prefix is long;
//! * append B's join path with the prefix removed.

use std::collections::BTreeMap;

use query_engine_metadata::metadata::{join_tokens, path_tokens, Format};
use query_engine_models::{Condition, Node};

use crate::translation::error::Error;

/// The path of `target_instance` as seen from `new_root`.
pub fn relative_instance_path(
    format_id: &str,
    format: &Format,
    new_root: &str,
    target_instance: &str,
) -> Result<String, Error> {
    let unknown = |instance: &str| Error::UnknownInstance {
        format: format_id.to_string(),
        instance: instance.to_string(),
    };
    let root = format.instance(new_root).ok_or_else(|| unknown(new_root))?;
    let target = format
        .instance(target_instance)
        .ok_or_else(|| unknown(target_instance))?;
    if new_root == target_instance {
        return Ok(String::new());
    }

    let root_forward = path_tokens(&root.join_path);
    let target_forward = path_tokens(&target.join_path);
    let common = root_forward
        .iter()
        .zip(&target_forward)
        .take_while(|(a, b)| a == b)
        .count();

    let root_reverse = path_tokens(&root.reverse_join_path);
    let climb = &root_reverse[..root_reverse.len().saturating_sub(common)];
    Ok(join_tokens(
        climb.iter().chain(&target_forward[common..]).copied(),
    ))
}

/// Every instance of the format, keyed by its path relative to `from_instance`.
pub fn instance_paths<'a>(
    format_id: &str,
    format: &'a Format,
    from_instance: &str,
) -> Result<BTreeMap<String, &'a str>, Error> {
    let mut paths: BTreeMap<String, &'a str> = BTreeMap::new();
    for instance_name in format.model_instances.keys() {
        let path = relative_instance_path(format_id, format, from_instance, instance_name)?;
        if let Some(first) = paths.get(&path) {
            return Err(Error::AmbiguousInstance {
                format: format_id.to_string(),
                root: from_instance.to_string(),
                path,
                first: (*first).to_string(),
                second: instance_name.clone(),
            });
        }
        paths.insert(path, instance_name.as_str());
    }
    Ok(paths)
}

/// Rewrite every condition of `tree` from paths relative to `from_instance` to paths relative to
/// `to_instance`. The input tree is left untouched.
pub fn reroot(
    tree: &Node,
    format_id: &str,
    format: &Format,
    from_instance: &str,
    to_instance: &str,
) -> Result<Node, Error> {
    let from_paths = instance_paths(format_id, format, from_instance)?;
    let mut rewritten = BTreeMap::<&str, String>::new();
    for (path, instance_name) in &from_paths {
        rewritten.insert(
            path.as_str(),
            relative_instance_path(format_id, format, to_instance, instance_name)?,
        );
    }

    tree.map_conditions(&mut |condition: &Condition| -> Result<Condition, Error> {
        let (instance_path, field_name) = condition.split_path();
        let new_instance_path =
            rewritten
                .get(instance_path)
                .ok_or_else(|| Error::UnknownInstance {
                    format: format_id.to_string(),
                    instance: instance_path.to_string(),
                })?;
        Ok(Condition {
            field_path: join_tokens([new_instance_path.as_str(), field_name]),
            ..condition.clone()
        })
    })
}

/// Rewrite a tree of the format's root so that it is relative to `to_instance`.
pub fn reroot_from_root(
    tree: &Node,
    format_id: &str,
    format: &Format,
    to_instance: &str,
) -> Result<Node, Error> {
    let (root_instance, _) = format.root_instance().ok_or_else(|| Error::UnknownInstance {
        format: format_id.to_string(),
        instance: String::new(),
    })?;
    reroot(tree, format_id, format, root_instance, to_instance)
}
