//! Boundary checks on whole queries.

use crate::error::TreeError;
use crate::query::Query;
use crate::tree::{BaseComparator, Node};

/// Is the query structurally usable against the given formats?
///
/// The selected format must be known and have a tree, every tree must belong to a known format and
/// have a group at its root.
pub fn is_query_object_well_formed<S: AsRef<str>>(query: &Query, known_format_ids: &[S]) -> bool {
    check_query_object(query, known_format_ids).is_ok()
}

/// Like [`is_query_object_well_formed`], but says what is wrong.
pub fn check_query_object<S: AsRef<str>>(
    query: &Query,
    known_format_ids: &[S],
) -> Result<(), TreeError> {
    let is_known = |format_id: &str| known_format_ids.iter().any(|id| id.as_ref() == format_id);

    if !is_known(&query.selected_format_id) {
        return Err(TreeError::MalformedTree(format!(
            "selected format '{}' is unknown",
            query.selected_format_id
        )));
    }
    if !query.searches.contains_key(&query.selected_format_id) {
        return Err(TreeError::MalformedTree(format!(
            "selected format '{}' has no search",
            query.selected_format_id
        )));
    }
    for (format_id, search) in &query.searches {
        if !is_known(format_id) {
            return Err(TreeError::MalformedTree(format!(
                "search for unknown format '{format_id}'"
            )));
        }
        if !matches!(search.tree, Node::Group(_)) {
            return Err(TreeError::MalformedTree(format!(
                "the tree of format '{format_id}' is not rooted at a group"
            )));
        }
    }
    Ok(())
}

/// Has the user filled in the selected tree?
///
/// Every non-static condition needs a value (null checks ignore their value), no group may be
/// empty, and there must be at least one non-static condition.
pub fn is_query_populated(query: &Query) -> bool {
    match query.selected_tree() {
        None => false,
        Some(tree) => {
            let mut user_conditions = 0;
            is_node_populated(tree, &mut user_conditions) && user_conditions > 0
        }
    }
}

fn is_node_populated(node: &Node, user_conditions: &mut usize) -> bool {
    match node {
        Node::Group(group) => {
            !group.children.is_empty()
                && group
                    .children
                    .iter()
                    .all(|child| is_node_populated(child, user_conditions))
        }
        Node::Condition(condition) if condition.is_static => true,
        Node::Condition(condition) => {
            *user_conditions += 1;
            condition.comparator.base == BaseComparator::IsNull
                || !condition.value.trim().is_empty()
        }
    }
}

/// A skeleton tree must offer at least one empty, non-static condition for the user to fill in.
pub fn check_has_empty_slot(tree: &Node) -> Result<(), TreeError> {
    if !matches!(tree, Node::Group(_)) {
        return Err(TreeError::malformed("the tree is not rooted at a group"));
    }
    if tree.count_empty_conditions() == 0 {
        return Err(TreeError::malformed(
            "the tree has no empty, non-static condition",
        ));
    }
    Ok(())
}
