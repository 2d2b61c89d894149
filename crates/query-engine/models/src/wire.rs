//! The JSON shape of query trees, as produced and consumed by the search UI.
//!
//! Every field is optional here so that a missing discriminator or combinator can be reported
//! precisely when converting into the typed tree.

use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::TreeError;
use crate::query::{Query, Search};
use crate::tree::{Combinator, Comparator, Condition, Group, Node};
use crate::IDENTITY_UNITS;

const GROUP_TYPE: &str = "group";
const CONDITION_TYPE: &str = "query";

/// A query tree node as sent over the wire.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[schemars(rename = "QueryNode")]
pub struct RawNode {
    /// Either `group` or `query`.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub r#type: Option<String>,
    /// The combinator of a group, or the value of a condition.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub val: Option<String>,
    #[serde(rename = "static", default)]
    pub is_static: bool,
    #[serde(rename = "queryGroup", default, skip_serializing_if = "Option::is_none")]
    pub query_group: Option<Vec<RawNode>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pos: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fld: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ncmp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub units: Option<String>,
}

/// A whole query as sent over the wire.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RawQuery {
    pub selectedtemplate: String,
    pub searches: BTreeMap<String, RawSearch>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RawSearch {
    #[serde(default)]
    pub name: String,
    pub tree: RawNode,
}

impl TryFrom<RawNode> for Node {
    type Error = TreeError;

    fn try_from(raw: RawNode) -> Result<Self, Self::Error> {
        match raw.r#type.as_deref() {
            None => Err(TreeError::malformed("node has no 'type'")),
            Some(GROUP_TYPE) => {
                let combinator = raw
                    .val
                    .ok_or_else(|| TreeError::malformed("group has no combinator"))?;
                let children = raw
                    .query_group
                    .ok_or_else(|| TreeError::malformed("group has no 'queryGroup'"))?;
                Ok(Node::Group(Group {
                    combinator: Combinator::parse(&combinator)?,
                    is_static: raw.is_static,
                    children: children
                        .into_iter()
                        .map(Node::try_from)
                        .collect::<Result<Vec<_>, _>>()?,
                }))
            }
            Some(CONDITION_TYPE) => {
                let field_path = raw
                    .fld
                    .ok_or_else(|| TreeError::malformed("condition has no 'fld'"))?;
                let comparator = raw
                    .ncmp
                    .ok_or_else(|| TreeError::malformed("condition has no 'ncmp'"))?;
                Ok(Node::Condition(Condition {
                    field_path,
                    comparator: Comparator::parse(&comparator)?,
                    value: raw.val.unwrap_or_default(),
                    units: raw.units.unwrap_or_else(|| IDENTITY_UNITS.to_string()),
                    is_static: raw.is_static,
                    pos: raw.pos.unwrap_or_default(),
                }))
            }
            Some(other) => Err(TreeError::malformed(format!("unknown node type '{other}'"))),
        }
    }
}

impl From<Node> for RawNode {
    fn from(node: Node) -> Self {
        match node {
            Node::Group(group) => RawNode {
                r#type: Some(GROUP_TYPE.to_string()),
                val: Some(group.combinator.name().to_string()),
                is_static: group.is_static,
                query_group: Some(group.children.into_iter().map(RawNode::from).collect()),
                ..RawNode::default()
            },
            Node::Condition(condition) => RawNode {
                r#type: Some(CONDITION_TYPE.to_string()),
                val: Some(condition.value),
                is_static: condition.is_static,
                query_group: None,
                pos: Some(condition.pos),
                fld: Some(condition.field_path),
                ncmp: Some(condition.comparator.name()),
                units: Some(condition.units),
            },
        }
    }
}

impl TryFrom<RawQuery> for Query {
    type Error = TreeError;

    fn try_from(raw: RawQuery) -> Result<Self, Self::Error> {
        Ok(Query {
            selected_format_id: raw.selectedtemplate,
            searches: raw
                .searches
                .into_iter()
                .map(|(format_id, search)| {
                    Ok((
                        format_id,
                        Search {
                            name: search.name,
                            tree: Node::try_from(search.tree)?,
                        },
                    ))
                })
                .collect::<Result<_, TreeError>>()?,
        })
    }
}

impl From<Query> for RawQuery {
    fn from(query: Query) -> Self {
        RawQuery {
            selectedtemplate: query.selected_format_id,
            searches: query
                .searches
                .into_iter()
                .map(|(format_id, search)| {
                    (
                        format_id,
                        RawSearch {
                            name: search.name,
                            tree: RawNode::from(search.tree),
                        },
                    )
                })
                .collect(),
        }
    }
}
