//! The typed query tree.

use enum_iterator::Sequence;

use crate::error::TreeError;
use crate::{wire, PATH_DELIMITER};

/// Prefix marking a negated comparator on the wire, as in `not_icontains`.
const NEGATION_PREFIX: &str = "not_";

/// A node of a query tree: either a group of nodes or a single field comparison.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "wire::RawNode", into = "wire::RawNode")]
pub enum Node {
    Group(Group),
    Condition(Condition),
}

/// How the children of a group are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Sequence)]
pub enum Combinator {
    /// Every child must match.
    All,
    /// At least one child must match.
    Any,
}

impl Combinator {
    pub fn name(self) -> &'static str {
        match self {
            Combinator::All => "all",
            Combinator::Any => "any",
        }
    }

    pub fn parse(name: &str) -> Result<Self, TreeError> {
        enum_iterator::all::<Combinator>()
            .find(|combinator| combinator.name() == name)
            .ok_or_else(|| TreeError::UnknownCombinator(name.to_string()))
    }
}

/// A group of nodes combined with [`Combinator`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    pub combinator: Combinator,
    /// Static nodes are part of a format's fixed skeleton and are not edited by the user.
    pub is_static: bool,
    pub children: Vec<Node>,
}

/// A leaf comparison `field_path <comparator> value`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Condition {
    /// Field path relative to the root of the search, e.g. `tags__name`.
    pub field_path: String,
    pub comparator: Comparator,
    /// The value exactly as the user typed it.
    pub value: String,
    /// Key of the units the value was typed in.
    pub units: String,
    pub is_static: bool,
    /// Opaque UI position marker, carried through untouched.
    pub pos: String,
}

/// The comparison applied by a condition, without its negation.
///
/// String comparisons are case-insensitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Sequence)]
pub enum BaseComparator {
    Equals,
    LessThan,
    LessThanOrEqualTo,
    GreaterThan,
    GreaterThanOrEqualTo,
    Contains,
    StartsWith,
    EndsWith,
    IsNull,
}

impl BaseComparator {
    /// The wire name of the comparator.
    pub fn name(self) -> &'static str {
        match self {
            BaseComparator::Equals => "iexact",
            BaseComparator::LessThan => "lt",
            BaseComparator::LessThanOrEqualTo => "lte",
            BaseComparator::GreaterThan => "gt",
            BaseComparator::GreaterThanOrEqualTo => "gte",
            BaseComparator::Contains => "icontains",
            BaseComparator::StartsWith => "istartswith",
            BaseComparator::EndsWith => "iendswith",
            BaseComparator::IsNull => "isnull",
        }
    }

    /// Ordering comparisons have no `not_` form.
    pub fn is_negatable(self) -> bool {
        !matches!(
            self,
            BaseComparator::LessThan
                | BaseComparator::LessThanOrEqualTo
                | BaseComparator::GreaterThan
                | BaseComparator::GreaterThanOrEqualTo
        )
    }

    /// Substring matches only make sense against text.
    pub fn is_pattern_match(self) -> bool {
        matches!(
            self,
            BaseComparator::Contains | BaseComparator::StartsWith | BaseComparator::EndsWith
        )
    }
}

/// A comparator from the fixed vocabulary, split into its base comparison and negation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Comparator {
    pub base: BaseComparator,
    pub negated: bool,
}

impl Comparator {
    pub fn new(base: BaseComparator) -> Self {
        Comparator {
            base,
            negated: false,
        }
    }

    pub fn negated(base: BaseComparator) -> Self {
        Comparator {
            base,
            negated: true,
        }
    }

    /// Parse a wire name such as `lte` or `not_iexact`.
    pub fn parse(name: &str) -> Result<Self, TreeError> {
        let (negated, base_name) = match name.strip_prefix(NEGATION_PREFIX) {
            Some(rest) => (true, rest),
            None => (false, name),
        };
        let base = enum_iterator::all::<BaseComparator>()
            .find(|base| base.name() == base_name)
            .ok_or_else(|| TreeError::UnknownComparator(name.to_string()))?;
        if negated && !base.is_negatable() {
            return Err(TreeError::UnknownComparator(name.to_string()));
        }
        Ok(Comparator { base, negated })
    }

    /// The wire name of the comparator.
    pub fn name(&self) -> String {
        if self.negated {
            format!("{NEGATION_PREFIX}{}", self.base.name())
        } else {
            self.base.name().to_string()
        }
    }

    /// Every comparator of the vocabulary.
    pub fn vocabulary() -> impl Iterator<Item = Comparator> {
        enum_iterator::all::<BaseComparator>().flat_map(|base| {
            let negated = base.is_negatable().then(|| Comparator::negated(base));
            std::iter::once(Comparator::new(base)).chain(negated)
        })
    }
}

impl std::fmt::Display for Comparator {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl Condition {
    /// An empty condition is the slot a user types into next.
    pub fn is_empty(&self) -> bool {
        !self.is_static && self.value.is_empty()
    }

    /// Split the field path into the path of its instance and the field name.
    ///
    /// `tags__name` becomes `("tags", "name")`; `name` becomes `("", "name")`.
    pub fn split_path(&self) -> (&str, &str) {
        split_field_path(&self.field_path)
    }
}

/// Split a field path into its instance path and its final segment.
pub fn split_field_path(field_path: &str) -> (&str, &str) {
    match field_path.rsplit_once(PATH_DELIMITER) {
        Some((instance_path, field)) => (instance_path, field),
        None => ("", field_path),
    }
}

impl Node {
    /// Read a node from its JSON wire representation.
    pub fn from_json(value: serde_json::Value) -> Result<Node, TreeError> {
        let raw: wire::RawNode =
            serde_json::from_value(value).map_err(|err| TreeError::Json(err.to_string()))?;
        Node::try_from(raw)
    }

    /// The JSON wire representation of this node.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(wire::RawNode::from(self.clone())).unwrap_or_default()
    }

    /// All conditions of the tree, depth first.
    pub fn conditions(&self) -> Vec<&Condition> {
        let mut conditions = vec![];
        self.collect_conditions(&mut conditions);
        conditions
    }

    fn collect_conditions<'a>(&'a self, conditions: &mut Vec<&'a Condition>) {
        match self {
            Node::Condition(condition) => conditions.push(condition),
            Node::Group(group) => {
                for child in &group.children {
                    child.collect_conditions(conditions);
                }
            }
        }
    }

    /// Number of empty, non-static conditions in the tree.
    pub fn count_empty_conditions(&self) -> usize {
        self.conditions()
            .into_iter()
            .filter(|condition| condition.is_empty())
            .count()
    }

    /// Build a new tree with every condition replaced by the result of `f`.
    ///
    /// The tree is rebuilt bottom-up; `self` is left untouched.
    pub fn map_conditions<E>(
        &self,
        f: &mut impl FnMut(&Condition) -> Result<Condition, E>,
    ) -> Result<Node, E> {
        match self {
            Node::Condition(condition) => Ok(Node::Condition(f(condition)?)),
            Node::Group(group) => Ok(Node::Group(Group {
                combinator: group.combinator,
                is_static: group.is_static,
                children: group
                    .children
                    .iter()
                    .map(|child| child.map_conditions(f))
                    .collect::<Result<Vec<_>, E>>()?,
            })),
        }
    }
}

impl schemars::JsonSchema for Node {
    fn schema_name() -> String {
        "QueryNode".to_string()
    }

    fn json_schema(gen: &mut schemars::gen::SchemaGenerator) -> schemars::schema::Schema {
        <wire::RawNode as schemars::JsonSchema>::json_schema(gen)
    }
}
