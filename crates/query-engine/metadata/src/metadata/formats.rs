//! Metadata information regarding the reporting formats.
//!
//! A format is a denormalized view: a root entity joined to a fixed set of related entities, each
//! of which appears as a named model instance reachable from the root through a join path.

use std::collections::BTreeSet;

use enum_iterator::Sequence;
use indexmap::IndexMap;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use query_engine_models::tree::{BaseComparator, Comparator, Condition, Group};
use query_engine_models::{Combinator, Node, PATH_DELIMITER};

use super::units::UnitsSpec;

/// Mapping from a format id to the format, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
pub struct Formats(pub IndexMap<String, Format>);

impl Formats {
    pub fn empty() -> Self {
        Formats(IndexMap::new())
    }
}

/// A reporting format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Format {
    /// Display name.
    pub name: String,
    pub root_entity: String,
    pub model_instances: IndexMap<String, ModelInstance>,
    /// The skeleton a new search starts from. Generated from the root instance when absent.
    #[serde(default)]
    pub default_tree: Option<Node>,
    /// Reporting dimensions summarised over a result set.
    #[serde(default)]
    pub stats: IndexMap<String, StatsDimension>,
}

/// One occurrence of an entity within a format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ModelInstance {
    pub entity: String,
    /// Relationship hops from the format's root to this instance. Empty for the root.
    #[serde(default)]
    pub join_path: String,
    /// Relationship hops from this instance back to the format's root.
    #[serde(default)]
    pub reverse_join_path: String,
    #[serde(default)]
    pub many_related: ManyRelated,
    /// Fields making a row of this instance unique, when its natural ordering does not.
    #[serde(default)]
    pub distinct_fields: Option<Vec<String>>,
    pub fields: IndexMap<String, FieldMeta>,
}

/// How an instance relates to the root of its format.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ManyRelated {
    /// Several records of this instance may belong to one root record.
    #[serde(default)]
    pub is_many: bool,
    /// One record of this instance may also belong to several root records.
    #[serde(default)]
    pub is_many_to_many: bool,
    /// The instance is the association table of a many-to-many relationship.
    #[serde(default)]
    pub is_through_table: bool,
    /// Output one row per related record instead of merging them into the root row.
    #[serde(default)]
    pub split_rows: bool,
    /// Annotation on the root records that identifies the related record of a split row.
    #[serde(default)]
    pub root_annotation_field: Option<String>,
}

/// How a field is searched and displayed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FieldMeta {
    pub display_name: String,
    #[serde(default = "default_true")]
    pub searchable: bool,
    #[serde(default = "default_true")]
    pub displayed: bool,
    pub r#type: FieldType,
    #[serde(default)]
    pub choices: Option<Vec<String>>,
    /// A displayed field of the same instance that selects the same records, used instead of
    /// this one when a search is shown to a person.
    #[serde(default)]
    pub handoff_field: Option<String>,
    #[serde(default)]
    pub units: Option<UnitsSpec>,
}

fn default_true() -> bool {
    true
}

impl FieldMeta {
    /// The units of the field; the identity family when none are declared.
    pub fn units_spec(&self) -> UnitsSpec {
        self.units.clone().unwrap_or_else(UnitsSpec::identity)
    }
}

/// How a field is presented to the user.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Sequence,
    Serialize,
    Deserialize,
    JsonSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Number,
    String,
    Enumeration,
}

impl FieldType {
    const COMPARATORS_SUPPORTED_BY_ALL_TYPES: &'static [BaseComparator] =
        &[BaseComparator::Equals, BaseComparator::IsNull];

    const ORDERING_COMPARATORS: &'static [BaseComparator] = &[
        BaseComparator::LessThan,
        BaseComparator::LessThanOrEqualTo,
        BaseComparator::GreaterThan,
        BaseComparator::GreaterThanOrEqualTo,
    ];

    const PATTERN_COMPARATORS: &'static [BaseComparator] = &[
        BaseComparator::Contains,
        BaseComparator::StartsWith,
        BaseComparator::EndsWith,
    ];

    /// Returns the complete set of base comparators for the given type.
    pub fn comparators(self) -> BTreeSet<BaseComparator> {
        let mut comparators = Self::COMPARATORS_SUPPORTED_BY_ALL_TYPES
            .iter()
            .copied()
            .collect::<BTreeSet<_>>();
        match self {
            FieldType::Number => comparators.extend(Self::ORDERING_COMPARATORS),
            FieldType::String => {
                comparators.extend(Self::ORDERING_COMPARATORS);
                comparators.extend(Self::PATTERN_COMPARATORS);
            }
            FieldType::Enumeration => {}
        }
        comparators
    }
}

/// A reporting dimension: the distinct values of some fields over a result set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct StatsDimension {
    pub display_name: String,
    /// Field paths relative to the format's root. Several fields are joined with `delimiter`.
    pub fields: Vec<String>,
    #[serde(default = "default_stats_delimiter")]
    pub delimiter: String,
    /// How many of the most frequent values to report.
    #[serde(default = "default_top_n")]
    pub top_n: usize,
}

fn default_stats_delimiter() -> String {
    " ".to_string()
}

fn default_top_n() -> usize {
    10
}

impl Format {
    /// The instance with an empty join path.
    pub fn root_instance(&self) -> Option<(&str, &ModelInstance)> {
        self.model_instances
            .iter()
            .find(|(_, instance)| instance.join_path.is_empty())
            .map(|(name, instance)| (name.as_str(), instance))
    }

    pub fn instance(&self, instance_name: &str) -> Option<&ModelInstance> {
        self.model_instances.get(instance_name)
    }

    /// The instance whose join path is exactly `join_path`.
    pub fn instance_by_join_path(&self, join_path: &str) -> Option<(&str, &ModelInstance)> {
        self.model_instances
            .iter()
            .find(|(_, instance)| instance.join_path == join_path)
            .map(|(name, instance)| (name.as_str(), instance))
    }

    /// The tree a new search of this format starts from.
    ///
    /// Without a declared skeleton this is a single empty condition on the first searchable field
    /// of the root instance.
    pub fn default_tree(&self) -> Node {
        if let Some(tree) = &self.default_tree {
            return tree.clone();
        }
        let first_field = self.root_instance().and_then(|(_, instance)| {
            instance
                .fields
                .iter()
                .find(|(_, meta)| meta.searchable && meta.displayed)
                .or_else(|| instance.fields.iter().find(|(_, meta)| meta.searchable))
        });
        let children = match first_field {
            None => vec![],
            Some((field_name, meta)) => vec![Node::Condition(Condition {
                field_path: field_name.clone(),
                comparator: Comparator::new(BaseComparator::Equals),
                value: String::new(),
                units: meta.units_spec().default,
                is_static: false,
                pos: String::new(),
            })],
        };
        Node::Group(Group {
            combinator: Combinator::All,
            is_static: false,
            children,
        })
    }
}

impl ModelInstance {
    /// The path of a field of this instance, relative to the format's root.
    pub fn field_path(&self, field_name: &str) -> String {
        if self.join_path.is_empty() {
            field_name.to_string()
        } else {
            format!("{}{PATH_DELIMITER}{field_name}", self.join_path)
        }
    }
}
