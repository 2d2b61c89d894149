//! Metadata information regarding the database tables backing the reporting formats.

use std::collections::BTreeMap;

use enum_iterator::Sequence;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// The name under which every entity exposes its primary key, whatever the column is called.
pub const PRIMARY_KEY_FIELD: &str = "pk";

/// The scalar types supported by the Engine.
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
pub enum ScalarType {
    Boolean,
    Smallint,
    Integer,
    Bigint,
    Real,
    #[serde(rename = "double precision")]
    DoublePrecision,
    Numeric,
    #[serde(rename = "character varying")]
    CharacterVarying,
    Text,
    Date,
    #[serde(rename = "timestamp with time zone")]
    TimestampWithTimeZone,
    Interval,
    Uuid,
}

impl ScalarType {
    /// Columns of these types are compared case-insensitively with pattern matching.
    pub fn is_textual(self) -> bool {
        matches!(self, ScalarType::CharacterVarying | ScalarType::Text)
    }

    /// The name of the type as used in casts.
    pub fn type_name(self) -> &'static str {
        match self {
            ScalarType::Boolean => "boolean",
            ScalarType::Smallint => "smallint",
            ScalarType::Integer => "integer",
            ScalarType::Bigint => "bigint",
            ScalarType::Real => "real",
            ScalarType::DoublePrecision => "double precision",
            ScalarType::Numeric => "numeric",
            ScalarType::CharacterVarying => "character varying",
            ScalarType::Text => "text",
            ScalarType::Date => "date",
            ScalarType::TimestampWithTimeZone => "timestamp with time zone",
            ScalarType::Interval => "interval",
            ScalarType::Uuid => "uuid",
        }
    }
}

impl std::fmt::Display for ScalarType {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.type_name())
    }
}

/// Mapping from an entity name to its information.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
pub struct Entities(pub BTreeMap<String, EntityInfo>);

impl Entities {
    pub fn empty() -> Self {
        Entities(BTreeMap::new())
    }
}

/// Information about a record type and the table it is stored in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct EntityInfo {
    pub schema_name: String,
    pub table_name: String,
    /// Key of the primary key column in `columns`.
    pub primary_key: String,
    pub columns: BTreeMap<String, ColumnInfo>,
    /// Natural ordering of the records. Entries are field names, optionally prefixed with `-`
    /// for descending order, and may name a foreign key relationship.
    #[serde(default)]
    pub ordering: Vec<String>,
    #[serde(default)]
    pub relationships: BTreeMap<String, Relationship>,
}

impl EntityInfo {
    /// Lookup a column, resolving the `pk` alias.
    pub fn column(&self, field: &str) -> Option<&ColumnInfo> {
        if field == PRIMARY_KEY_FIELD {
            self.columns.get(&self.primary_key)
        } else {
            self.columns.get(field)
        }
    }

    pub fn primary_key_column(&self) -> Option<&ColumnInfo> {
        self.columns.get(&self.primary_key)
    }
}

/// Can this column contain null values
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
pub enum Nullable {
    #[default]
    Nullable,
    NonNullable,
}

/// Information about a database column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ColumnInfo {
    pub name: String,
    pub r#type: ScalarType,
    #[serde(default)]
    pub nullable: Nullable,
}

/// The cardinality of a relationship hop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum RelationshipKind {
    /// Many-to-one: this entity holds the key of the target.
    ForeignKey,
    /// One-to-many: the target holds the key of this entity.
    Reverse,
    /// Many-to-many through an association table.
    ManyToMany,
}

/// A named hop from one entity to another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Relationship {
    pub target: String,
    pub kind: RelationshipKind,
    /// Source column to target column. Unused for many-to-many relationships.
    #[serde(default)]
    pub column_mapping: BTreeMap<String, String>,
    #[serde(default)]
    pub through: Option<ThroughTable>,
}

impl Relationship {
    /// Does following this hop fan out to several records?
    pub fn is_many(&self) -> bool {
        !matches!(self.kind, RelationshipKind::ForeignKey)
    }
}

/// The association table of a many-to-many relationship.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ThroughTable {
    pub schema_name: String,
    pub table_name: String,
    /// Source column to association table column.
    pub source_mapping: BTreeMap<String, String>,
    /// Association table column to target column.
    pub target_mapping: BTreeMap<String, String>,
}

/// An entry of an entity's natural ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderingField<'a> {
    pub field: &'a str,
    pub descending: bool,
}

/// Parse an ordering entry such as `-date`.
pub fn parse_ordering_field(entry: &str) -> OrderingField<'_> {
    match entry.strip_prefix('-') {
        Some(field) => OrderingField {
            field,
            descending: true,
        },
        None => OrderingField {
            field: entry,
            descending: false,
        },
    }
}
