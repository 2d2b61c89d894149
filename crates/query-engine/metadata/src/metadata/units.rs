//! The units a searched value may be typed in.
//!
//! Only the names live here; the conversions themselves are part of query translation.

use enum_iterator::Sequence;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use query_engine_models::IDENTITY_UNITS;

/// A family of interchangeable units sharing one canonical representation.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Sequence,
    Serialize,
    Deserialize,
    JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum UnitsFamily {
    /// Values are compared as typed.
    Identity,
    /// Durations, stored as PostgreSQL intervals.
    PostgresInterval,
    /// Concentrations, stored in micromolar.
    Concentration,
}

impl UnitsFamily {
    /// Every unit key of the family, in the order they are offered to the user.
    pub fn units(self) -> &'static [&'static str] {
        match self {
            UnitsFamily::Identity => &[IDENTITY_UNITS],
            UnitsFamily::PostgresInterval => &[
                "native",
                "calendartime",
                "clocktime",
                "millis",
                "seconds",
                "minutes",
                "hours",
                "days",
                "weeks",
                "months",
                "years",
                "decades",
                "centuries",
                "millennia",
            ],
            UnitsFamily::Concentration => &["molar", "millimolar", "micromolar", "nanomolar"],
        }
    }

    pub fn default_unit(self) -> &'static str {
        match self {
            UnitsFamily::Identity => IDENTITY_UNITS,
            UnitsFamily::PostgresInterval => "native",
            UnitsFamily::Concentration => "millimolar",
        }
    }

    pub fn contains(self, unit: &str) -> bool {
        self.units().contains(&unit)
    }
}

/// The units a field accepts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct UnitsSpec {
    pub family: UnitsFamily,
    /// The unit preselected in the UI.
    pub default: String,
    /// The units offered to the user. Every unit of the family when absent.
    #[serde(default)]
    pub selectable: Option<Vec<String>>,
}

impl UnitsSpec {
    pub fn identity() -> Self {
        UnitsSpec {
            family: UnitsFamily::Identity,
            default: IDENTITY_UNITS.to_string(),
            selectable: None,
        }
    }

    pub fn is_selectable(&self, unit: &str) -> bool {
        match &self.selectable {
            Some(selectable) => selectable.iter().any(|u| u == unit),
            None => self.family.contains(unit),
        }
    }
}
