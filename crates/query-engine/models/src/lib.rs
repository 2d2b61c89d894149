//! The query tree exchanged with the search UI.
//!
//! A user search is a recursive boolean tree of "all of" / "any of" groups whose leaves compare a
//! field to a value. This crate holds the typed tree, its JSON wire format and the structural
//! validators used at the boundary.

pub mod error;
pub mod query;
pub mod tree;
pub mod validation;
mod wire;

pub use error::TreeError;
pub use query::{Query, Search};
pub use tree::{BaseComparator, Combinator, Comparator, Condition, Group, Node};
pub use validation::{is_query_object_well_formed, is_query_populated};

/// Separates the hops of a field path, e.g. `msrun__sample__animal__name`.
pub const PATH_DELIMITER: &str = "__";

/// The units key accepted by every field that declares no units.
pub const IDENTITY_UNITS: &str = "identity";
