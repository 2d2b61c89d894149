//! Translate query trees into search plans, and search plans into SQL to be run against the
//! database.

pub mod error;
pub mod helpers;
pub mod lowering;
pub mod query;
