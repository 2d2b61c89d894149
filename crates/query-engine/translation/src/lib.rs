//! Compile query trees into predicates and search plans, and lower those to SQL.

pub mod translation;
