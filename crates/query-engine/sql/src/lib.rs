//! SQL AST and the conversion of it to parameterised SQL strings.

pub mod sql;
