//! Type definitions of a SQL AST, helpers to build it, and its conversion to SQL strings.

pub mod ast;
pub mod convert;
pub mod helpers;
pub mod string;
