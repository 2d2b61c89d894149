//! Type definitions of a low-level SQL string representation.

/// A SQL statement together with the values of its parameters.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SQL {
    pub sql: String,
    pub params: Vec<Param>,
}

/// A parameter for a parameterized query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Param {
    /// A literal string
    String(String),
}

impl SQL {
    pub fn new() -> SQL {
        SQL::default()
    }

    pub fn append_syntax(&mut self, sql: &str) {
        self.sql.push_str(sql);
    }

    /// Append a quoted identifier. Embedded quotes are doubled.
    pub fn append_identifier(&mut self, identifier: &str) {
        self.sql.push('"');
        self.sql.push_str(&identifier.replace('"', "\"\""));
        self.sql.push('"');
    }

    /// Append a positional placeholder (`$1`, `$2`, ...) and record its value.
    pub fn append_param(&mut self, param: Param) {
        self.params.push(param);
        self.sql.push_str(&format!("${}", self.params.len()));
    }
}
