//! Translate a search plan into PostgreSQL selects.

pub mod aggregates;
pub mod filtering;
pub mod joins;
pub mod prefetch;
pub mod root;

pub use prefetch::{prefetch_steps, translate_prefetch};

use query_engine_sql::sql;

use super::error::Error;
use super::helpers::Env;
use super::query::SearchPlan;

/// The alias of the root table.
pub const ROOT_ALIAS: &str = "root";
/// The alias of the root table of a prefetch filter.
pub const SUBQUERY_ALIAS: &str = "subquery";

/// The primary key of a row, as text.
pub const KEY_COLUMN: &str = "pk";
/// The record of a row, as a JSON object.
pub const RECORD_COLUMN: &str = "record";
/// The primary key of the root record a prefetched record belongs to, as text.
pub const ROOT_KEY_COLUMN: &str = "root_pk";
/// A value of a reporting dimension.
pub const VALUE_COLUMN: &str = "value";
pub const COUNT_COLUMN: &str = "count";

/// The selects of one reporting dimension.
#[derive(Debug, Clone, PartialEq)]
pub struct StatsQuery {
    pub name: String,
    pub display_name: String,
    pub top_n: usize,
    pub select: sql::ast::Select,
}

/// Everything to run against the database to answer a search, except prefetches, which depend on
/// the rows returned.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionPlan {
    pub rows: sql::ast::Select,
    pub count: sql::ast::Select,
    pub stats: Vec<StatsQuery>,
}

impl ExecutionPlan {
    /// The statement returning the rows of the requested page.
    pub fn rows_sql(&self) -> sql::string::SQL {
        self.rows.to_statement()
    }

    pub fn count_sql(&self) -> sql::string::SQL {
        self.count.to_statement()
    }
}

/// Translate a search plan.
pub fn translate(env: &Env, plan: &SearchPlan) -> Result<ExecutionPlan, Error> {
    let span = tracing::info_span!("Translate search", format = %plan.format_id);
    span.in_scope(|| -> Result<ExecutionPlan, Error> {
        let rows = root::translate_rows(env, plan)?;
        let count = root::translate_count(env, plan)?;
        let stats = plan
            .stats
            .iter()
            .map(|stats| -> Result<StatsQuery, Error> {
                Ok(StatsQuery {
                    name: stats.name.clone(),
                    display_name: stats.display_name.clone(),
                    top_n: stats.top_n,
                    select: aggregates::translate_stats(env, plan, stats)?,
                })
            })
            .collect::<Result<Vec<_>, Error>>()?;
        tracing::debug!(sql = %rows.to_statement().sql, "translated search");
        Ok(ExecutionPlan { rows, count, stats })
    })
}
