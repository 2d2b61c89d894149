//! Compile and plan queries.

pub mod basic;
pub mod distinct;
pub mod filtering;
pub mod plan;
pub mod predicate;
pub mod prefetch;
pub mod reroot;
pub mod units;

pub use plan::{
    plan_search, Annotation, OrderDirection, OrderElement, PrefetchPlan, SearchOptions, SearchPlan,
    StatsPlan, SubqueryFilter,
};
pub use predicate::{ComparisonOperator, Interval, Predicate, Value};

use query_engine_metadata::metadata::Metadata;
use query_engine_models::validation::check_query_object;
use query_engine_models::{Query, TreeError};

use super::error::Error;
use super::helpers::{Env, FieldCatalog};

/// Compile the selected search of a query.
///
/// When `format_id` is given the query must have it selected. `None` means the selected tree does
/// not restrict anything, which only happens for trees with empty groups.
pub fn compile_query(
    metadata: &Metadata,
    query: &Query,
    format_id: Option<&str>,
) -> Result<Option<Predicate>, Error> {
    if let Some(requested) = format_id {
        if requested != query.selected_format_id {
            return Err(Error::FormatMismatch {
                selected: query.selected_format_id.clone(),
                requested: requested.to_string(),
            });
        }
    }
    check_query_object(query, &metadata.format_ids())?;

    let span = tracing::info_span!("Compile query", format = %query.selected_format_id);
    span.in_scope(|| -> Result<Option<Predicate>, Error> {
        let env = Env::new(metadata);
        let format = env.lookup_format(&query.selected_format_id)?;
        let tree = query.selected_tree().ok_or_else(|| {
            TreeError::MalformedTree(format!(
                "no search for format '{}'",
                query.selected_format_id
            ))
        })?;
        let catalog = FieldCatalog::new(&query.selected_format_id, format)?;
        let predicate = filtering::compile(tree, &catalog)?;
        tracing::debug!(
            predicate = %predicate.as_ref().map_or_else(String::new, ToString::to_string),
            "compiled query"
        );
        Ok(predicate)
    })
}
