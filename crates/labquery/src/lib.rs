//! Search the records of a laboratory database through the query trees built by the search UI.
//!
//! A [`Searcher`] holds the reporting metadata and a backend. It compiles and plans the selected
//! search of a query, runs it, and builds the basic queries that start a new search from a single
//! field comparison.

pub mod error;
pub mod state;

use std::sync::Arc;

use tracing::{info_span, Instrument};

use query_engine_execution::{Backend, SearchResults};
use query_engine_metadata::metadata::Metadata;
use query_engine_models::{BaseComparator, Comparator, Query};
use query_engine_translation::translation::helpers::Env;
use query_engine_translation::translation::query::basic::{self, HANDOFF_STATS};
use query_engine_translation::translation::query::{
    compile_query, plan_search, Predicate, SearchOptions, SearchPlan,
};

pub use error::Error;

/// Runs searches against one backend.
#[derive(Clone)]
pub struct Searcher {
    metadata: Arc<Metadata>,
    backend: Arc<dyn Backend>,
}

impl std::fmt::Debug for Searcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Searcher")
            .field("formats", &self.metadata.format_ids())
            .finish_non_exhaustive()
    }
}

impl Searcher {
    pub fn new(metadata: Arc<Metadata>, backend: Arc<dyn Backend>) -> Searcher {
        Searcher { metadata, backend }
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// Compile the selected search of `query` into a predicate over the format's root entity.
    pub fn compile_query(
        &self,
        query: &Query,
        format_id: Option<&str>,
    ) -> Result<Option<Predicate>, Error> {
        compile_query(&self.metadata, query, format_id).map_err(|err| {
            tracing::error!("{}", err);
            Error::from(err)
        })
    }

    /// Plan the selected search of `query`.
    pub fn plan(&self, query: &Query, options: &SearchOptions) -> Result<SearchPlan, Error> {
        let env = Env::new(&self.metadata);
        plan_search(&env, query, options).map_err(|err| {
            tracing::error!("{}", err);
            Error::from(err)
        })
    }

    /// Run the selected search of `query`.
    pub async fn execute(
        &self,
        query: &Query,
        options: &SearchOptions,
    ) -> Result<SearchResults, Error> {
        let plan = self.plan(query, options)?;
        self.run(&plan)
            .instrument(info_span!("Execute search", format = %plan.format_id))
            .await
    }

    async fn run(&self, plan: &SearchPlan) -> Result<SearchResults, Error> {
        let results = self
            .backend
            .search(&self.metadata, plan)
            .await
            .map_err(|err| {
                tracing::error!("{}", err);
                Error::from(err)
            })?;
        tracing::info!(
            rows = results.rows.len(),
            total_count = results.total_count,
            "search done"
        );
        Ok(results)
    }

    /// A query with every format at its default tree, `format_id` (or the first format) selected.
    pub fn default_query(&self, format_id: Option<&str>) -> Result<Query, Error> {
        let env = Env::new(&self.metadata);
        Ok(basic::default_query(&env, format_id)?)
    }

    /// A query comparing one field of an instance to a value.
    ///
    /// Searching a field that is hidden from the results hands off to the displayed field standing
    /// in for it: the hidden field is looked up first, and the query compares the displayed field
    /// to the single value the matching records have for it.
    pub async fn new_basic_query(
        &self,
        format_id: &str,
        instance: &str,
        field: &str,
        comparator: Comparator,
        value: &str,
        units: Option<&str>,
    ) -> Result<Query, Error> {
        let env = Env::new(&self.metadata);
        let query =
            basic::new_basic_query(&env, format_id, instance, field, comparator, value, units)?;

        let Some(handoff_field) = basic::handoff_field(&env, format_id, instance, field)? else {
            return Ok(query);
        };

        let lookup = basic::plan_handoff_lookup(&env, &query, instance, &handoff_field)?;
        let results = self
            .run(&lookup)
            .instrument(info_span!("Look up handoff value", field = %handoff_field))
            .await?;
        let mut values: Vec<String> = results
            .stats
            .unwrap_or_default()
            .into_iter()
            .filter(|stats| stats.name == HANDOFF_STATS)
            .flat_map(|stats| stats.values)
            .map(|stats_value| stats_value.value)
            .collect();

        match values.len() {
            0 => Err(Error::NoHandoffMatch {
                field: field.to_string(),
                comparator: comparator.name(),
                value: value.to_string(),
                handoff_field,
            }),
            1 => {
                let handoff_value = values.remove(0);
                tracing::debug!(%handoff_field, %handoff_value, "handing off");
                Ok(basic::new_basic_query(
                    &env,
                    format_id,
                    instance,
                    &handoff_field,
                    Comparator::new(BaseComparator::Equals),
                    &handoff_value,
                    None,
                )?)
            }
            _ => Err(Error::AmbiguousHandoff {
                field: field.to_string(),
                comparator: comparator.name(),
                value: value.to_string(),
                handoff_field,
                values,
            }),
        }
    }

    /// Whether `query` has the shape of a query object over the configured formats.
    pub fn is_query_object_well_formed(&self, query: &Query) -> bool {
        query_engine_models::is_query_object_well_formed(query, &self.metadata.format_ids())
    }

    /// Whether the selected search of `query` has at least one filled in condition.
    pub fn is_query_populated(&self, query: &Query) -> bool {
        query_engine_models::is_query_populated(query)
    }
}
