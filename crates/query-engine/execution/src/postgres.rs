//! Run search plans against PostgreSQL.

use multimap::MultiMap;
use sqlx::Row as _;
use tracing::{info_span, Instrument};

use query_engine_metadata::metadata::Metadata;
use query_engine_sql::sql;
use query_engine_translation::translation::helpers::Env;
use query_engine_translation::translation::lowering::{
    self, COUNT_COLUMN, KEY_COLUMN, RECORD_COLUMN, ROOT_KEY_COLUMN, VALUE_COLUMN,
};
use query_engine_translation::translation::query::SearchPlan;

use crate::backend::{summarize_stats, Backend, Row, SearchResults, Stats, StatsValue};
use crate::error::Error;
use crate::metrics::Metrics;

/// A backend reading the records from a PostgreSQL database.
#[derive(Debug, Clone)]
pub struct PostgresBackend {
    pool: sqlx::PgPool,
    metrics: Option<Metrics>,
}

impl PostgresBackend {
    pub fn new(pool: sqlx::PgPool) -> PostgresBackend {
        PostgresBackend {
            pool,
            metrics: None,
        }
    }

    /// Count queries, errors and query time into these metrics.
    pub fn with_metrics(mut self, metrics: Metrics) -> PostgresBackend {
        metrics.update_pool_metrics(&self.pool);
        self.metrics = Some(metrics);
        self
    }

    pub fn pool(&self) -> &sqlx::PgPool {
        &self.pool
    }

    /// Run one statement, classifying its errors against the distinct fields of the search.
    async fn fetch_all(
        &self,
        query: &sql::string::SQL,
        distinct_fields: &[String],
    ) -> Result<Vec<sqlx::postgres::PgRow>, Error> {
        tracing::debug!(
            sql = %sqlformat::format(
                &query.sql,
                &sqlformat::QueryParams::None,
                sqlformat::FormatOptions::default(),
            ),
            params = ?&query.params,
            "running statement"
        );

        let timer = self
            .metrics
            .as_ref()
            .map(|metrics| metrics.query_time.start_timer());
        let result = build_query_with_params(query).fetch_all(&self.pool).await;
        if let Some(timer) = timer {
            timer.observe_duration();
        }

        match result {
            Ok(rows) => {
                if let Some(metrics) = &self.metrics {
                    metrics.query_total.inc();
                }
                Ok(rows)
            }
            Err(error) => {
                let error = Error::from_database(error, distinct_fields);
                if let Some(metrics) = &self.metrics {
                    metrics.error_total.inc();
                    if matches!(error, Error::UnsupportedDistinctCombination { .. }) {
                        metrics.distinct_rejected_total.inc();
                    }
                }
                Err(error)
            }
        }
    }
}

#[async_trait::async_trait]
impl Backend for PostgresBackend {
    async fn search(&self, metadata: &Metadata, plan: &SearchPlan) -> Result<SearchResults, Error> {
        let env = Env::new(metadata);
        let execution_plan = lowering::translate(&env, plan)?;
        let distinct_fields = plan.distinct_fields.as_slice();

        let rows = async {
            let rows = self
                .fetch_all(&execution_plan.rows_sql(), distinct_fields)
                .await?;
            rows.iter()
                .map(|row| decode_row(row, plan))
                .collect::<Result<Vec<_>, Error>>()
        }
        .instrument(info_span!("Fetch rows"))
        .await?;

        let total_count = async {
            let rows = self
                .fetch_all(&execution_plan.count_sql(), distinct_fields)
                .await?;
            let count: i64 = match rows.first() {
                Some(row) => row.try_get(COUNT_COLUMN).map_err(decode_error)?,
                None => 0,
            };
            Ok::<u64, Error>(u64::try_from(count).unwrap_or_default())
        }
        .instrument(info_span!("Count rows"))
        .await?;

        let rows = self
            .prefetch(&env, plan, rows)
            .instrument(info_span!("Prefetch related records"))
            .await?;

        let stats = if execution_plan.stats.is_empty() {
            None
        } else {
            let mut all_stats = vec![];
            for stats_query in &execution_plan.stats {
                let stats = self
                    .stats(stats_query)
                    .instrument(info_span!("Compute stats", stats = %stats_query.name))
                    .await?;
                all_stats.push(stats);
            }
            Some(all_stats)
        };

        if let Some(metrics) = &self.metrics {
            metrics.update_pool_metrics(&self.pool);
        }

        Ok(SearchResults {
            rows,
            total_count,
            stats,
        })
    }
}

impl PostgresBackend {
    /// Attach the related records of each prefetch path to the rows.
    async fn prefetch(
        &self,
        env: &Env<'_>,
        plan: &SearchPlan,
        mut rows: Vec<Row>,
    ) -> Result<Vec<Row>, Error> {
        let root_keys: Vec<String> = rows.iter().map(|row| row.key.clone()).collect();
        for step in lowering::prefetch_steps(env, plan)? {
            let select = lowering::translate_prefetch(env, plan, &step, &root_keys)?;
            let fetched = self.fetch_all(&select.to_statement(), &[]).await?;

            let mut related: MultiMap<String, serde_json::Value> = MultiMap::new();
            for fetched_row in &fetched {
                let root_key: String = fetched_row.try_get(ROOT_KEY_COLUMN).map_err(decode_error)?;
                let record: serde_json::Value =
                    fetched_row.try_get(RECORD_COLUMN).map_err(decode_error)?;
                related.insert(root_key, record);
            }
            tracing::debug!(path = %step.path, records = fetched.len(), "prefetched");

            for row in &mut rows {
                let records = related.get_vec(&row.key).cloned().unwrap_or_default();
                row.related.insert(step.path.clone(), records);
            }
        }
        Ok(rows)
    }

    async fn stats(&self, stats_query: &lowering::StatsQuery) -> Result<Stats, Error> {
        let rows = self
            .fetch_all(&stats_query.select.to_statement(), &[])
            .await?;
        let values = rows
            .iter()
            .map(|row| -> Result<StatsValue, Error> {
                let value: Option<String> = row.try_get(VALUE_COLUMN).map_err(decode_error)?;
                let count: i64 = row.try_get(COUNT_COLUMN).map_err(decode_error)?;
                Ok(StatsValue {
                    value: value.unwrap_or_default(),
                    count: u64::try_from(count).unwrap_or_default(),
                })
            })
            .collect::<Result<Vec<_>, Error>>()?;
        Ok(summarize_stats(
            &stats_query.name,
            &stats_query.display_name,
            stats_query.top_n,
            values,
        ))
    }
}

fn decode_row(row: &sqlx::postgres::PgRow, plan: &SearchPlan) -> Result<Row, Error> {
    let key: String = row.try_get(KEY_COLUMN).map_err(decode_error)?;
    let record: serde_json::Value = row.try_get(RECORD_COLUMN).map_err(decode_error)?;
    let annotations = plan
        .annotations
        .iter()
        .map(|annotation| -> Result<(String, Option<String>), Error> {
            let value: Option<String> = row
                .try_get(annotation.name.as_str())
                .map_err(decode_error)?;
            Ok((annotation.name.clone(), value))
        })
        .collect::<Result<_, Error>>()?;
    Ok(Row {
        key,
        record,
        annotations,
        related: Default::default(),
    })
}

fn decode_error(error: sqlx::Error) -> Error {
    Error::Decode(error.to_string())
}

/// Create a SQLx query based on our SQL query and bind our parameters to it.
fn build_query_with_params(
    query: &sql::string::SQL,
) -> sqlx::query::Query<'_, sqlx::Postgres, sqlx::postgres::PgArguments> {
    query
        .params
        .iter()
        .fold(sqlx::query(query.sql.as_str()), |sqlx_query, param| {
            match param {
                sql::string::Param::String(s) => sqlx_query.bind(s),
            }
        })
}
