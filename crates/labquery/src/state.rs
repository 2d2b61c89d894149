//! Transient state used by the search service.
//!
//! This is initialized on startup.

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use thiserror::Error;
use tracing::{info_span, Instrument};

use labquery_configuration::{Configuration, PoolSettings};
use query_engine_execution::metrics;
use query_engine_execution::postgres::PostgresBackend;

/// State for our service.
#[derive(Debug, Clone)]
pub struct State {
    pub pool: PgPool,
    pub metrics: metrics::Metrics,
}

impl State {
    /// A backend running searches on the pool, counting into the metrics.
    pub fn backend(&self) -> PostgresBackend {
        PostgresBackend::new(self.pool.clone()).with_metrics(self.metrics.clone())
    }
}

/// Connect to the database and register the backend metrics.
pub async fn create_state(
    configuration: &Configuration,
    metrics_registry: &mut prometheus::Registry,
) -> Result<State, InitializationError> {
    let pool = create_pool(&configuration.connection_uri, &configuration.pool_settings)
        .instrument(info_span!("Create connection pool"))
        .await?;

    let metrics = async {
        let metrics_inner = metrics::Metrics::initialize(metrics_registry)
            .map_err(InitializationError::MetricsError)?;
        metrics_inner.update_pool_metrics(&pool);
        Ok(metrics_inner)
    }
    .instrument(info_span!("Setup metrics"))
    .await?;

    Ok(State { pool, metrics })
}

/// Open a connection pool sized and timed by the configured settings.
async fn create_pool(
    connection_uri: &str,
    pool_settings: &PoolSettings,
) -> Result<PgPool, InitializationError> {
    PgPoolOptions::new()
        .max_connections(pool_settings.max_connections)
        .acquire_timeout(pool_settings.acquire_timeout())
        .idle_timeout(pool_settings.idle_timeout())
        .max_lifetime(pool_settings.max_lifetime())
        .connect(connection_uri)
        .await
        .map_err(InitializationError::UnableToCreatePool)
}

/// Check that the database answers.
pub async fn health_check(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1")
        .execute(pool)
        .instrument(info_span!("Health check"))
        .await?;
    Ok(())
}

/// State initialization error.
#[derive(Debug, Error)]
pub enum InitializationError {
    #[error("unable to initialize connection pool: {0}")]
    UnableToCreatePool(sqlx::Error),
    #[error("error initializing metrics: {0}")]
    MetricsError(metrics::Error),
}
