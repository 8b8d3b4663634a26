//! App Context

use std::{
    fmt::{Debug, Formatter, Result as FmtResult},
    sync::Arc,
};

use sqlx::migrate::MigrateError;
use thiserror::Error;

use crate::{
    clock::SystemClock,
    config::PipelineConfig,
    database,
    domain::products::{
        ProductPipeline, ProductsService,
        cache::MokaViewCache,
        events::{EventSink, FanoutEventSink, PrometheusEventSink, TracingEventSink},
        store::PgProductStore,
    },
};

#[derive(Debug, Error)]
pub enum AppInitError {
    #[error("failed to connect to database")]
    Database(#[source] sqlx::Error),

    #[error("failed to apply database migrations")]
    Migrations(#[source] MigrateError),

    #[error("failed to register pipeline metrics")]
    Metrics(#[source] prometheus::Error),

    #[error("failed to compile validation patterns")]
    Patterns(#[source] regex::Error),
}

#[derive(Clone)]
pub struct AppContext {
    pub products: Arc<dyn ProductsService>,
    pub metrics: Arc<PrometheusEventSink>,
}

impl Debug for AppContext {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("AppContext")
            .field("metrics", &self.metrics)
            .finish_non_exhaustive()
    }
}

impl AppContext {
    /// Build application context from a database URL.
    ///
    /// Pending migrations are applied before the pipeline is assembled.
    ///
    /// # Errors
    ///
    /// Returns an error when connecting, migrating, or building the pipeline
    /// fails.
    pub async fn from_database_url(
        url: &str,
        config: &PipelineConfig,
    ) -> Result<Self, AppInitError> {
        let pool = database::connect(url)
            .await
            .map_err(AppInitError::Database)?;

        database::migrate(&pool)
            .await
            .map_err(AppInitError::Migrations)?;

        let metrics = Arc::new(PrometheusEventSink::new().map_err(AppInitError::Metrics)?);
        let tracing: Arc<dyn EventSink> = Arc::new(TracingEventSink);
        let prometheus: Arc<dyn EventSink> = metrics.clone();

        let products = ProductPipeline::new(
            Arc::new(PgProductStore::new(pool)),
            Arc::new(MokaViewCache::new(config.cache_capacity)),
            Arc::new(FanoutEventSink::new(vec![tracing, prometheus])),
            Arc::new(SystemClock),
            config.settings(),
        )
        .map_err(AppInitError::Patterns)?;

        Ok(Self {
            products: Arc::new(products),
            metrics,
        })
    }
}
