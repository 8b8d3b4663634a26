//! Cache Coordinator

use std::{
    fmt::{Debug, Formatter, Result as FmtResult},
    sync::Arc,
    time::Duration,
};

use tracing::debug;

use crate::domain::products::{
    cache::{CacheError, CacheScope, CacheStore, CachedViews},
    context::RequestContext,
    errors::InfrastructureError,
    store::ProductStore,
    transform::to_view,
};

/// Read-through access to derived views, plus write-triggered invalidation.
#[derive(Clone)]
pub struct CacheCoordinator {
    cache: Arc<dyn CacheStore>,
    store: Arc<dyn ProductStore>,
    ttl: Duration,
}

impl Debug for CacheCoordinator {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("CacheCoordinator")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl CacheCoordinator {
    #[must_use]
    pub fn new(cache: Arc<dyn CacheStore>, store: Arc<dyn ProductStore>, ttl: Duration) -> Self {
        Self { cache, store, ttl }
    }

    /// Cached views for `scope`, loading and caching them from the store on a miss.
    ///
    /// # Errors
    ///
    /// Returns an infrastructure error when the cache or the store fails.
    pub async fn get_or_populate(
        &self,
        scope: CacheScope,
        ctx: &RequestContext,
    ) -> Result<CachedViews, InfrastructureError> {
        let key = scope.key();
        let cancel = ctx.cancellation();

        if let Some(views) = ctx.guard(self.cache.get(&key, cancel)).await? {
            debug!(scope = %key, count = views.len(), "view cache hit");

            return Ok(views);
        }

        let records = ctx.guard(self.store.query(&scope.filter(), cancel)).await?;

        let views: CachedViews = records
            .iter()
            .map(|record| to_view(record, ctx.now()))
            .collect();

        ctx.guard(self.cache.set(&key, views.clone(), self.ttl, cancel))
            .await?;

        debug!(scope = %key, count = views.len(), "view cache populated");

        Ok(views)
    }

    /// Drop every scope in `scopes`.
    ///
    /// All scopes are attempted even if one fails; the first failure is returned.
    ///
    /// # Errors
    ///
    /// Returns the first cache failure encountered.
    pub async fn invalidate(
        &self,
        scopes: &[CacheScope],
        ctx: &RequestContext,
    ) -> Result<(), CacheError> {
        let mut first_error = None;

        for scope in scopes {
            let key = scope.key();

            match ctx.guard(self.cache.remove(&key, ctx.cancellation())).await {
                Ok(()) => debug!(scope = %key, "view cache invalidated"),
                Err(error) => {
                    first_error.get_or_insert(error);
                }
            }
        }

        first_error.map_or(Ok(()), Err)
    }
}
