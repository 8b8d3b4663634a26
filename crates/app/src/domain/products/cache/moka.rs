//! Moka-backed view cache.

use std::{
    fmt::{Debug, Formatter, Result as FmtResult},
    time::{Duration, Instant},
};

use async_trait::async_trait;
use moka::{Expiry, future::Cache};
use tokio_util::sync::CancellationToken;

use crate::domain::products::cache::{CacheError, CacheStore, CachedViews};

#[derive(Clone)]
struct Entry {
    views: CachedViews,
    ttl: Duration,
}

/// Expires each entry after the TTL it was stored with.
struct PerEntryTtl;

impl Expiry<String, Entry> for PerEntryTtl {
    fn expire_after_create(&self, _key: &String, entry: &Entry, _created_at: Instant) -> Option<Duration> {
        Some(entry.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        entry: &Entry,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(entry.ttl)
    }
}

/// In-process cache using Moka (TinyLFU admission, per-entry expiry).
#[derive(Clone)]
pub struct MokaViewCache {
    inner: Cache<String, Entry>,
}

impl MokaViewCache {
    /// Create a cache holding at most `capacity` scopes.
    #[must_use]
    pub fn new(capacity: u64) -> Self {
        Self {
            inner: Cache::builder()
                .max_capacity(capacity)
                .expire_after(PerEntryTtl)
                .build(),
        }
    }
}

impl Debug for MokaViewCache {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("MokaViewCache")
            .field("entries", &self.inner.entry_count())
            .finish()
    }
}

fn ensure_active(cancel: &CancellationToken) -> Result<(), CacheError> {
    if cancel.is_cancelled() {
        return Err(CacheError::Cancelled);
    }

    Ok(())
}

#[async_trait]
impl CacheStore for MokaViewCache {
    async fn get(
        &self,
        key: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<CachedViews>, CacheError> {
        ensure_active(cancel)?;

        Ok(self.inner.get(key).await.map(|entry| entry.views))
    }

    async fn set(
        &self,
        key: &str,
        views: CachedViews,
        ttl: Duration,
        cancel: &CancellationToken,
    ) -> Result<(), CacheError> {
        ensure_active(cancel)?;

        self.inner.insert(key.to_string(), Entry { views, ttl }).await;

        Ok(())
    }

    async fn remove(&self, key: &str, cancel: &CancellationToken) -> Result<(), CacheError> {
        ensure_active(cancel)?;

        self.inner.invalidate(key).await;

        Ok(())
    }
}
