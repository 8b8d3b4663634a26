//! View Cache
//!
//! Read-through cache of derived product views, partitioned by scope.

use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    sync::Arc,
    time::Duration,
};

use async_trait::async_trait;
use mockall::automock;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::domain::products::{
    context::Interrupted, data::ProductCategory, store::ProductFilter, views::ProductView,
};

mod coordinator;
mod moka;

pub use coordinator::CacheCoordinator;
pub use moka::MokaViewCache;

/// How long a populated scope stays cached.
pub const VIEW_CACHE_TTL: Duration = Duration::from_secs(5 * 60);

/// Cached list of views.
pub type CachedViews = Arc<[ProductView]>;

/// Cache partition: every product, or the products of one category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CacheScope {
    All,
    Category(ProductCategory),
}

impl CacheScope {
    /// The cache key for this scope ("all", "home", ...).
    #[must_use]
    pub fn key(self) -> String {
        match self {
            Self::All => "all".to_string(),
            Self::Category(category) => category.as_str().to_ascii_lowercase(),
        }
    }

    /// Store filter selecting the products this scope holds.
    #[must_use]
    pub fn filter(self) -> ProductFilter {
        match self {
            Self::All => ProductFilter::All,
            Self::Category(category) => ProductFilter::Category(category),
        }
    }

    /// Scopes made stale by creating products in `categories`: "all" plus each
    /// distinct category, once.
    pub fn affected_by<I>(categories: I) -> Vec<Self>
    where
        I: IntoIterator<Item = ProductCategory>,
    {
        let mut scopes = vec![Self::All];

        for category in categories {
            let scope = Self::Category(category);

            if !scopes.contains(&scope) {
                scopes.push(scope);
            }
        }

        scopes
    }
}

impl Display for CacheScope {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(&self.key())
    }
}

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache operation cancelled")]
    Cancelled,

    #[error("cache operation timed out")]
    TimedOut,

    #[error("cache unavailable: {0}")]
    Unavailable(String),
}

impl From<Interrupted> for CacheError {
    fn from(value: Interrupted) -> Self {
        match value {
            Interrupted::Cancelled => Self::Cancelled,
            Interrupted::TimedOut => Self::TimedOut,
        }
    }
}

/// Key/value cache collaborator.
#[automock]
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(
        &self,
        key: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<CachedViews>, CacheError>;

    async fn set(
        &self,
        key: &str,
        views: CachedViews,
        ttl: Duration,
        cancel: &CancellationToken,
    ) -> Result<(), CacheError>;

    async fn remove(&self, key: &str, cancel: &CancellationToken) -> Result<(), CacheError>;
}
