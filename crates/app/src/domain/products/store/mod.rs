//! Product Store
//!
//! The persistence collaborator. The store's uniqueness constraints are the
//! authoritative guard; the pipeline's existence probes are advisory.

use std::fmt::{Display, Formatter, Result as FmtResult};

use async_trait::async_trait;
use jiff::{civil::Date, tz::TimeZone};
use mockall::automock;
use sqlx::error::ErrorKind;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::domain::products::{
    context::Interrupted,
    data::ProductCategory,
    records::{ProductRecord, ProductUuid},
};

mod memory;
mod postgres;

pub use memory::MemoryProductStore;
pub use postgres::PgProductStore;

pub(crate) const SKU_CONSTRAINT: &str = "products_sku_key";
pub(crate) const NAME_BRAND_CONSTRAINT: &str = "products_name_brand_key";

/// Which uniqueness invariant a write collided with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniqueField {
    Sku,
    NameAndBrand,
}

impl Display for UniqueField {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::Sku => f.write_str("SKU"),
            Self::NameAndBrand => f.write_str("Name and Brand"),
        }
    }
}

/// Selects products for existence checks, counts and reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProductFilter {
    All,
    Category(ProductCategory),
    Sku(String),
    NameAndBrand { name: String, brand: String },
    /// Products whose `created_at` falls on this UTC date.
    CreatedOn(Date),
}

impl ProductFilter {
    #[must_use]
    pub fn matches(&self, record: &ProductRecord) -> bool {
        match self {
            Self::All => true,
            Self::Category(category) => record.category == *category,
            Self::Sku(sku) => record.sku == *sku,
            Self::NameAndBrand { name, brand } => record.name == *name && record.brand == *brand,
            Self::CreatedOn(date) => record.created_at.to_zoned(TimeZone::UTC).date() == *date,
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    /// `index` is the position of the offending record within a multi-record write.
    #[error("unique constraint on {field} violated")]
    UniqueViolation {
        field: UniqueField,
        index: Option<usize>,
    },

    #[error("store operation cancelled")]
    Cancelled,

    #[error("store operation timed out")]
    TimedOut,

    #[error("storage error")]
    Sql(#[source] sqlx::Error),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    /// Attach the position of the failing record in a multi-record write.
    #[must_use]
    pub fn at_index(self, position: usize) -> Self {
        match self {
            Self::UniqueViolation { field, .. } => Self::UniqueViolation {
                field,
                index: Some(position),
            },
            other => other,
        }
    }
}

impl From<Interrupted> for StoreError {
    fn from(value: Interrupted) -> Self {
        match value {
            Interrupted::Cancelled => Self::Cancelled,
            Interrupted::TimedOut => Self::TimedOut,
        }
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(error: sqlx::Error) -> Self {
        let Some(database_error) = error.as_database_error() else {
            return Self::Sql(error);
        };

        if !matches!(database_error.kind(), ErrorKind::UniqueViolation) {
            return Self::Sql(error);
        }

        match database_error.constraint() {
            Some(SKU_CONSTRAINT) => Self::UniqueViolation {
                field: UniqueField::Sku,
                index: None,
            },
            Some(NAME_BRAND_CONSTRAINT) => Self::UniqueViolation {
                field: UniqueField::NameAndBrand,
                index: None,
            },
            Some(_) | None => Self::Sql(error),
        }
    }
}

/// Persistence operations the pipeline relies on.
///
/// Implementations must stop work and return [`StoreError::Cancelled`] once
/// `cancel` fires.
#[automock]
#[async_trait]
pub trait ProductStore: Send + Sync {
    /// Persist a single product.
    async fn insert(
        &self,
        record: &ProductRecord,
        cancel: &CancellationToken,
    ) -> Result<ProductUuid, StoreError>;

    /// Persist several products, atomically when [`Self::supports_transactions`] is true.
    async fn insert_many(
        &self,
        records: &[ProductRecord],
        cancel: &CancellationToken,
    ) -> Result<Vec<ProductUuid>, StoreError>;

    /// Whether `insert_many` commits all records or none.
    fn supports_transactions(&self) -> bool;

    async fn exists(
        &self,
        filter: &ProductFilter,
        cancel: &CancellationToken,
    ) -> Result<bool, StoreError>;

    async fn count(
        &self,
        filter: &ProductFilter,
        cancel: &CancellationToken,
    ) -> Result<u64, StoreError>;

    /// Products matching `filter`, oldest first.
    async fn query(
        &self,
        filter: &ProductFilter,
        cancel: &CancellationToken,
    ) -> Result<Vec<ProductRecord>, StoreError>;
}
