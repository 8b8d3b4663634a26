//! In-memory product store.

use async_trait::async_trait;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

use crate::domain::products::{
    records::{ProductRecord, ProductUuid},
    store::{ProductFilter, ProductStore, StoreError, UniqueField},
};

/// Process-local store enforcing the same uniqueness constraints as the
/// Postgres schema.
#[derive(Debug)]
pub struct MemoryProductStore {
    records: RwLock<Vec<ProductRecord>>,
    transactional: bool,
}

impl Default for MemoryProductStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryProductStore {
    /// A store whose multi-record writes are all-or-nothing.
    #[must_use]
    pub fn new() -> Self {
        Self {
            records: RwLock::new(Vec::new()),
            transactional: true,
        }
    }

    /// A store that writes multi-record batches one record at a time.
    #[must_use]
    pub fn non_transactional() -> Self {
        Self {
            records: RwLock::new(Vec::new()),
            transactional: false,
        }
    }

    /// Number of stored products.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

fn collision(existing: &[ProductRecord], candidate: &ProductRecord) -> Option<UniqueField> {
    existing.iter().find_map(|record| {
        if record.sku == candidate.sku {
            Some(UniqueField::Sku)
        } else if record.name == candidate.name && record.brand == candidate.brand {
            Some(UniqueField::NameAndBrand)
        } else {
            None
        }
    })
}

fn ensure_active(cancel: &CancellationToken) -> Result<(), StoreError> {
    if cancel.is_cancelled() {
        return Err(StoreError::Cancelled);
    }

    Ok(())
}

#[async_trait]
impl ProductStore for MemoryProductStore {
    async fn insert(
        &self,
        record: &ProductRecord,
        cancel: &CancellationToken,
    ) -> Result<ProductUuid, StoreError> {
        ensure_active(cancel)?;

        let mut records = self.records.write().await;

        if let Some(field) = collision(&records, record) {
            return Err(StoreError::UniqueViolation { field, index: None });
        }

        records.push(record.clone());

        Ok(record.uuid)
    }

    async fn insert_many(
        &self,
        batch: &[ProductRecord],
        cancel: &CancellationToken,
    ) -> Result<Vec<ProductUuid>, StoreError> {
        ensure_active(cancel)?;

        let mut records = self.records.write().await;

        if self.transactional {
            let mut staged: Vec<ProductRecord> = Vec::with_capacity(batch.len());

            for (position, record) in batch.iter().enumerate() {
                let field = collision(&records, record).or_else(|| collision(&staged, record));

                if let Some(field) = field {
                    return Err(StoreError::UniqueViolation {
                        field,
                        index: Some(position),
                    });
                }

                staged.push(record.clone());
            }

            records.extend(staged);
        } else {
            for (position, record) in batch.iter().enumerate() {
                if let Some(field) = collision(&records, record) {
                    return Err(StoreError::UniqueViolation {
                        field,
                        index: Some(position),
                    });
                }

                records.push(record.clone());
            }
        }

        Ok(batch.iter().map(|record| record.uuid).collect())
    }

    fn supports_transactions(&self) -> bool {
        self.transactional
    }

    async fn exists(
        &self,
        filter: &ProductFilter,
        cancel: &CancellationToken,
    ) -> Result<bool, StoreError> {
        ensure_active(cancel)?;

        Ok(self
            .records
            .read()
            .await
            .iter()
            .any(|record| filter.matches(record)))
    }

    async fn count(
        &self,
        filter: &ProductFilter,
        cancel: &CancellationToken,
    ) -> Result<u64, StoreError> {
        ensure_active(cancel)?;

        let matching = self
            .records
            .read()
            .await
            .iter()
            .filter(|record| filter.matches(record))
            .count();

        Ok(u64::try_from(matching).unwrap_or(u64::MAX))
    }

    async fn query(
        &self,
        filter: &ProductFilter,
        cancel: &CancellationToken,
    ) -> Result<Vec<ProductRecord>, StoreError> {
        ensure_active(cancel)?;

        Ok(self
            .records
            .read()
            .await
            .iter()
            .filter(|record| filter.matches(record))
            .cloned()
            .collect())
    }
}
