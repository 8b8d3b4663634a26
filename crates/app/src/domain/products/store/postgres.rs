//! Postgres product store.

use std::future::Future;

use async_trait::async_trait;
use jiff_sqlx::{Date as SqlxDate, Timestamp as SqlxTimestamp};
use rust_decimal::Decimal;
use sqlx::{
    FromRow, PgPool, Postgres, Row,
    postgres::{PgArguments, PgRow},
    query::Query,
    query_as, query_scalar,
};
use tokio_util::sync::CancellationToken;

use crate::domain::products::{
    data::ProductCategory,
    records::{ProductRecord, ProductUuid},
    store::{ProductFilter, ProductStore, StoreError},
};

const INSERT_PRODUCT_SQL: &str = include_str!("sql/insert_product.sql");
const SELECT_PRODUCTS_SQL: &str = include_str!("sql/select_products.sql");
const COUNT_PRODUCTS_SQL: &str = include_str!("sql/count_products.sql");
const PRODUCT_EXISTS_SQL: &str = include_str!("sql/product_exists.sql");

/// PostgreSQL-backed product store.
#[derive(Debug, Clone)]
pub struct PgProductStore {
    pool: PgPool,
}

impl PgProductStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn insert_query(record: &ProductRecord) -> Query<'_, Postgres, PgArguments> {
    sqlx::query(INSERT_PRODUCT_SQL)
        .bind(record.uuid.into_uuid())
        .bind(record.name.as_str())
        .bind(record.brand.as_str())
        .bind(record.sku.as_str())
        .bind(record.category.as_str())
        .bind(record.price)
        .bind(SqlxDate::from(record.release_date))
        .bind(record.image_url.as_deref())
        .bind(record.is_available)
        .bind(record.stock_quantity)
        .bind(SqlxTimestamp::from(record.created_at))
        .bind(record.updated_at.map(SqlxTimestamp::from))
}

/// Positional parameters shared by the filtered queries. A `NULL` parameter
/// leaves its column unconstrained.
#[derive(Debug, Default)]
struct FilterParams<'a> {
    category: Option<&'static str>,
    sku: Option<&'a str>,
    name: Option<&'a str>,
    brand: Option<&'a str>,
    created_on: Option<SqlxDate>,
}

impl<'a> From<&'a ProductFilter> for FilterParams<'a> {
    fn from(filter: &'a ProductFilter) -> Self {
        match filter {
            ProductFilter::All => Self::default(),
            ProductFilter::Category(category) => Self {
                category: Some(category.as_str()),
                ..Self::default()
            },
            ProductFilter::Sku(sku) => Self {
                sku: Some(sku),
                ..Self::default()
            },
            ProductFilter::NameAndBrand { name, brand } => Self {
                name: Some(name),
                brand: Some(brand),
                ..Self::default()
            },
            ProductFilter::CreatedOn(date) => Self {
                created_on: Some(SqlxDate::from(*date)),
                ..Self::default()
            },
        }
    }
}

/// Race `work` against the caller's cancellation token.
async fn cancellable<T, F>(cancel: &CancellationToken, work: F) -> Result<T, StoreError>
where
    F: Future<Output = Result<T, StoreError>>,
{
    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(StoreError::Cancelled),
        result = work => result,
    }
}

#[async_trait]
impl ProductStore for PgProductStore {
    async fn insert(
        &self,
        record: &ProductRecord,
        cancel: &CancellationToken,
    ) -> Result<ProductUuid, StoreError> {
        cancellable(cancel, async {
            insert_query(record).execute(&self.pool).await?;

            Ok(record.uuid)
        })
        .await
    }

    async fn insert_many(
        &self,
        records: &[ProductRecord],
        cancel: &CancellationToken,
    ) -> Result<Vec<ProductUuid>, StoreError> {
        cancellable(cancel, async {
            let mut tx = self.pool.begin().await?;

            for (position, record) in records.iter().enumerate() {
                insert_query(record)
                    .execute(&mut *tx)
                    .await
                    .map_err(|error| StoreError::from(error).at_index(position))?;
            }

            tx.commit().await?;

            Ok(records.iter().map(|record| record.uuid).collect())
        })
        .await
    }

    fn supports_transactions(&self) -> bool {
        true
    }

    async fn exists(
        &self,
        filter: &ProductFilter,
        cancel: &CancellationToken,
    ) -> Result<bool, StoreError> {
        let params = FilterParams::from(filter);

        cancellable(cancel, async {
            Ok(query_scalar::<Postgres, bool>(PRODUCT_EXISTS_SQL)
                .bind(params.category)
                .bind(params.sku)
                .bind(params.name)
                .bind(params.brand)
                .bind(params.created_on)
                .fetch_one(&self.pool)
                .await?)
        })
        .await
    }

    async fn count(
        &self,
        filter: &ProductFilter,
        cancel: &CancellationToken,
    ) -> Result<u64, StoreError> {
        let params = FilterParams::from(filter);

        cancellable(cancel, async {
            let count = query_scalar::<Postgres, i64>(COUNT_PRODUCTS_SQL)
                .bind(params.category)
                .bind(params.sku)
                .bind(params.name)
                .bind(params.brand)
                .bind(params.created_on)
                .fetch_one(&self.pool)
                .await?;

            Ok(u64::try_from(count).unwrap_or(0))
        })
        .await
    }

    async fn query(
        &self,
        filter: &ProductFilter,
        cancel: &CancellationToken,
    ) -> Result<Vec<ProductRecord>, StoreError> {
        let params = FilterParams::from(filter);

        cancellable(cancel, async {
            Ok(query_as::<Postgres, ProductRecord>(SELECT_PRODUCTS_SQL)
                .bind(params.category)
                .bind(params.sku)
                .bind(params.name)
                .bind(params.brand)
                .bind(params.created_on)
                .fetch_all(&self.pool)
                .await?)
        })
        .await
    }
}

impl<'r> FromRow<'r, PgRow> for ProductRecord {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        let category: String = row.try_get("category")?;

        Ok(Self {
            uuid: ProductUuid::from_uuid(row.try_get("uuid")?),
            name: row.try_get("name")?,
            brand: row.try_get("brand")?,
            sku: row.try_get("sku")?,
            category: ProductCategory::from(category.as_str()),
            price: row.try_get::<Decimal, _>("price")?,
            release_date: row.try_get::<SqlxDate, _>("release_date")?.to_jiff(),
            image_url: row.try_get("image_url")?,
            is_available: row.try_get("is_available")?,
            stock_quantity: row.try_get("stock_quantity")?,
            created_at: row.try_get::<SqlxTimestamp, _>("created_at")?.to_jiff(),
            updated_at: row
                .try_get::<Option<SqlxTimestamp>, _>("updated_at")?
                .map(SqlxTimestamp::to_jiff),
        })
    }
}

#[cfg(test)]
mod tests {
    use jiff::Timestamp;
    use testresult::TestResult;

    use crate::test::{db::TestDb, helpers::record};

    use super::*;

    async fn store() -> (TestDb, PgProductStore) {
        let db = TestDb::new().await;
        let store = PgProductStore::new(db.pool().clone());

        (db, store)
    }

    #[tokio::test]
    #[ignore = "requires a Docker daemon for testcontainers"]
    async fn insert_then_query_round_trips_the_record() -> TestResult {
        let (_db, store) = store().await;
        let cancel = CancellationToken::new();

        let mut product = record("PG-000001", ProductCategory::Home);
        product.created_at = "2026-03-01T10:00:00Z".parse::<Timestamp>()?;

        store.insert(&product, &cancel).await?;

        let found = store
            .query(&ProductFilter::Category(ProductCategory::Home), &cancel)
            .await?;

        assert_eq!(found, vec![product]);

        Ok(())
    }

    #[tokio::test]
    #[ignore = "requires a Docker daemon for testcontainers"]
    async fn duplicate_sku_maps_to_unique_violation() -> TestResult {
        let (_db, store) = store().await;
        let cancel = CancellationToken::new();

        store
            .insert(&record("PG-000002", ProductCategory::Books), &cancel)
            .await?;

        let mut second = record("PG-000002", ProductCategory::Books);
        second.name = "Another Title".to_string();

        let result = store.insert(&second, &cancel).await;

        assert!(
            matches!(
                result,
                Err(StoreError::UniqueViolation {
                    field: crate::domain::products::store::UniqueField::Sku,
                    ..
                })
            ),
            "expected SKU violation, got {result:?}"
        );

        Ok(())
    }

    #[tokio::test]
    #[ignore = "requires a Docker daemon for testcontainers"]
    async fn failed_insert_many_rolls_back() -> TestResult {
        let (_db, store) = store().await;
        let cancel = CancellationToken::new();

        let first = record("PG-000003", ProductCategory::Home);
        let mut second = record("PG-000003", ProductCategory::Home);
        second.name = "Another Lamp".to_string();

        let result = store.insert_many(&[first, second], &cancel).await;

        assert!(
            matches!(result, Err(StoreError::UniqueViolation { index: Some(1), .. })),
            "expected violation at index 1, got {result:?}"
        );
        assert_eq!(store.count(&ProductFilter::All, &cancel).await?, 0);

        Ok(())
    }

    #[tokio::test]
    #[ignore = "requires a Docker daemon for testcontainers"]
    async fn created_on_counts_by_utc_date() -> TestResult {
        let (_db, store) = store().await;
        let cancel = CancellationToken::new();

        let mut late = record("PG-000004", ProductCategory::Books);
        late.created_at = "2026-03-01T23:59:00Z".parse()?;
        let mut early = record("PG-000005", ProductCategory::Books);
        early.name = "Other Book".to_string();
        early.created_at = "2026-03-02T00:01:00Z".parse()?;

        store.insert_many(&[late, early], &cancel).await?;

        let count = store
            .count(
                &ProductFilter::CreatedOn(jiff::civil::date(2026, 3, 2)),
                &cancel,
            )
            .await?;

        assert_eq!(count, 1);

        Ok(())
    }
}
