//! Test Helpers

use std::time::Duration;

use jiff::{Timestamp, civil::date};
use rust_decimal::Decimal;
use testresult::TestResult;
use tokio_util::sync::CancellationToken;

use crate::domain::products::{
    context::RequestContext,
    data::{NewProduct, ProductCategory},
    records::{ProductRecord, ProductUuid},
};

/// The instant fixture clocks start at.
pub(crate) const NOW: &str = "2026-03-01T12:00:00Z";

pub(crate) fn now() -> TestResult<Timestamp> {
    Ok(NOW.parse()?)
}

pub(crate) fn request_context() -> TestResult<RequestContext> {
    Ok(RequestContext::new(
        now()?,
        CancellationToken::new(),
        Duration::from_secs(5),
    ))
}

/// A valid Books request. The name embeds the SKU so requests with distinct
/// SKUs never collide on Name+Brand.
pub(crate) fn new_product(sku: &str) -> NewProduct {
    NewProduct {
        name: format!("Product {sku}"),
        brand: "Acme Press".to_string(),
        sku: sku.to_string(),
        category: ProductCategory::Books,
        price: Decimal::new(1_999, 2),
        release_date: date(2024, 6, 1),
        image_url: None,
        stock_quantity: 10,
    }
}

/// A stored product. Every record shares one Name+Brand pair.
pub(crate) fn record(sku: &str, category: ProductCategory) -> ProductRecord {
    ProductRecord {
        uuid: ProductUuid::new(),
        name: "Test Product".to_string(),
        brand: "Test Brand".to_string(),
        sku: sku.to_string(),
        category,
        price: Decimal::new(1_999, 2),
        release_date: date(2024, 6, 1),
        image_url: None,
        is_available: true,
        stock_quantity: 10,
        created_at: Timestamp::from_second(1_772_366_400).unwrap_or(Timestamp::UNIX_EPOCH),
        updated_at: None,
    }
}
