//! Product Records

use jiff::{Timestamp, civil::Date};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::{domain::products::data::ProductCategory, uuids::TypedUuid};

/// Product UUID
pub type ProductUuid = TypedUuid<ProductRecord>;

/// Product Record
///
/// A product as held by the store.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductRecord {
    pub uuid: ProductUuid,
    pub name: String,
    pub brand: String,
    pub sku: String,
    pub category: ProductCategory,
    pub price: Decimal,
    pub release_date: Date,
    pub image_url: Option<String>,
    pub is_available: bool,
    pub stock_quantity: i32,
    pub created_at: Timestamp,
    pub updated_at: Option<Timestamp>,
}
