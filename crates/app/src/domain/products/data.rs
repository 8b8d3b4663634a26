//! Products Data

use std::fmt::{Display, Formatter, Result as FmtResult};

use jiff::{Timestamp, civil::Date};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::domain::products::records::{ProductRecord, ProductUuid};

/// Product category.
///
/// Names outside the catalog's set deserialize to [`ProductCategory::Unrecognized`]
/// so validation can report them instead of failing at the parsing boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ProductCategory {
    Electronics,
    Clothing,
    Books,
    Home,
    Other,
    Unrecognized,
}

impl ProductCategory {
    /// Every category a product may be persisted with.
    pub const RECOGNIZED: [Self; 5] = [
        Self::Electronics,
        Self::Clothing,
        Self::Books,
        Self::Home,
        Self::Other,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Electronics => "Electronics",
            Self::Clothing => "Clothing",
            Self::Books => "Books",
            Self::Home => "Home",
            Self::Other => "Other",
            Self::Unrecognized => "Unrecognized",
        }
    }

    #[must_use]
    pub const fn is_recognized(self) -> bool {
        !matches!(self, Self::Unrecognized)
    }
}

impl Display for ProductCategory {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

impl From<&str> for ProductCategory {
    fn from(value: &str) -> Self {
        Self::RECOGNIZED
            .into_iter()
            .find(|category| category.as_str().eq_ignore_ascii_case(value.trim()))
            .unwrap_or(Self::Unrecognized)
    }
}

impl Serialize for ProductCategory {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ProductCategory {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;

        Ok(Self::from(raw.as_str()))
    }
}

/// Field a validation error is addressed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProductField {
    Name,
    Brand,
    Sku,
    Category,
    Price,
    ReleaseDate,
    ImageUrl,
    StockQuantity,
    /// Rules spanning the whole request rather than a single field.
    Product,
}

impl ProductField {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Name => "Name",
            Self::Brand => "Brand",
            Self::Sku => "SKU",
            Self::Category => "Category",
            Self::Price => "Price",
            Self::ReleaseDate => "ReleaseDate",
            Self::ImageUrl => "ImageUrl",
            Self::StockQuantity => "StockQuantity",
            Self::Product => "Product",
        }
    }
}

impl Display for ProductField {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

impl Serialize for ProductField {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

const fn default_stock_quantity() -> i32 {
    1
}

/// New Product Data
///
/// A caller-supplied creation request. Nothing here has been validated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProduct {
    pub name: String,
    pub brand: String,
    pub sku: String,
    pub category: ProductCategory,
    pub price: Decimal,
    pub release_date: Date,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default = "default_stock_quantity")]
    pub stock_quantity: i32,
}

/// Product Draft
///
/// The persisted shape of a product before the pipeline assigns its identity
/// and creation time.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductDraft {
    pub name: String,
    pub brand: String,
    pub sku: String,
    pub category: ProductCategory,
    pub price: Decimal,
    pub release_date: Date,
    pub image_url: Option<String>,
    pub is_available: bool,
    pub stock_quantity: i32,
}

impl ProductDraft {
    /// Stamp the draft with an id and creation time.
    #[must_use]
    pub fn into_record(self, uuid: ProductUuid, created_at: Timestamp) -> ProductRecord {
        ProductRecord {
            uuid,
            name: self.name,
            brand: self.brand,
            sku: self.sku,
            category: self.category,
            price: self.price,
            release_date: self.release_date,
            image_url: self.image_url,
            is_available: self.is_available,
            stock_quantity: self.stock_quantity,
            created_at,
            updated_at: None,
        }
    }
}
