//! Inventory Summary

use std::collections::BTreeMap;

use jiff::{Timestamp, civil::Date, tz::TimeZone};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::domain::products::{data::ProductCategory, records::ProductRecord};

/// Stock held in one category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryInventory {
    pub category: ProductCategory,
    pub product_count: u64,
    pub total_stock: i64,
    pub average_price: Decimal,
}

/// Catalog-wide stock and value figures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InventorySummary {
    pub total_products: u64,
    pub total_stock: i64,
    pub total_inventory_value: Decimal,
    pub average_price: Decimal,
    pub added_today: u64,
    pub last_created_at: Option<Timestamp>,
    pub categories: Vec<CategoryInventory>,
}

#[derive(Default)]
struct Tally {
    count: u64,
    stock: i64,
    price_sum: Decimal,
}

impl Tally {
    fn add(&mut self, product: &ProductRecord) {
        self.count += 1;
        self.stock += i64::from(product.stock_quantity);
        self.price_sum += product.price;
    }

    fn average_price(&self) -> Decimal {
        if self.count == 0 {
            return Decimal::ZERO;
        }

        (self.price_sum / Decimal::from(self.count)).round_dp(2)
    }
}

impl InventorySummary {
    /// Summarize `products`, counting those created on `today` (UTC).
    #[must_use]
    pub fn from_records(products: &[ProductRecord], today: Date) -> Self {
        let mut overall = Tally::default();
        let mut by_category: BTreeMap<ProductCategory, Tally> = BTreeMap::new();
        let mut total_inventory_value = Decimal::ZERO;
        let mut added_today = 0;

        for product in products {
            overall.add(product);
            by_category.entry(product.category).or_default().add(product);
            total_inventory_value += product.price * Decimal::from(product.stock_quantity);

            if product.created_at.to_zoned(TimeZone::UTC).date() == today {
                added_today += 1;
            }
        }

        Self {
            total_products: overall.count,
            total_stock: overall.stock,
            total_inventory_value,
            average_price: overall.average_price(),
            added_today,
            last_created_at: products.iter().map(|product| product.created_at).max(),
            categories: by_category
                .into_iter()
                .map(|(category, tally)| CategoryInventory {
                    category,
                    product_count: tally.count,
                    total_stock: tally.stock,
                    average_price: tally.average_price(),
                })
                .collect(),
        }
    }
}
