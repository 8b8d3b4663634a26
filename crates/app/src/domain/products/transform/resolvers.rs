//! Derived field resolvers
//!
//! Each resolver computes one view field from a stored product and the
//! current instant.

use jiff::{Timestamp, tz::TimeZone};
use rust_decimal::{Decimal, RoundingStrategy, prelude::ToPrimitive};
use rusty_money::{Money, iso};

use crate::domain::products::{
    data::ProductCategory, records::ProductRecord, views::DerivedField,
};

pub type Resolver = fn(&ProductRecord, Timestamp) -> String;

/// Every resolver, in the order they run.
pub const RESOLVER_CHAIN: [(DerivedField, Resolver); 5] = [
    (DerivedField::CategoryLabel, category_label),
    (DerivedField::FormattedPrice, formatted_price),
    (DerivedField::ProductAge, product_age),
    (DerivedField::BrandInitials, brand_initials),
    (DerivedField::AvailabilityStatus, availability_status),
];

pub fn category_label(product: &ProductRecord, _now: Timestamp) -> String {
    match product.category {
        ProductCategory::Electronics => "Electronics & Technology",
        ProductCategory::Clothing => "Clothing & Fashion",
        ProductCategory::Books => "Books & Media",
        ProductCategory::Home => "Home & Garden",
        ProductCategory::Other | ProductCategory::Unrecognized => "Uncategorized",
    }
    .to_string()
}

/// US-dollar rendering to two decimals, e.g. `$1,999.99`.
pub fn formatted_price(product: &ProductRecord, _now: Timestamp) -> String {
    let cents = product
        .price
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
        * Decimal::ONE_HUNDRED;

    cents.trunc().to_i64().map_or_else(
        || format!("${:.2}", product.price),
        |minor| Money::from_minor(minor, iso::USD).to_string(),
    )
}

/// Whole days since release, bucketed.
pub fn product_age(product: &ProductRecord, now: Timestamp) -> String {
    let today = now.to_zoned(TimeZone::UTC).date();
    let days = product
        .release_date
        .until(today)
        .map_or(0, |span| span.get_days())
        .max(0);

    match days {
        0..30 => "New Release".to_string(),
        30..365 => format!("{} months old", days / 30),
        365..1825 => format!("{} years old", days / 365),
        _ => "Classic".to_string(),
    }
}

pub fn brand_initials(product: &ProductRecord, _now: Timestamp) -> String {
    let mut tokens = product.brand.split_whitespace();

    let Some(first) = tokens.next() else {
        return "?".to_string();
    };

    let initial = |token: &str| -> String {
        token
            .chars()
            .next()
            .map(|c| c.to_uppercase().collect())
            .unwrap_or_default()
    };

    match tokens.last() {
        Some(last) => format!("{}{}", initial(first), initial(last)),
        None => initial(first),
    }
}

pub fn availability_status(product: &ProductRecord, _now: Timestamp) -> String {
    if !product.is_available {
        return "Out of Stock".to_string();
    }

    match product.stock_quantity {
        0 => "Unavailable",
        1 => "Last Item",
        ..=5 => "Limited Stock",
        _ => "In Stock",
    }
    .to_string()
}
