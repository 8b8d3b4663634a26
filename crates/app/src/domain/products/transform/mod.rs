//! Transformation
//!
//! Pure mappings from a request to the persisted shape, and from a stored
//! product to its view.

use jiff::Timestamp;
use rust_decimal::{Decimal, RoundingStrategy};

use crate::domain::products::{
    data::{NewProduct, ProductCategory, ProductDraft},
    records::ProductRecord,
    views::{DerivedFields, ProductView},
};

mod resolvers;

pub use resolvers::{RESOLVER_CHAIN, Resolver};

/// Home products are stored at 90% of the requested price.
fn home_price(requested: Decimal) -> Decimal {
    (requested * Decimal::new(9, 1)).round_dp_with_strategy(2, RoundingStrategy::MidpointNearestEven)
}

/// Map an accepted request onto the persisted shape.
#[must_use]
pub fn to_entity(request: &NewProduct) -> ProductDraft {
    let (price, image_url) = match request.category {
        ProductCategory::Home => (home_price(request.price), None),
        _ => (request.price, request.image_url.clone()),
    };

    ProductDraft {
        name: request.name.clone(),
        brand: request.brand.clone(),
        sku: request.sku.trim().to_string(),
        category: request.category,
        price,
        release_date: request.release_date,
        image_url,
        is_available: request.stock_quantity > 0,
        stock_quantity: request.stock_quantity,
    }
}

/// Run every resolver over `product`.
#[must_use]
pub fn to_view(product: &ProductRecord, now: Timestamp) -> ProductView {
    let mut derived = DerivedFields::default();

    for (field, resolve) in RESOLVER_CHAIN {
        derived.set(field, resolve(product, now));
    }

    ProductView {
        product: product.clone(),
        derived,
    }
}
