//! Store-backed probes
//!
//! Advisory existence and rate checks. Each one is a separate store call bounded
//! by the request's cancellation token and timeout.

use tracing::{info, warn};

use crate::domain::products::{
    context::RequestContext,
    data::NewProduct,
    errors::ValidationError,
    store::{ProductFilter, ProductStore, StoreError, UniqueField},
};

pub(crate) async fn sku_is_unique(
    request: &NewProduct,
    ctx: &RequestContext,
    store: &dyn ProductStore,
) -> Result<Option<ValidationError>, StoreError> {
    let filter = ProductFilter::Sku(request.sku.trim().to_string());
    let exists = ctx.guard(store.exists(&filter, ctx.cancellation())).await?;

    if exists {
        info!(sku = %request.sku, "SKU duplicate check failed");

        return Ok(Some(ValidationError::already_exists(UniqueField::Sku)));
    }

    Ok(None)
}

pub(crate) async fn name_and_brand_are_unique(
    request: &NewProduct,
    ctx: &RequestContext,
    store: &dyn ProductStore,
) -> Result<Option<ValidationError>, StoreError> {
    let filter = ProductFilter::NameAndBrand {
        name: request.name.clone(),
        brand: request.brand.clone(),
    };
    let exists = ctx.guard(store.exists(&filter, ctx.cancellation())).await?;

    if exists {
        info!(
            name = %request.name,
            brand = %request.brand,
            "Name+Brand duplicate check failed"
        );

        return Ok(Some(ValidationError::already_exists(UniqueField::NameAndBrand)));
    }

    Ok(None)
}

/// Fewer than `limit` products may have been created today (UTC), counting
/// the `pending` products already accepted alongside this one.
pub(crate) async fn within_daily_limit(
    limit: u64,
    pending: u64,
    ctx: &RequestContext,
    store: &dyn ProductStore,
) -> Result<Option<ValidationError>, StoreError> {
    let filter = ProductFilter::CreatedOn(ctx.today());
    let created_today = ctx.guard(store.count(&filter, ctx.cancellation())).await?;

    if created_today.saturating_add(pending) >= limit {
        warn!(count = created_today, pending, limit, "daily product limit reached");

        return Ok(Some(ValidationError::rate_limited(format!(
            "Daily product limit of {limit} reached."
        ))));
    }

    Ok(None)
}
