//! Validation Engine
//!
//! Runs every applicable rule against a creation request and reports all
//! failures at once. Nothing short-circuits.

use jiff::civil::Date;
use rust_decimal::Decimal;
use tracing::{trace, warn};

use crate::domain::products::{
    context::RequestContext,
    data::{NewProduct, ProductCategory, ProductField},
    errors::{InfrastructureError, ValidationError, ValidationErrors},
    store::ProductStore,
};

mod probes;
mod rules;

use rules::{HOME_RESTRICTED_WORDS, Patterns, RULES, RuleInput, contains_any};

/// Most products that may be created per UTC calendar day.
pub const DAILY_CREATION_LIMIT: u64 = 500;

const BUSINESS_RULES_MESSAGE: &str = "Business rules failed.";

#[derive(Debug)]
pub struct ValidationEngine {
    patterns: Patterns,
    daily_limit: u64,
}

impl ValidationEngine {
    /// # Errors
    ///
    /// Returns an error if a built-in pattern fails to compile.
    pub fn new(daily_limit: u64) -> Result<Self, regex::Error> {
        Ok(Self {
            patterns: Patterns::compile()?,
            daily_limit,
        })
    }

    /// Validate `request`, returning every violation in rule order.
    ///
    /// An empty list means the request was accepted.
    ///
    /// # Errors
    ///
    /// Returns an infrastructure error if a store-backed probe cannot run.
    /// Probe faults are never reported as validation errors.
    pub async fn validate(
        &self,
        request: &NewProduct,
        ctx: &RequestContext,
        store: &dyn ProductStore,
    ) -> Result<ValidationErrors, InfrastructureError> {
        self.validate_alongside(request, ctx, store, 0).await
    }

    /// Validate `request` as one of a group whose `pending` earlier members
    /// were accepted but not yet written. They count towards the daily limit.
    ///
    /// # Errors
    ///
    /// Returns an infrastructure error if a store-backed probe cannot run.
    pub async fn validate_alongside(
        &self,
        request: &NewProduct,
        ctx: &RequestContext,
        store: &dyn ProductStore,
        pending: u64,
    ) -> Result<ValidationErrors, InfrastructureError> {
        let mut errors = self.check_rules(request, ctx.today());

        let probed = [
            probes::sku_is_unique(request, ctx, store).await?,
            probes::name_and_brand_are_unique(request, ctx, store).await?,
            probes::within_daily_limit(self.daily_limit, pending, ctx, store).await?,
            composite_business_rules(request),
        ];

        for error in probed.into_iter().flatten() {
            errors.push(error);
        }

        Ok(errors)
    }

    /// Structural, semantic, category and cross-field rules only.
    #[must_use]
    pub fn check_rules(&self, request: &NewProduct, today: Date) -> ValidationErrors {
        let input = RuleInput {
            request,
            today,
            patterns: &self.patterns,
        };

        RULES
            .iter()
            .filter(|rule| (rule.applies)(request))
            .filter(|rule| !(rule.holds)(&input))
            .inspect(|rule| {
                trace!(group = ?rule.group, field = %rule.field, message = rule.message, "rule failed");
            })
            .map(|rule| ValidationError::invalid(rule.field, rule.message))
            .collect()
    }
}

/// Re-asserts category, price and stock interactions independently of the
/// category and cross-field rules.
fn composite_business_rules(request: &NewProduct) -> Option<ValidationError> {
    let electronics_below_floor =
        request.category == ProductCategory::Electronics && request.price < Decimal::from(50);
    let home_name_restricted = request.category == ProductCategory::Home
        && contains_any(&request.name, &HOME_RESTRICTED_WORDS);
    let premium_overstocked =
        request.price > Decimal::from(500) && request.stock_quantity > 10;

    if !(electronics_below_floor || home_name_restricted || premium_overstocked) {
        return None;
    }

    // The cross-field rule allows up to 20 units above $100; this one allows 10 above $500.
    if premium_overstocked && request.stock_quantity <= 20 {
        warn!(
            sku = %request.sku,
            price = %request.price,
            stock = request.stock_quantity,
            "composite business rule rejects stock the cross-field rule accepts"
        );
    }

    Some(ValidationError::invalid(ProductField::Product, BUSINESS_RULES_MESSAGE))
}

#[cfg(test)]
mod tests {
    use jiff::civil::date;
    use testresult::TestResult;
    use tokio_util::sync::CancellationToken;

    use crate::{
        domain::products::{
            errors::ViolationKind,
            store::{MemoryProductStore, MockProductStore, StoreError},
        },
        test::helpers::{new_product, record, request_context},
    };

    use super::*;

    fn engine() -> TestResult<ValidationEngine> {
        Ok(ValidationEngine::new(DAILY_CREATION_LIMIT)?)
    }

    fn messages(errors: &ValidationErrors) -> Vec<&str> {
        errors.iter().map(|error| error.message.as_str()).collect()
    }

    #[tokio::test]
    async fn valid_request_is_accepted() -> TestResult {
        let store = MemoryProductStore::new();

        let errors = engine()?
            .validate(&new_product("VAL-00001"), &request_context()?, &store)
            .await?;

        assert!(errors.is_empty(), "{errors}");

        Ok(())
    }

    #[tokio::test]
    async fn every_failure_is_reported() -> TestResult {
        let store = MemoryProductStore::new();
        let mut request = new_product("no");
        request.name = "  ".to_string();
        request.brand = "-Acme".to_string();
        request.price = Decimal::from(-5);
        request.stock_quantity = -1;
        request.release_date = date(1899, 12, 31);
        request.image_url = Some("ftp://example.com/a.png".to_string());

        let errors = engine()?
            .validate(&request, &request_context()?, &store)
            .await?;

        assert_eq!(
            messages(&errors),
            vec![
                "Product name is required.",
                "Brand contains invalid characters.",
                "SKU must be 5-20 chars, alphanumeric or hyphen.",
                "Price must be > 0.",
                "Release date cannot be before 1900.",
                "Stock cannot be negative.",
                "ImageUrl must be HTTP/HTTPS and end with .jpg/.jpeg/.png/.gif/.webp",
            ]
        );

        Ok(())
    }

    #[test]
    fn electronics_below_fifty_is_rejected_on_price() -> TestResult {
        let engine = engine()?;

        for cents in [1, 999, 2_500, 4_999] {
            let mut request = new_product("ELE-00001");
            request.name = "Smart Speaker".to_string();
            request.category = ProductCategory::Electronics;
            request.price = Decimal::new(cents, 2);

            let errors = engine.check_rules(&request, date(2026, 3, 1));

            assert!(
                errors
                    .for_field(ProductField::Price)
                    .any(|error| error.message == "Electronics must be at least $50."),
                "price {}",
                request.price
            );
        }

        Ok(())
    }

    #[test]
    fn category_rules_apply_only_to_their_category() -> TestResult {
        let engine = engine()?;
        let today = date(2026, 3, 1);

        let mut request = new_product("CAT-00001");
        request.name = "Toxic Cleaner".to_string();
        request.brand = "Ox".to_string();
        request.release_date = date(2015, 1, 1);

        request.category = ProductCategory::Books;
        assert!(engine.check_rules(&request, today).is_empty());

        request.category = ProductCategory::Home;
        assert_eq!(
            messages(&engine.check_rules(&request, today)),
            vec!["Home product name is not appropriate."]
        );

        request.category = ProductCategory::Clothing;
        assert_eq!(
            messages(&engine.check_rules(&request, today)),
            vec!["Clothing brand must be at least 3 characters."]
        );

        request.category = ProductCategory::Electronics;
        request.price = Decimal::from(80);
        assert_eq!(
            messages(&engine.check_rules(&request, today)),
            vec![
                "Electronics name must contain a technology keyword.",
                "Electronics must be released within last 5 years.",
            ]
        );

        Ok(())
    }

    #[test]
    fn unrecognized_category_is_rejected() -> TestResult {
        let mut request = new_product("CAT-00002");
        request.category = ProductCategory::from("Gadgets");

        let errors = engine()?.check_rules(&request, date(2026, 3, 1));

        assert_eq!(messages(&errors), vec!["Invalid product category."]);

        Ok(())
    }

    #[test]
    fn release_date_may_not_be_in_the_future() -> TestResult {
        let mut request = new_product("FUT-00001");
        request.release_date = date(2026, 3, 2);

        let errors = engine()?.check_rules(&request, date(2026, 3, 1));

        assert_eq!(messages(&errors), vec!["Release date cannot be in the future."]);

        Ok(())
    }

    #[test]
    fn price_is_limited_to_cents() -> TestResult {
        let engine = engine()?;
        let today = date(2026, 3, 1);
        let mut request = new_product("PRC-00002");

        request.price = Decimal::new(19_999, 3);
        let errors = engine.check_rules(&request, today);
        assert_eq!(messages(&errors), vec!["Price must have at most 2 decimal places."]);
        assert_eq!(errors.for_field(ProductField::Price).count(), 1);

        request.price = Decimal::new(19_990, 3);
        assert!(engine.check_rules(&request, today).is_empty());

        Ok(())
    }

    #[test]
    fn expensive_products_cap_stock() -> TestResult {
        let mut request = new_product("PRC-00001");
        request.price = Decimal::from(150);
        request.stock_quantity = 21;

        let errors = engine()?.check_rules(&request, date(2026, 3, 1));

        assert_eq!(messages(&errors), vec!["For price > $100, stock must be ≤ 20."]);

        Ok(())
    }

    #[tokio::test]
    async fn composite_rule_is_evaluated_independently() -> TestResult {
        let store = MemoryProductStore::new();
        let mut request = new_product("PRC-00002");
        request.price = Decimal::from(600);
        request.stock_quantity = 15;

        let errors = engine()?
            .validate(&request, &request_context()?, &store)
            .await?;

        assert_eq!(messages(&errors), vec![BUSINESS_RULES_MESSAGE]);
        assert!(errors.for_field(ProductField::StockQuantity).next().is_none());

        Ok(())
    }

    #[tokio::test]
    async fn existing_sku_and_name_are_conflicts() -> TestResult {
        let store = MemoryProductStore::new();
        let existing = record("DUP-00001", ProductCategory::Books);

        store.insert(&existing, &CancellationToken::new()).await?;

        let mut request = new_product("DUP-00001");
        request.name = existing.name.clone();
        request.brand = existing.brand.clone();

        let errors = engine()?
            .validate(&request, &request_context()?, &store)
            .await?;

        assert!(errors.is_conflict());
        assert_eq!(
            messages(&errors),
            vec![
                "SKU already exists.",
                "A product with the same Name and Brand already exists.",
            ]
        );
        assert!(errors.iter().all(|error| error.kind == ViolationKind::Conflict));

        Ok(())
    }

    #[tokio::test]
    async fn daily_limit_is_a_rate_limit_rejection() -> TestResult {
        let mut store = MockProductStore::new();

        store.expect_exists().returning(|_, _| Ok(false));
        store
            .expect_count()
            .times(1)
            .returning(|_, _| Ok(DAILY_CREATION_LIMIT));

        let errors = engine()?
            .validate(&new_product("LIM-00001"), &request_context()?, &store)
            .await?;

        assert!(errors.is_rate_limited());
        assert_eq!(messages(&errors), vec!["Daily product limit of 500 reached."]);

        Ok(())
    }

    #[tokio::test]
    async fn one_below_the_limit_is_accepted() -> TestResult {
        let mut store = MockProductStore::new();

        store.expect_exists().returning(|_, _| Ok(false));
        store
            .expect_count()
            .returning(|_, _| Ok(DAILY_CREATION_LIMIT - 1));

        let errors = engine()?
            .validate(&new_product("LIM-00002"), &request_context()?, &store)
            .await?;

        assert!(errors.is_empty(), "{errors}");

        Ok(())
    }

    #[tokio::test]
    async fn pending_products_count_towards_the_daily_limit() -> TestResult {
        let mut store = MockProductStore::new();

        store.expect_exists().returning(|_, _| Ok(false));
        store
            .expect_count()
            .returning(|_, _| Ok(DAILY_CREATION_LIMIT - 2));

        let engine = engine()?;
        let ctx = request_context()?;

        let last_slot = engine
            .validate_alongside(&new_product("LIM-00003"), &ctx, &store, 1)
            .await?;
        assert!(last_slot.is_empty(), "{last_slot}");

        let over = engine
            .validate_alongside(&new_product("LIM-00004"), &ctx, &store, 2)
            .await?;
        assert!(over.is_rate_limited());
        assert_eq!(messages(&over), vec!["Daily product limit of 500 reached."]);

        Ok(())
    }

    #[tokio::test]
    async fn probe_failures_are_infrastructure_errors() -> TestResult {
        let mut store = MockProductStore::new();

        store
            .expect_exists()
            .returning(|_, _| Err(StoreError::Unavailable("connection refused".to_string())));

        let result = engine()?
            .validate(&new_product("INF-00001"), &request_context()?, &store)
            .await;

        assert!(matches!(
            result,
            Err(InfrastructureError::Store(StoreError::Unavailable(_)))
        ));

        Ok(())
    }
}
