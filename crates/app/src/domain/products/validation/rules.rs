//! Synchronous rules
//!
//! Every rule is a guard deciding whether it applies plus a check that must
//! hold. Category and cross-field rules differ from the rest only in their
//! guard.

use jiff::{
    ToSpan,
    civil::{Date, date},
};
use regex::Regex;
use rust_decimal::Decimal;
use url::Url;

use crate::domain::products::data::{NewProduct, ProductCategory, ProductField};

pub(crate) const INAPPROPRIATE_WORDS: [&str; 5] = ["badword", "adult", "nsfw", "weapon", "explosive"];

pub(crate) const HOME_RESTRICTED_WORDS: [&str; 3] = ["weapon", "hazardous", "toxic"];

pub(crate) const TECHNOLOGY_KEYWORDS: [&str; 13] = [
    "smart", "wifi", "bluetooth", "oled", "4k", "8k", "ssd", "laptop", "phone", "camera", "usb",
    "type-c", "gaming",
];

const IMAGE_EXTENSIONS: [&str; 5] = [".jpg", ".jpeg", ".png", ".gif", ".webp"];

const EARLIEST_RELEASE: Date = date(1900, 1, 1);

const MAX_STOCK: i32 = 100_000;

/// Compiled patterns shared by every validation.
#[derive(Debug)]
pub(crate) struct Patterns {
    sku: Regex,
    brand: Regex,
}

impl Patterns {
    pub(crate) fn compile() -> Result<Self, regex::Error> {
        Ok(Self {
            sku: Regex::new(r"^[A-Za-z0-9-]{5,20}$")?,
            brand: Regex::new(r"^[\p{L}\p{M}0-9][\p{L}\p{M}0-9 .'\-]*$")?,
        })
    }
}

/// Everything a synchronous rule may look at.
#[derive(Debug, Clone, Copy)]
pub(crate) struct RuleInput<'a> {
    pub request: &'a NewProduct,
    pub today: Date,
    pub patterns: &'a Patterns,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) enum RuleGroup {
    Structural,
    Semantic,
    Category,
    CrossField,
}

pub(crate) struct Rule {
    pub group: RuleGroup,
    pub field: ProductField,
    pub message: &'static str,
    pub applies: fn(&NewProduct) -> bool,
    pub holds: fn(&RuleInput<'_>) -> bool,
}

pub(crate) fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    let haystack = haystack.to_lowercase();

    needles.iter().any(|needle| haystack.contains(needle))
}

fn is_present(value: &str) -> bool {
    !value.trim().is_empty()
}

fn length_between(value: &str, min: usize, max: usize) -> bool {
    (min..=max).contains(&value.chars().count())
}

fn is_image_url(value: &str) -> bool {
    let Ok(url) = Url::parse(value) else {
        return false;
    };

    if !matches!(url.scheme(), "http" | "https") {
        return false;
    }

    let path = url.path().to_lowercase();

    IMAGE_EXTENSIONS.iter().any(|extension| path.ends_with(extension))
}

fn always(_: &NewProduct) -> bool {
    true
}

fn is_category(request: &NewProduct, category: ProductCategory) -> bool {
    request.category == category
}

/// Evaluated in order; the order fixes the order of reported errors.
pub(crate) static RULES: &[Rule] = &[
    // Structural
    Rule {
        group: RuleGroup::Structural,
        field: ProductField::Name,
        message: "Product name is required.",
        applies: always,
        holds: |input| is_present(&input.request.name),
    },
    Rule {
        group: RuleGroup::Structural,
        field: ProductField::Name,
        message: "Product name must be between 1 and 200 characters.",
        applies: |request| is_present(&request.name),
        holds: |input| length_between(&input.request.name, 1, 200),
    },
    Rule {
        group: RuleGroup::Structural,
        field: ProductField::Name,
        message: "Product name contains inappropriate content.",
        applies: always,
        holds: |input| !contains_any(&input.request.name, &INAPPROPRIATE_WORDS),
    },
    Rule {
        group: RuleGroup::Structural,
        field: ProductField::Brand,
        message: "Brand is required.",
        applies: always,
        holds: |input| is_present(&input.request.brand),
    },
    Rule {
        group: RuleGroup::Structural,
        field: ProductField::Brand,
        message: "Brand must be between 2 and 100 characters.",
        applies: |request| is_present(&request.brand),
        holds: |input| length_between(&input.request.brand, 2, 100),
    },
    Rule {
        group: RuleGroup::Structural,
        field: ProductField::Brand,
        message: "Brand contains invalid characters.",
        applies: |request| is_present(&request.brand),
        holds: |input| input.patterns.brand.is_match(&input.request.brand),
    },
    Rule {
        group: RuleGroup::Structural,
        field: ProductField::Sku,
        message: "SKU is required.",
        applies: always,
        holds: |input| is_present(&input.request.sku),
    },
    Rule {
        group: RuleGroup::Structural,
        field: ProductField::Sku,
        message: "SKU must be 5-20 chars, alphanumeric or hyphen.",
        applies: |request| is_present(&request.sku),
        holds: |input| input.patterns.sku.is_match(input.request.sku.trim()),
    },
    // Semantic
    Rule {
        group: RuleGroup::Semantic,
        field: ProductField::Category,
        message: "Invalid product category.",
        applies: always,
        holds: |input| input.request.category.is_recognized(),
    },
    Rule {
        group: RuleGroup::Semantic,
        field: ProductField::Price,
        message: "Price must be > 0.",
        applies: always,
        holds: |input| input.request.price > Decimal::ZERO,
    },
    Rule {
        group: RuleGroup::Semantic,
        field: ProductField::Price,
        message: "Price must be < 10,000.",
        applies: always,
        holds: |input| input.request.price < Decimal::from(10_000),
    },
    // Stored as NUMERIC(12, 2); anything finer would be rounded on write.
    Rule {
        group: RuleGroup::Semantic,
        field: ProductField::Price,
        message: "Price must have at most 2 decimal places.",
        applies: always,
        holds: |input| input.request.price.normalize().scale() <= 2,
    },
    Rule {
        group: RuleGroup::Semantic,
        field: ProductField::ReleaseDate,
        message: "Release date cannot be before 1900.",
        applies: always,
        holds: |input| input.request.release_date >= EARLIEST_RELEASE,
    },
    Rule {
        group: RuleGroup::Semantic,
        field: ProductField::ReleaseDate,
        message: "Release date cannot be in the future.",
        applies: always,
        holds: |input| input.request.release_date <= input.today,
    },
    Rule {
        group: RuleGroup::Semantic,
        field: ProductField::StockQuantity,
        message: "Stock cannot be negative.",
        applies: always,
        holds: |input| input.request.stock_quantity >= 0,
    },
    Rule {
        group: RuleGroup::Semantic,
        field: ProductField::StockQuantity,
        message: "Stock too large.",
        applies: always,
        holds: |input| input.request.stock_quantity <= MAX_STOCK,
    },
    Rule {
        group: RuleGroup::Semantic,
        field: ProductField::ImageUrl,
        message: "ImageUrl must be HTTP/HTTPS and end with .jpg/.jpeg/.png/.gif/.webp",
        applies: |request| request.image_url.as_deref().is_some_and(is_present),
        holds: |input| input.request.image_url.as_deref().is_some_and(is_image_url),
    },
    // Conditional by category
    Rule {
        group: RuleGroup::Category,
        field: ProductField::Price,
        message: "Electronics must be at least $50.",
        applies: |request| is_category(request, ProductCategory::Electronics),
        holds: |input| input.request.price >= Decimal::from(50),
    },
    Rule {
        group: RuleGroup::Category,
        field: ProductField::Name,
        message: "Electronics name must contain a technology keyword.",
        applies: |request| is_category(request, ProductCategory::Electronics),
        holds: |input| contains_any(&input.request.name, &TECHNOLOGY_KEYWORDS),
    },
    Rule {
        group: RuleGroup::Category,
        field: ProductField::ReleaseDate,
        message: "Electronics must be released within last 5 years.",
        applies: |request| is_category(request, ProductCategory::Electronics),
        holds: |input| input.request.release_date >= input.today.saturating_sub(5.years()),
    },
    Rule {
        group: RuleGroup::Category,
        field: ProductField::Price,
        message: "Home products must be at most $200.",
        applies: |request| is_category(request, ProductCategory::Home),
        holds: |input| input.request.price <= Decimal::from(200),
    },
    Rule {
        group: RuleGroup::Category,
        field: ProductField::Name,
        message: "Home product name is not appropriate.",
        applies: |request| is_category(request, ProductCategory::Home),
        holds: |input| !contains_any(&input.request.name, &HOME_RESTRICTED_WORDS),
    },
    Rule {
        group: RuleGroup::Category,
        field: ProductField::Brand,
        message: "Clothing brand must be at least 3 characters.",
        applies: |request| is_category(request, ProductCategory::Clothing),
        holds: |input| input.request.brand.chars().count() >= 3,
    },
    // Cross-field
    Rule {
        group: RuleGroup::CrossField,
        field: ProductField::StockQuantity,
        message: "For price > $100, stock must be ≤ 20.",
        applies: |request| request.price > Decimal::from(100),
        holds: |input| input.request.stock_quantity <= 20,
    },
];
