//! Product Views

use serde::Serialize;

use crate::domain::products::records::ProductRecord;

/// A view-only field computed from a stored product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DerivedField {
    CategoryLabel,
    FormattedPrice,
    ProductAge,
    BrandInitials,
    AvailabilityStatus,
}

/// Values of every derived field. Never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivedFields {
    pub category_label: String,
    pub formatted_price: String,
    pub product_age: String,
    pub brand_initials: String,
    pub availability_status: String,
}

impl DerivedFields {
    pub fn set(&mut self, field: DerivedField, value: String) {
        let slot = match field {
            DerivedField::CategoryLabel => &mut self.category_label,
            DerivedField::FormattedPrice => &mut self.formatted_price,
            DerivedField::ProductAge => &mut self.product_age,
            DerivedField::BrandInitials => &mut self.brand_initials,
            DerivedField::AvailabilityStatus => &mut self.availability_status,
        };

        *slot = value;
    }
}

/// Product View
///
/// A stored product plus its derived fields, serialized flat.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductView {
    #[serde(flatten)]
    pub product: ProductRecord,

    #[serde(flatten)]
    pub derived: DerivedFields,
}
