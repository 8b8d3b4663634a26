//! Products service errors.

use std::fmt::{Display, Formatter, Result as FmtResult};

use serde::Serialize;
use thiserror::Error;

use crate::domain::products::{
    cache::CacheError,
    data::ProductField,
    events::OperationId,
    store::{StoreError, UniqueField},
};

pub(crate) const SKU_EXISTS_MESSAGE: &str = "SKU already exists.";
pub(crate) const NAME_BRAND_EXISTS_MESSAGE: &str =
    "A product with the same Name and Brand already exists.";

/// What kind of rule a validation error came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    /// The request itself is malformed or breaks a business rule.
    Invalid,
    /// The request collides with an existing product.
    Conflict,
    /// The daily creation limit has been reached.
    RateLimited,
}

/// A single field-addressed rejection reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationError {
    pub field: ProductField,
    pub message: String,
    pub kind: ViolationKind,
}

impl ValidationError {
    pub fn invalid(field: ProductField, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
            kind: ViolationKind::Invalid,
        }
    }

    pub fn conflict(field: ProductField, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
            kind: ViolationKind::Conflict,
        }
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self {
            field: ProductField::Product,
            message: message.into(),
            kind: ViolationKind::RateLimited,
        }
    }

    /// The conflict a uniqueness probe reports for `field`.
    ///
    /// Commit-time constraint violations are translated through here so callers
    /// see the same error however the collision was detected.
    #[must_use]
    pub fn already_exists(field: UniqueField) -> Self {
        match field {
            UniqueField::Sku => Self::conflict(ProductField::Sku, SKU_EXISTS_MESSAGE),
            UniqueField::NameAndBrand => {
                Self::conflict(ProductField::Name, NAME_BRAND_EXISTS_MESSAGE)
            }
        }
    }
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Ordered list of every rule a request failed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(Vec<ValidationError>);

impl ValidationErrors {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, error: ValidationError) {
        self.0.push(error);
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ValidationError> {
        self.0.iter()
    }

    /// Errors addressed to `field`.
    pub fn for_field(&self, field: ProductField) -> impl Iterator<Item = &ValidationError> {
        self.0.iter().filter(move |error| error.field == field)
    }

    #[must_use]
    pub fn is_conflict(&self) -> bool {
        self.0
            .iter()
            .any(|error| error.kind == ViolationKind::Conflict)
    }

    #[must_use]
    pub fn is_rate_limited(&self) -> bool {
        self.0
            .iter()
            .any(|error| error.kind == ViolationKind::RateLimited)
    }
}

impl From<ValidationError> for ValidationErrors {
    fn from(error: ValidationError) -> Self {
        Self(vec![error])
    }
}

impl FromIterator<ValidationError> for ValidationErrors {
    fn from_iter<I: IntoIterator<Item = ValidationError>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for ValidationErrors {
    type Item = ValidationError;
    type IntoIter = std::vec::IntoIter<ValidationError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl Display for ValidationErrors {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        for (position, error) in self.0.iter().enumerate() {
            if position > 0 {
                f.write_str("; ")?;
            }

            Display::fmt(error, f)?;
        }

        Ok(())
    }
}

/// A collaborator could not do its job.
#[derive(Debug, Error)]
pub enum InfrastructureError {
    #[error("product store failure")]
    Store(#[source] StoreError),

    #[error("view cache failure")]
    Cache(#[from] CacheError),
}

impl From<StoreError> for InfrastructureError {
    fn from(error: StoreError) -> Self {
        Self::Store(error)
    }
}

#[derive(Debug, Error)]
pub enum ProductsServiceError {
    /// Validation, conflict or rate-limit rejection. Nothing was written.
    #[error("product rejected: {0}")]
    Rejected(ValidationErrors),

    /// A store or cache fault. The message carries only the operation id.
    #[error("internal failure (operation {operation})")]
    Infrastructure {
        operation: OperationId,
        #[source]
        source: InfrastructureError,
    },
}

impl ProductsServiceError {
    /// Validation errors of a rejected request.
    #[must_use]
    pub fn errors(&self) -> Option<&ValidationErrors> {
        match self {
            Self::Rejected(errors) => Some(errors),
            Self::Infrastructure { .. } => None,
        }
    }

    #[must_use]
    pub fn is_conflict(&self) -> bool {
        self.errors().is_some_and(ValidationErrors::is_conflict)
    }

    #[must_use]
    pub fn is_rate_limited(&self) -> bool {
        self.errors().is_some_and(ValidationErrors::is_rate_limited)
    }

    /// Correlation id of a failed operation, when the failure was not a rejection.
    #[must_use]
    pub fn operation(&self) -> Option<OperationId> {
        match self {
            Self::Infrastructure { operation, .. } => Some(*operation),
            Self::Rejected(_) => None,
        }
    }
}
