//! Products
//!
//! Product ingestion: validation, transformation, persistence and the view
//! cache, composed by [`ProductPipeline`].

pub mod cache;
pub mod context;
pub mod data;
pub mod errors;
pub mod events;
pub mod inventory;
pub mod records;
pub mod service;
pub mod store;
pub mod transform;
pub mod validation;
pub mod views;

pub use errors::ProductsServiceError;
pub use service::*;
