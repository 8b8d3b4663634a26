//! Product catalog ingestion pipeline and its runtime wiring.

pub mod clock;
pub mod config;
pub mod context;
pub mod database;
pub mod domain;
pub mod observability;

#[cfg(test)]
mod test;

mod uuids;

pub use uuids::TypedUuid;
