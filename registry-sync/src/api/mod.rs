//! Registry Web API
//!
//! Token acquisition, the authenticated HTTP client, search query building and
//! the idempotent gateway operations the reconciliation engine relies on.

pub mod auth;
pub mod client;
pub mod gateway;
pub mod models;
pub mod operations;
pub mod query;

#[cfg(test)]
pub mod testing;

pub use auth::Credentials;
pub use client::{ClientConfig, RegistryBackend, RegistryClient};
pub use gateway::{Gateway, Lookup};
pub use models::{AttributeValue, AttributeWrite, RegistryObject, SearchResponse};
pub use operations::{Operation, OperationResult};
pub use query::{Condition, SearchQuery};
