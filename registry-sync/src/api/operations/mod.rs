//! Registry mutations
//!
//! Every write to the registry is expressed as an [`Operation`] and executed
//! one request at a time by a [`RegistryBackend`](crate::api::RegistryBackend).

pub mod operation;

pub use operation::{Operation, OperationResult};
