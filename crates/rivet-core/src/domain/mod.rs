//! Domain entities and business logic
//!
//! - Newtypes for remote identifiers and graph keys
//! - The resource graph built from a local walk (or a remote listing)
//! - The end-of-run summary
//! - Domain-specific error types

pub mod errors;
pub mod newtypes;
pub mod resource;
pub mod summary;

pub use errors::{DomainError, SyncError};
pub use newtypes::{RemoteId, ResourcePath};
pub use resource::{RemoteKind, Resource, ResourceGraph, ResourceKind, SharedGraph};
pub use summary::{Failure, Summary};
