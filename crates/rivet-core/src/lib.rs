//! Rivet Core - Domain model and port definitions
//!
//! This crate contains everything the sync engine reasons about without
//! touching the network:
//! - **Domain entities** - `Resource`, `ResourceGraph`, `Summary`
//! - **Newtypes** - `RemoteId`, `ResourcePath`
//! - **Error taxonomy** - `SyncError` for fatal setup failures, `DomainError`
//!   for validation failures
//! - **Port definitions** - [`ports::IRemoteStore`], implemented by the Girder adapter
//! - **Configuration** - the transfer tuning value object and the YAML profile file

pub mod config;
pub mod domain;
pub mod ports;
