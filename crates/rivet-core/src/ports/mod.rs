//! Port definitions (hexagonal architecture interfaces)
//!
//! The sync engine depends only on these traits; the Girder REST adapter
//! lives in `rivet-girder`, and tests provide in-memory fakes.
//!
//! ## Ports Overview
//!
//! - [`IRemoteStore`] - Remote folder/item/file operations

pub mod remote_store;

pub use remote_store::{IRemoteStore, RemoteFile, RemoteObject, UploadSession};
