//! Remote store port (driven/secondary port)
//!
//! This module defines the interface the sync engine uses to talk to the
//! remote folder hierarchy. The production implementation is the Girder
//! REST adapter; tests drive the engine with in-memory fakes.
//!
//! ## Design Notes
//!
//! - Uses `anyhow::Result` because errors at port boundaries are adapter-specific.
//!   The `Display` of the top-level error is what ends up as a skip reason, so
//!   adapters surface the remote `message` there.
//! - Folder and item creation are idempotent: creating the same name under the
//!   same parent twice returns the same object.
//! - Uses `#[async_trait]` for async trait methods.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::domain::newtypes::RemoteId;

// ============================================================================
// Port-level DTOs
// ============================================================================

/// A remote folder or item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteObject {
    /// Remote identifier
    #[serde(rename = "_id")]
    pub id: RemoteId,
    /// Display name
    #[serde(default)]
    pub name: String,
}

/// A blob stored inside an item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteFile {
    /// Remote file identifier
    #[serde(rename = "_id")]
    pub id: RemoteId,
    /// Size in bytes
    #[serde(default)]
    pub size: u64,
}

/// An upload session that accepts chunks at explicit offsets
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadSession {
    /// Upload identifier passed back with every chunk
    #[serde(rename = "_id")]
    pub id: RemoteId,
}

// ============================================================================
// IRemoteStore trait
// ============================================================================

/// Port trait for remote folder/item/file operations
///
/// ## Implementation Notes
///
/// - Implementations should retry transient transport failures internally;
///   any error returned here is treated as final for the affected resource.
/// - All methods assume the credential was resolved before the store was built.
#[async_trait::async_trait]
pub trait IRemoteStore: Send + Sync {
    /// Fetches a folder by id (used to validate sync roots)
    async fn get_folder(&self, id: &RemoteId) -> anyhow::Result<RemoteObject>;

    /// Creates a folder named `name` under `parent`, or returns the existing one
    async fn create_folder(&self, parent: &RemoteId, name: &str) -> anyhow::Result<RemoteObject>;

    /// Creates an item named `name` under folder `folder`, or returns the existing one
    async fn create_item(&self, folder: &RemoteId, name: &str) -> anyhow::Result<RemoteObject>;

    /// Lists the files stored in an item
    async fn item_files(&self, item: &RemoteId) -> anyhow::Result<Vec<RemoteFile>>;

    /// Lists one page of sub-folders of `parent`
    async fn list_folders(
        &self,
        parent: &RemoteId,
        offset: u64,
        limit: u32,
    ) -> anyhow::Result<Vec<RemoteObject>>;

    /// Lists one page of items in `folder`
    async fn list_items(
        &self,
        folder: &RemoteId,
        offset: u64,
        limit: u32,
    ) -> anyhow::Result<Vec<RemoteObject>>;

    /// Opens an upload session for a new file of `size` bytes inside `item`
    async fn create_upload(
        &self,
        item: &RemoteId,
        name: &str,
        size: u64,
    ) -> anyhow::Result<UploadSession>;

    /// Opens an upload session replacing the contents of `file` with `size` bytes
    async fn replace_contents(&self, file: &RemoteId, size: u64) -> anyhow::Result<UploadSession>;

    /// Sends one chunk of an upload session starting at `offset`
    async fn upload_chunk(
        &self,
        upload: &RemoteId,
        offset: u64,
        data: Vec<u8>,
    ) -> anyhow::Result<()>;

    /// Downloads the blob of `item` into `dest`, returning the byte count
    async fn download_item(&self, item: &RemoteId, dest: &Path) -> anyhow::Result<u64>;
}
