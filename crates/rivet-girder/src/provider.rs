//! GirderRemoteStore - IRemoteStore implementation for Girder
//!
//! Wraps the [`GirderClient`] and delegates to the resources and upload
//! modules to fulfil the [`IRemoteStore`] port contract.
//!
//! ## Design Notes
//!
//! - The client must already carry a resolved token; credential resolution
//!   needs `&mut GirderClient` and happens before the store is built.
//! - Errors are converted without added context so that the top-level
//!   message of a [`crate::GirderError::Remote`] stays the server's message.

use std::path::Path;

use anyhow::Result;
use rivet_core::domain::newtypes::RemoteId;
use rivet_core::ports::{IRemoteStore, RemoteFile, RemoteObject, UploadSession};

use crate::client::GirderClient;
use crate::{resources, upload};

/// Girder-backed remote store
#[derive(Debug, Clone)]
pub struct GirderRemoteStore {
    client: GirderClient,
}

impl GirderRemoteStore {
    pub fn new(client: GirderClient) -> Self {
        Self { client }
    }

    /// Returns the underlying client
    pub fn client(&self) -> &GirderClient {
        &self.client
    }
}

#[async_trait::async_trait]
impl IRemoteStore for GirderRemoteStore {
    async fn get_folder(&self, id: &RemoteId) -> Result<RemoteObject> {
        Ok(resources::get_folder(&self.client, id).await?)
    }

    async fn create_folder(&self, parent: &RemoteId, name: &str) -> Result<RemoteObject> {
        Ok(resources::create_folder(&self.client, parent, name).await?)
    }

    async fn create_item(&self, folder: &RemoteId, name: &str) -> Result<RemoteObject> {
        Ok(resources::create_item(&self.client, folder, name).await?)
    }

    async fn item_files(&self, item: &RemoteId) -> Result<Vec<RemoteFile>> {
        Ok(resources::item_files(&self.client, item).await?)
    }

    async fn list_folders(
        &self,
        parent: &RemoteId,
        offset: u64,
        limit: u32,
    ) -> Result<Vec<RemoteObject>> {
        Ok(resources::list_folders(&self.client, parent, offset, limit).await?)
    }

    async fn list_items(
        &self,
        folder: &RemoteId,
        offset: u64,
        limit: u32,
    ) -> Result<Vec<RemoteObject>> {
        Ok(resources::list_items(&self.client, folder, offset, limit).await?)
    }

    async fn create_upload(&self, item: &RemoteId, name: &str, size: u64) -> Result<UploadSession> {
        Ok(upload::create_upload(&self.client, item, name, size).await?)
    }

    async fn replace_contents(&self, file: &RemoteId, size: u64) -> Result<UploadSession> {
        Ok(upload::replace_contents(&self.client, file, size).await?)
    }

    async fn upload_chunk(&self, upload: &RemoteId, offset: u64, data: Vec<u8>) -> Result<()> {
        Ok(upload::upload_chunk(&self.client, upload, offset, data).await?)
    }

    async fn download_item(&self, item: &RemoteId, dest: &Path) -> Result<u64> {
        Ok(resources::download_item(&self.client, item, dest).await?)
    }
}
