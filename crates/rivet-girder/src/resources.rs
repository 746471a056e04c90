//! Folder, item, and file endpoints
//!
//! Thin typed wrappers over the Girder resource routes. Creation always
//! passes `reuseExisting=true`, so creating a name that already exists under
//! the same parent returns the existing object instead of failing.

use std::path::Path;

use reqwest::Method;
use rivet_core::domain::newtypes::RemoteId;
use rivet_core::ports::{RemoteFile, RemoteObject};
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::client::GirderClient;
use crate::GirderError;

/// Fetches a folder by id
pub async fn get_folder(client: &GirderClient, id: &RemoteId) -> Result<RemoteObject, GirderError> {
    client.get_json(&format!("folder/{id}"), &[]).await
}

/// Creates (or reuses) a sub-folder of a folder
///
/// `POST folder?parentType=folder&reuseExisting=true&name=<name>&parentId=<parent>`
pub async fn create_folder(
    client: &GirderClient,
    parent: &RemoteId,
    name: &str,
) -> Result<RemoteObject, GirderError> {
    debug!(parent = %parent, name, "create folder");
    client
        .post_json(
            "folder",
            &[
                ("parentType", "folder"),
                ("reuseExisting", "true"),
                ("name", name),
                ("parentId", parent.as_str()),
            ],
        )
        .await
}

/// Creates (or reuses) an item in a folder
///
/// `POST item?folderId=<folder>&name=<name>&reuseExisting=true`
pub async fn create_item(
    client: &GirderClient,
    folder: &RemoteId,
    name: &str,
) -> Result<RemoteObject, GirderError> {
    debug!(folder = %folder, name, "create item");
    client
        .post_json(
            "item",
            &[
                ("folderId", folder.as_str()),
                ("name", name),
                ("reuseExisting", "true"),
            ],
        )
        .await
}

/// Lists the files stored in an item
pub async fn item_files(client: &GirderClient, item: &RemoteId) -> Result<Vec<RemoteFile>, GirderError> {
    client.get_json(&format!("item/{item}/files"), &[]).await
}

/// Lists one page of sub-folders
pub async fn list_folders(
    client: &GirderClient,
    parent: &RemoteId,
    offset: u64,
    limit: u32,
) -> Result<Vec<RemoteObject>, GirderError> {
    let offset = offset.to_string();
    let limit = limit.to_string();
    client
        .get_json(
            "folder",
            &[
                ("parentType", "folder"),
                ("parentId", parent.as_str()),
                ("offset", &offset),
                ("limit", &limit),
            ],
        )
        .await
}

/// Lists one page of items in a folder
pub async fn list_items(
    client: &GirderClient,
    folder: &RemoteId,
    offset: u64,
    limit: u32,
) -> Result<Vec<RemoteObject>, GirderError> {
    let offset = offset.to_string();
    let limit = limit.to_string();
    client
        .get_json(
            "item",
            &[
                ("folderId", folder.as_str()),
                ("offset", &offset),
                ("limit", &limit),
            ],
        )
        .await
}

/// Streams the blob of an item into `dest`, returning the byte count
///
/// `dest` is created or truncated. The caller is responsible for placing
/// the result at its final path.
pub async fn download_item(
    client: &GirderClient,
    item: &RemoteId,
    dest: &Path,
) -> Result<u64, GirderError> {
    let io_error = |source: std::io::Error| GirderError::Io {
        path: dest.to_path_buf(),
        source,
    };

    let mut response = client
        .send(Method::GET, &format!("item/{item}/download"), &[])
        .await?;
    let mut file = tokio::fs::File::create(dest).await.map_err(io_error)?;

    let mut written = 0u64;
    while let Some(chunk) = response.chunk().await? {
        file.write_all(&chunk).await.map_err(io_error)?;
        written += chunk.len() as u64;
    }
    file.flush().await.map_err(io_error)?;

    debug!(item = %item, bytes = written, "downloaded item");
    Ok(written)
}
