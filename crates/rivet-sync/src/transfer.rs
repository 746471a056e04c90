//! Chunked blob transfer
//!
//! Decides what an item needs from its current file list, then streams the
//! local file through an upload session in fixed-size chunks. Sizes are the
//! only comparison; contents are never hashed.

use std::cmp::min;
use std::io;
use std::path::Path;

use anyhow::{bail, Context, Result};
use rivet_core::domain::RemoteId;
use rivet_core::ports::IRemoteStore;
use tokio::io::AsyncReadExt;
use tracing::{debug, info};

/// What happened to one item's blob
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlobOutcome {
    /// The item had no file; one was created and filled
    Created { chunks: u64 },
    /// The item's single file had a different size and was replaced
    Replaced { chunks: u64 },
    /// The item's single file already has the local size
    Unchanged,
    /// The item holds more than one file and is left untouched
    Unsupported { files: usize },
}

impl BlobOutcome {
    pub fn transferred(&self) -> bool {
        matches!(self, BlobOutcome::Created { .. } | BlobOutcome::Replaced { .. })
    }
}

/// Bring the blob of `item` in line with the local file at `local`
///
/// # Arguments
/// * `item` - Remote item the file belongs to
/// * `name` - File name used when a new remote file is created
/// * `local` - Absolute local path
/// * `size` - Size recorded when the tree was scanned
/// * `chunk_size` - Bytes per chunk request
pub async fn upload_blob(
    store: &dyn IRemoteStore,
    item: &RemoteId,
    name: &str,
    local: &Path,
    size: u64,
    chunk_size: u64,
) -> Result<BlobOutcome> {
    if chunk_size == 0 {
        bail!("chunk size must be greater than 0");
    }
    let files = store.item_files(item).await?;

    let (session, replaced) = match files.as_slice() {
        [] => (store.create_upload(item, name, size).await?, false),
        [existing] if existing.size == size => {
            debug!(path = %local.display(), size, "remote file already has local size");
            return Ok(BlobOutcome::Unchanged);
        }
        [existing] => (store.replace_contents(&existing.id, size).await?, true),
        many => return Ok(BlobOutcome::Unsupported { files: many.len() }),
    };

    info!(path = %local.display(), size, "uploading");
    let chunks = send_chunks(store, &session.id, local, size, chunk_size).await?;
    Ok(if replaced {
        BlobOutcome::Replaced { chunks }
    } else {
        BlobOutcome::Created { chunks }
    })
}

/// Number of chunk requests needed for `size` bytes
pub fn chunk_count(size: u64, chunk_size: u64) -> u64 {
    if chunk_size == 0 {
        return 0;
    }
    size.div_ceil(chunk_size)
}

/// Send `size` bytes of `local` to an open upload session
///
/// Returns the number of chunks sent. A zero-byte file sends none.
///
/// # Errors
/// Fails if the file cannot be read, is shorter than `size`, or a chunk is
/// rejected
pub async fn send_chunks(
    store: &dyn IRemoteStore,
    upload: &RemoteId,
    local: &Path,
    size: u64,
    chunk_size: u64,
) -> Result<u64> {
    if size == 0 {
        return Ok(0);
    }
    if chunk_size == 0 {
        bail!("chunk size must be greater than 0");
    }

    let mut file = tokio::fs::File::open(local)
        .await
        .with_context(|| format!("failed to open {}", local.display()))?;

    let total = chunk_count(size, chunk_size);
    let mut offset = 0u64;
    let mut sent = 0u64;
    while offset < size {
        let len = min(chunk_size, size - offset) as usize;
        let mut buf = vec![0u8; len];
        match file.read_exact(&mut buf).await {
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                bail!(
                    "{} shrank during upload (expected {size} bytes)",
                    local.display()
                );
            }
            Err(e) => {
                return Err(e).with_context(|| format!("failed to read {}", local.display()));
            }
        }

        store.upload_chunk(upload, offset, buf).await?;
        offset += len as u64;
        sent += 1;
        debug!(path = %local.display(), "chunk {sent}/{total}");
    }

    Ok(sent)
}
