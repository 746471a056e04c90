//! Download mirror
//!
//! Walks a remote folder depth-first from the coordinating task. Within each
//! folder the items are listed before the subfolders; every item is queued
//! to the download pool as soon as it is listed, and every subfolder is
//! created locally before it is descended into, so empty folders still
//! appear on disk.
//!
//! An item is only mirrored when it holds exactly one file. Downloads land
//! in a `.rivet-partial` file next to the target and are renamed into place
//! once complete.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rivet_core::domain::{RemoteId, RemoteKind, Resource, ResourcePath, SyncError};
use rivet_core::ports::{IRemoteStore, RemoteObject};
use tracing::{debug, error, info, warn};

use crate::pool::{WorkQueue, WorkerPool};
use crate::session::Session;

/// Suffix of the temporary file a download is written to
pub const PARTIAL_SUFFIX: &str = ".rivet-partial";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Listing {
    Items,
    Folders,
}

/// Fetch every page of items or subfolders of `folder`
async fn list_all(
    store: &dyn IRemoteStore,
    folder: &RemoteId,
    listing: Listing,
    page_size: u32,
) -> Result<Vec<RemoteObject>> {
    let page_size = page_size.max(1);
    let mut all = Vec::new();
    let mut offset = 0u64;
    loop {
        let page = match listing {
            Listing::Items => store.list_items(folder, offset, page_size).await?,
            Listing::Folders => store.list_folders(folder, offset, page_size).await?,
        };
        if page.is_empty() {
            break;
        }
        debug!(folder = %folder, ?listing, offset, count = page.len(), "listed page");
        offset += page_size as u64;
        all.extend(page);
    }
    Ok(all)
}

struct DownloadJob {
    path: ResourcePath,
    item: RemoteId,
}

/// Mirror the remote folder `session.remote_root` into `session.local_root`
///
/// # Errors
/// Returns [`SyncError::RemoteObject`] if the source folder itself cannot be
/// listed. Failures further down are recorded on the graph.
pub async fn download_tree(session: &Session) -> Result<(), SyncError> {
    let page_size = session.transfer.page_size;
    let store = session.store.as_ref();

    let queue = WorkQueue::new(session.workers() * 4);
    let worker_session = session.clone();
    let pool = WorkerPool::spawn("download", &queue, session.workers(), move |job: DownloadJob| {
        let session = worker_session.clone();
        async move { download_item(&session, job).await }
    });

    let mut stack: Vec<(RemoteId, Option<ResourcePath>)> =
        vec![(session.remote_root.clone(), None)];
    let mut fatal = None;

    while let Some((folder, dir)) = stack.pop() {
        let listed = async {
            let items = list_all(store, &folder, Listing::Items, page_size).await?;
            let folders = list_all(store, &folder, Listing::Folders, page_size).await?;
            anyhow::Ok((items, folders))
        }
        .await;
        let (items, folders) = match listed {
            Ok(listed) => listed,
            Err(e) => {
                let reason = format!("{e:#}");
                match &dir {
                    None => {
                        fatal = Some(SyncError::RemoteObject(reason));
                        break;
                    }
                    Some(dir) => {
                        error!(path = %dir, "failed to list folder: {reason}");
                        session.graph.update(dir, |node| node.mark_skipped(reason));
                        continue;
                    }
                }
            }
        };

        for item in items {
            let Some(path) = child_path(dir.as_ref(), &item.name) else {
                warn!(folder = %folder, name = %item.name, "skipping item with unusable name");
                continue;
            };
            session.graph.write(|g| {
                let mut resource = Resource::file(path.clone(), 0);
                // A fresh node cannot already hold an id
                let _ = resource.assign_remote(item.id.clone(), RemoteKind::Item);
                g.insert(resource);
            });
            if queue
                .push(DownloadJob {
                    path,
                    item: item.id,
                })
                .await
                .is_err()
            {
                error!("download queue closed while listing");
                break;
            }
        }

        // Pushed in reverse so the first folder is visited first
        let mut subfolders = Vec::with_capacity(folders.len());
        for sub in folders {
            let Some(path) = child_path(dir.as_ref(), &sub.name) else {
                warn!(folder = %folder, name = %sub.name, "skipping folder with unusable name");
                continue;
            };
            session.graph.write(|g| {
                let mut resource = Resource::directory(path.clone());
                let _ = resource.assign_remote(sub.id.clone(), RemoteKind::Folder);
                g.insert(resource);
            });

            let local = path.to_local(&session.local_root);
            if let Err(e) = tokio::fs::create_dir_all(&local).await {
                let reason = format!("failed to create {}: {e}", local.display());
                error!(path = %path, "{reason}");
                session.graph.write(|g| g.skip_cascade(&path, &reason));
                continue;
            }
            subfolders.push((sub.id, Some(path)));
        }
        stack.extend(subfolders.into_iter().rev());
    }

    pool.join().await;
    match fatal {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

fn child_path(dir: Option<&ResourcePath>, name: &str) -> Option<ResourcePath> {
    match dir {
        Some(dir) => dir.join(name).ok(),
        None => ResourcePath::new(name.to_string()).ok(),
    }
}

async fn download_item(session: &Session, job: DownloadJob) {
    match fetch_item(session, &job).await {
        Ok(Fetched::Unsupported(files)) => {
            warn!(
                path = %job.path,
                files,
                "item does not hold exactly one file, leaving it untouched"
            );
            session.graph.update(&job.path, |node| node.mark_unsupported());
        }
        Ok(Fetched::Present) => {}
        Ok(Fetched::Downloaded) => {
            session.graph.update(&job.path, |node| node.mark_transferred());
        }
        Err(e) => {
            error!(path = %job.path, "failed to download: {e:#}");
            let reason = format!("{e:#}");
            session.graph.update(&job.path, |node| node.mark_skipped(reason));
        }
    }
}

enum Fetched {
    Unsupported(usize),
    Present,
    Downloaded,
}

async fn fetch_item(session: &Session, job: &DownloadJob) -> Result<Fetched> {
    let files = session.store.item_files(&job.item).await?;
    let [file] = files.as_slice() else {
        return Ok(Fetched::Unsupported(files.len()));
    };
    session.graph.update(&job.path, |node| node.set_size(file.size));

    let target = job.path.to_local(&session.local_root);
    if let Some(parent) = target.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }

    if let Ok(metadata) = tokio::fs::metadata(&target).await {
        if metadata.is_file() && metadata.len() == file.size {
            debug!(path = %job.path, size = file.size, "local file already has remote size");
            return Ok(Fetched::Present);
        }
    }

    info!(path = %job.path, size = file.size, "downloading");
    let partial = partial_path(&target);
    let written = match session.store.download_item(&job.item, &partial).await {
        Ok(written) => written,
        Err(e) => {
            remove_partial(&partial).await;
            return Err(e);
        }
    };
    if let Err(e) = tokio::fs::rename(&partial, &target).await {
        remove_partial(&partial).await;
        return Err(e).with_context(|| format!("failed to move download into {}", target.display()));
    }
    debug!(path = %job.path, written, "download complete");
    Ok(Fetched::Downloaded)
}

/// `<target>.rivet-partial`
pub fn partial_path(target: &Path) -> PathBuf {
    let mut name = target.as_os_str().to_os_string();
    name.push(PARTIAL_SUFFIX);
    PathBuf::from(name)
}

async fn remove_partial(partial: &Path) {
    if let Err(e) = tokio::fs::remove_file(partial).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!(path = %partial.display(), error = %e, "failed to remove partial download");
        }
    }
}
