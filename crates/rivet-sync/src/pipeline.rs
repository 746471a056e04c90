//! Item and blob pipeline
//!
//! Runs after the mirror builder, in two phases separated by a full join:
//!
//! 1. **Items**: every file whose parent folder exists gets a remote item
//!    (created or reused) in that folder. Files under a skipped directory
//!    inherit its reason and are never queued.
//! 2. **Blobs**: every file with an item gets its content reconciled by size
//!    through [`transfer::upload_blob`].
//!
//! Failures are recorded as skip reasons on the file's node.

use rivet_core::domain::{RemoteId, RemoteKind, ResourceKind, ResourcePath};
use tracing::{error, info, warn};

use crate::pool::{WorkQueue, WorkerPool};
use crate::session::Session;
use crate::transfer::{self, BlobOutcome};

// ============================================================================
// Phase A: items
// ============================================================================

/// Decide, under one lock, which files can be queued for item creation
fn plan_items(session: &Session) -> Vec<ResourcePath> {
    session.graph.write(|g| {
        let mut ready = Vec::new();
        for path in g.paths_of_kind(ResourceKind::File) {
            let Some(node) = g.get(&path) else { continue };
            if node.is_skipped() {
                continue;
            }

            let parent_id: Result<RemoteId, String> = match g.parent(node) {
                None => Ok(session.remote_root.clone()),
                Some(parent) => match (parent.skip_reason(), parent.remote_id()) {
                    (Some(reason), _) => Err(reason.to_string()),
                    (None, Some(id)) => Ok(id.clone()),
                    (None, None) => Err("parent folder was not created".to_string()),
                },
            };

            if let Some(node) = g.get_mut(&path) {
                match parent_id {
                    Ok(id) => {
                        node.set_remote_parent_id(id);
                        ready.push(path);
                    }
                    Err(reason) => {
                        node.mark_skipped(reason);
                    }
                }
            }
        }
        ready
    })
}

/// Create (or reuse) a remote item for every file whose parent exists
pub async fn create_items(session: &Session) {
    let ready = plan_items(session);
    if ready.is_empty() {
        info!("no files to register");
        return;
    }
    info!(files = ready.len(), "creating items");

    let queue = WorkQueue::new(session.workers() * 4);
    let worker_session = session.clone();
    let pool = WorkerPool::spawn("items", &queue, session.workers(), move |path: ResourcePath| {
        let session = worker_session.clone();
        async move { create_item(&session, path).await }
    });

    for path in ready {
        if queue.push(path).await.is_err() {
            error!("item queue closed while dispatching");
            break;
        }
    }
    pool.join().await;
}

async fn create_item(session: &Session, path: ResourcePath) {
    let Some(parent_id) = session
        .graph
        .resource(&path)
        .and_then(|node| node.remote_parent_id().cloned())
    else {
        return;
    };

    match session.store.create_item(&parent_id, path.name()).await {
        Ok(item) => {
            let assigned = session
                .graph
                .update(&path, |node| node.assign_remote(item.id.clone(), RemoteKind::Item));
            if let Some(Err(e)) = assigned {
                skip(session, &path, &e.to_string());
            }
        }
        Err(e) => {
            error!(path = %path, "failed to create item: {e:#}");
            skip(session, &path, &format!("{e:#}"));
        }
    }
}

// ============================================================================
// Phase B: blobs
// ============================================================================

struct BlobJob {
    path: ResourcePath,
    item: RemoteId,
    size: u64,
}

/// Reconcile the content of every file that has an item
pub async fn upload_blobs(session: &Session) {
    let jobs: Vec<BlobJob> = session.graph.read(|g| {
        g.paths_of_kind(ResourceKind::File)
            .into_iter()
            .filter_map(|path| {
                let node = g.get(&path)?;
                if node.is_skipped() {
                    return None;
                }
                let item = node.remote_id()?.clone();
                Some(BlobJob {
                    size: node.size(),
                    path,
                    item,
                })
            })
            .collect()
    });
    if jobs.is_empty() {
        info!("no blobs to upload");
        return;
    }
    info!(files = jobs.len(), "uploading blobs");

    let queue = WorkQueue::new(session.workers() * 4);
    let worker_session = session.clone();
    let pool = WorkerPool::spawn("blobs", &queue, session.workers(), move |job: BlobJob| {
        let session = worker_session.clone();
        async move { upload_blob(&session, job).await }
    });

    for job in jobs {
        if queue.push(job).await.is_err() {
            error!("blob queue closed while dispatching");
            break;
        }
    }
    pool.join().await;
}

async fn upload_blob(session: &Session, job: BlobJob) {
    let local = job.path.to_local(&session.local_root);
    let result = transfer::upload_blob(
        session.store.as_ref(),
        &job.item,
        job.path.name(),
        &local,
        job.size,
        session.transfer.chunk_size,
    )
    .await;

    match result {
        Ok(BlobOutcome::Unsupported { files }) => {
            warn!(
                path = %job.path,
                files,
                "item holds more than one file, leaving it untouched"
            );
            session.graph.update(&job.path, |node| node.mark_unsupported());
        }
        Ok(outcome) => {
            if outcome.transferred() {
                session.graph.update(&job.path, |node| node.mark_transferred());
            }
        }
        Err(e) => {
            error!(path = %job.path, "failed to upload: {e:#}");
            skip(session, &job.path, &format!("{e:#}"));
        }
    }
}

fn skip(session: &Session, path: &ResourcePath, reason: &str) {
    session.graph.update(path, |node| node.mark_skipped(reason));
}
