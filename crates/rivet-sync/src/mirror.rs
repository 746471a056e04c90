//! Remote mirror builder
//!
//! Recreates the local directory structure under the remote destination.
//! Root directories are seeded with the destination as their parent; every
//! successfully created folder then enqueues its child directories with the
//! new folder id as their parent, so a child is never dispatched before its
//! parent exists remotely.
//!
//! A folder that cannot be created is skipped together with its whole
//! subtree, files included, and none of its children are ever queued.

use rivet_core::domain::{RemoteKind, ResourceKind, ResourcePath};
use tracing::{error, info, warn};

use crate::pool::{WorkQueue, WorkerPool};
use crate::session::Session;

/// Create (or reuse) a remote folder for every local directory
pub async fn build_mirror(session: &Session) {
    let (roots, total) = session.graph.write(|g| {
        let roots = g.roots(ResourceKind::Directory);
        for root in &roots {
            if let Some(node) = g.get_mut(root) {
                node.set_remote_parent_id(session.remote_root.clone());
            }
        }
        (roots, g.count(ResourceKind::Directory))
    });

    if total == 0 {
        info!("no directories to mirror");
        return;
    }
    info!(directories = total, "mirroring directory structure");

    // Every directory is enqueued at most once, so pushes never block
    let queue = WorkQueue::new(total);
    let worker_queue = queue.clone();
    let worker_session = session.clone();
    let pool = WorkerPool::spawn("mirror", &queue, session.workers(), move |path: ResourcePath| {
        let session = worker_session.clone();
        let queue = worker_queue.clone();
        async move { mirror_directory(&session, &queue, path).await }
    });

    for root in roots {
        if queue.push(root).await.is_err() {
            error!("mirror queue closed while seeding");
            break;
        }
    }
    pool.join().await;
}

async fn mirror_directory(session: &Session, queue: &WorkQueue<ResourcePath>, path: ResourcePath) {
    let Some(node) = session.graph.resource(&path) else {
        return;
    };
    if node.is_skipped() {
        return;
    }
    let Some(parent_id) = node.remote_parent_id().cloned() else {
        fail(session, &path, "parent folder id was never assigned");
        return;
    };

    let folder = match session.store.create_folder(&parent_id, path.name()).await {
        Ok(folder) => folder,
        Err(e) => {
            fail(session, &path, &format!("{e:#}"));
            return;
        }
    };

    let children = session.graph.write(|g| {
        let assigned = g
            .get_mut(&path)
            .map(|node| node.assign_remote(folder.id.clone(), RemoteKind::Folder));
        if let Some(Err(e)) = assigned {
            return Err(e.to_string());
        }

        let child_dirs: Vec<ResourcePath> = g
            .get(&path)
            .map(|node| node.children().to_vec())
            .unwrap_or_default()
            .into_iter()
            .filter(|child| g.get(child).is_some_and(|c| c.is_dir() && !c.is_skipped()))
            .collect();
        for child in &child_dirs {
            if let Some(c) = g.get_mut(child) {
                c.set_remote_parent_id(folder.id.clone());
            }
        }
        Ok(child_dirs)
    });

    let children = match children {
        Ok(children) => children,
        Err(reason) => {
            fail(session, &path, &reason);
            return;
        }
    };

    info!(path = %path, id = %folder.id, "folder ready");
    for child in children {
        if queue.push(child).await.is_err() {
            error!(path = %path, "mirror queue closed before children were queued");
            return;
        }
    }
}

/// Skip `path` and everything below it with the same reason
fn fail(session: &Session, path: &ResourcePath, reason: &str) {
    error!(path = %path, reason, "failed to create folder");
    let marked = session.graph.write(|g| g.skip_cascade(path, reason));
    if marked.len() > 1 {
        warn!(
            path = %path,
            descendants = marked.len() - 1,
            "skipping subtree of failed folder"
        );
    }
}
