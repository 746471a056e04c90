//! Local tree scanner
//!
//! Builds a [`ResourceGraph`] from one depth-first walk of a local
//! directory. Entries are visited sorted by file name, so a directory is
//! always inserted before anything inside it and children lists come out
//! in a stable order.
//!
//! Symbolic links are never followed or inserted. An entry that cannot be
//! read is logged and left out together with everything below it.

use std::io;
use std::path::Path;

use rivet_core::domain::{Resource, ResourceGraph, ResourceKind, ResourcePath, SyncError};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Result of scanning a local root
#[derive(Debug, Clone)]
pub struct ScanResult {
    pub graph: ResourceGraph,
    pub directories: usize,
    pub files: usize,
}

/// Check that `root` exists, is a directory, and can be listed
///
/// # Errors
/// Returns [`SyncError::LocalIo`] otherwise
pub fn verify_root(root: &Path) -> Result<(), SyncError> {
    let metadata = std::fs::metadata(root).map_err(|e| SyncError::local_io(root, e))?;
    if !metadata.is_dir() {
        return Err(SyncError::local_io(
            root,
            io::Error::new(io::ErrorKind::Other, "not a directory"),
        ));
    }
    std::fs::read_dir(root).map_err(|e| SyncError::local_io(root, e))?;
    Ok(())
}

/// Walk `root` and build the resource graph
///
/// # Errors
/// Returns [`SyncError::LocalIo`] if the walk cannot start
pub fn scan(root: &Path) -> Result<ScanResult, SyncError> {
    verify_root(root)?;

    let mut graph = ResourceGraph::new();
    let mut walker = WalkDir::new(root)
        .min_depth(1)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter();

    while let Some(entry) = walker.next() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                let path = e.path().map(|p| p.display().to_string()).unwrap_or_default();
                warn!(path = %path, error = %e, "skipping unreadable entry");
                continue;
            }
        };

        let file_type = entry.file_type();
        if file_type.is_symlink() {
            warn!(path = %entry.path().display(), "skipping symbolic link");
            continue;
        }

        let is_dir = file_type.is_dir();
        let relative = entry
            .path()
            .strip_prefix(root)
            .map_err(|e| e.to_string())
            .and_then(|rel| ResourcePath::from_relative(rel).map_err(|e| e.to_string()));
        let path = match relative {
            Ok(path) => path,
            Err(reason) => {
                warn!(path = %entry.path().display(), reason = %reason, "skipping entry with unusable path");
                if is_dir {
                    walker.skip_current_dir();
                }
                continue;
            }
        };

        // A parent that was left out takes its subtree with it
        if let Some(parent) = path.parent() {
            if !graph.contains(&parent) {
                debug!(path = %path, "parent not scanned, skipping");
                if is_dir {
                    walker.skip_current_dir();
                }
                continue;
            }
        }

        let resource = if is_dir {
            Resource::directory(path)
        } else if file_type.is_file() {
            match entry.metadata() {
                Ok(metadata) => Resource::file(path, metadata.len()),
                Err(e) => {
                    warn!(path = %path, error = %e, "skipping file without metadata");
                    continue;
                }
            }
        } else {
            debug!(path = %path, "skipping special file");
            continue;
        };
        graph.insert(resource);
    }

    let directories = graph.count(ResourceKind::Directory);
    let files = graph.count(ResourceKind::File);
    info!(
        root = %root.display(),
        directories,
        files,
        "scanned {directories} directories and {files} files"
    );

    Ok(ScanResult {
        graph,
        directories,
        files,
    })
}
