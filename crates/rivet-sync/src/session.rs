//! Per-invocation sync state
//!
//! A [`Session`] is created at the start of a command and dropped at the
//! end; nothing in it is persisted.

use std::path::PathBuf;
use std::sync::Arc;

use rivet_core::config::TransferConfig;
use rivet_core::domain::{RemoteId, SharedGraph};
use rivet_core::ports::IRemoteStore;

/// Everything the pipeline phases share during one run
#[derive(Clone)]
pub struct Session {
    /// Remote store (base URL and resolved token live inside it)
    pub store: Arc<dyn IRemoteStore>,
    pub transfer: TransferConfig,
    /// Local directory being mirrored (upload) or written (download)
    pub local_root: PathBuf,
    /// Remote destination (upload) or source (download) folder
    pub remote_root: RemoteId,
    pub graph: SharedGraph,
}

impl Session {
    pub fn new(
        store: Arc<dyn IRemoteStore>,
        transfer: TransferConfig,
        local_root: PathBuf,
        remote_root: RemoteId,
    ) -> Self {
        Self {
            store,
            transfer,
            local_root,
            remote_root,
            graph: SharedGraph::default(),
        }
    }

    /// Worker count for every pool in this run
    pub fn workers(&self) -> usize {
        self.transfer.workers.max(1)
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("local_root", &self.local_root)
            .field("remote_root", &self.remote_root)
            .field("workers", &self.transfer.workers)
            .finish_non_exhaustive()
    }
}
