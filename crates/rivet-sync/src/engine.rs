//! Directory mirror engine
//!
//! The [`SyncEngine`] runs one mirror in either direction between a local
//! directory and a Girder folder.
//!
//! ## Upload Flow
//!
//! 1. **Preconditions**: the local root must be a readable directory and the
//!    destination folder must exist. Either failing aborts the run.
//! 2. **Scan**: walk the local tree into a resource graph
//! 3. **Mirror**: create (or reuse) a remote folder per local directory
//! 4. **Items**: create (or reuse) a remote item per local file
//! 5. **Blobs**: upload file contents that differ in size
//! 6. **Report**: partition the graph into a [`Summary`]
//!
//! ## Download Flow
//!
//! 1. **Preconditions**: the source folder must exist, then the local root is
//!    created if missing
//! 2. **Mirror**: list the remote tree and download every single-file item
//! 3. **Report**
//!
//! Per-resource failures never abort a run; they end up in the summary.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use rivet_core::config::TransferConfig;
use rivet_core::domain::{RemoteId, SharedGraph, Summary, SyncError};
use rivet_core::ports::IRemoteStore;
use tracing::info;

use crate::download::download_tree;
use crate::mirror::build_mirror;
use crate::pipeline::{create_items, upload_blobs};
use crate::scanner::{scan, verify_root};
use crate::session::Session;

/// Which way content flows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Local directory to remote folder
    Upload,
    /// Remote folder to local directory
    Download,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Upload => write!(f, "upload"),
            Direction::Download => write!(f, "download"),
        }
    }
}

/// Runs mirrors against one remote store
pub struct SyncEngine {
    store: Arc<dyn IRemoteStore>,
    config: TransferConfig,
}

impl SyncEngine {
    /// Creates a new `SyncEngine`
    ///
    /// # Arguments
    /// * `store` - Remote store, already authenticated
    /// * `config` - Chunk size, worker count, and page size for every run
    ///
    /// # Errors
    /// Returns [`SyncError::Config`] listing every invalid transfer setting
    pub fn new(store: Arc<dyn IRemoteStore>, config: TransferConfig) -> Result<Self, SyncError> {
        let errors = config.validate();
        if !errors.is_empty() {
            let joined: Vec<String> = errors.iter().map(ToString::to_string).collect();
            return Err(SyncError::Config(joined.join("; ")));
        }
        Ok(Self { store, config })
    }

    /// Run one mirror in `direction`
    pub async fn sync(
        &self,
        direction: Direction,
        local_root: &Path,
        remote_root: &RemoteId,
    ) -> Result<Summary, SyncError> {
        match direction {
            Direction::Upload => self.upload(local_root, remote_root).await,
            Direction::Download => self.download(remote_root, local_root).await,
        }
    }

    /// Mirror `local_root` into the remote folder `destination`
    ///
    /// # Errors
    /// - [`SyncError::LocalIo`] if `local_root` is missing or unreadable
    /// - [`SyncError::RemoteObject`] if `destination` cannot be fetched
    pub async fn upload(
        &self,
        local_root: &Path,
        destination: &RemoteId,
    ) -> Result<Summary, SyncError> {
        let start = Instant::now();
        verify_root(local_root)?;
        self.verify_folder(destination).await?;

        info!(
            local = %local_root.display(),
            destination = %destination,
            "starting upload"
        );
        let scanned = scan(local_root)?;

        let mut session = self.session(local_root.to_path_buf(), destination.clone());
        session.graph = SharedGraph::new(scanned.graph);

        info!("phase: folders");
        build_mirror(&session).await;
        info!("phase: items");
        create_items(&session).await;
        info!("phase: blobs");
        upload_blobs(&session).await;

        Ok(self.report(session, start))
    }

    /// Mirror the remote folder `source` into `local_root`
    ///
    /// The source is checked before anything is created locally.
    ///
    /// # Errors
    /// - [`SyncError::RemoteObject`] if `source` cannot be fetched or listed
    /// - [`SyncError::LocalIo`] if `local_root` cannot be created
    pub async fn download(
        &self,
        source: &RemoteId,
        local_root: &Path,
    ) -> Result<Summary, SyncError> {
        let start = Instant::now();
        self.verify_folder(source).await?;
        tokio::fs::create_dir_all(local_root)
            .await
            .map_err(|e| SyncError::local_io(local_root, e))?;
        verify_root(local_root)?;

        info!(
            source = %source,
            local = %local_root.display(),
            "starting download"
        );
        let session = self.session(local_root.to_path_buf(), source.clone());
        download_tree(&session).await?;

        Ok(self.report(session, start))
    }

    async fn verify_folder(&self, id: &RemoteId) -> Result<(), SyncError> {
        self.store
            .get_folder(id)
            .await
            .map(|_| ())
            .map_err(|e| SyncError::RemoteObject(format!("folder {id}: {e:#}")))
    }

    fn session(&self, local_root: PathBuf, remote_root: RemoteId) -> Session {
        Session::new(
            Arc::clone(&self.store),
            self.config.clone(),
            local_root,
            remote_root,
        )
    }

    fn report(&self, session: Session, start: Instant) -> Summary {
        let summary = session.graph.read(Summary::from_graph);
        info!(elapsed_ms = start.elapsed().as_millis() as u64, "run finished");
        summary.log();
        summary
    }
}
