//! Domain error types
//!
//! [`SyncError`] is the taxonomy surfaced to callers of the engine: the
//! setup-time variants abort a run before any worker pool starts, while
//! per-resource failures are contained as skip reasons on the graph.
//! [`DomainError`] covers validation of domain values.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that abort (or summarize) a sync invocation
#[derive(Debug, Error)]
pub enum SyncError {
    /// The remote could not be reached (probe, DNS, timeout)
    #[error("Connectivity error: {0}")]
    Connectivity(String),

    /// Malformed credential, failed token exchange, or anonymous identity
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Remote is too old or its version could not be determined
    #[error("Version error: {0}")]
    Version(String),

    /// Missing or unreadable local root, or a local directory could not be created
    #[error("Local I/O error at {path}: {source}")]
    LocalIo {
        /// The local path involved
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Transfer settings the engine cannot run with
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Non-2xx response (with message) from the remote
    #[error("Remote error: {0}")]
    RemoteObject(String),

    /// Some resources failed; the run itself completed
    #[error("{failed} resource(s) failed to sync")]
    PartialSync {
        /// Number of resources that ended skipped
        failed: usize,
    },
}

impl SyncError {
    /// Convenience constructor for [`SyncError::LocalIo`]
    pub fn local_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::LocalIo {
            path: path.into(),
            source,
        }
    }
}

/// Errors that can occur in domain operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Invalid relative path
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// Invalid remote ID format
    #[error("Invalid remote ID: {0}")]
    InvalidRemoteId(String),

    /// The resource already carries a different remote ID
    #[error("Remote ID already assigned for {path}")]
    RemoteIdAlreadyAssigned {
        /// Path of the resource
        path: String,
    },

    /// Generic validation failure
    #[error("Validation failed: {0}")]
    ValidationFailed(String),
}
