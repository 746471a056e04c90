//! End-of-run summary
//!
//! Partitions a finished [`ResourceGraph`] into succeeded, failed (skipped),
//! and unsupported resources. Failures are sorted by path, then by reason,
//! so the report is identical across runs regardless of worker interleaving.

use serde::Serialize;
use tracing::{info, warn};

use super::resource::{ResourceGraph, ResourceKind};

/// A resource that ended the run skipped
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct Failure {
    pub path: String,
    pub reason: String,
}

/// Per-run outcome
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    /// Number of directories in the graph
    pub directories: usize,
    /// Number of files in the graph
    pub files: usize,
    /// Resources that were mirrored (or already matched)
    pub succeeded: usize,
    /// Resources that ended skipped
    pub failed: usize,
    /// Resources left untouched because of an unsupported remote shape
    pub unsupported: usize,
    /// Files whose content was actually moved
    pub transferred: usize,
    /// Skipped resources with their reasons, sorted
    pub failures: Vec<Failure>,
}

impl Summary {
    /// Build the summary of a finished graph
    pub fn from_graph(graph: &ResourceGraph) -> Self {
        let mut summary = Summary {
            directories: graph.count(ResourceKind::Directory),
            files: graph.count(ResourceKind::File),
            ..Summary::default()
        };

        for resource in graph.iter() {
            if let Some(reason) = resource.skip_reason() {
                summary.failures.push(Failure {
                    path: resource.path().to_string(),
                    reason: reason.to_string(),
                });
            } else if resource.is_unsupported() {
                summary.unsupported += 1;
            } else {
                summary.succeeded += 1;
            }
            if resource.is_transferred() {
                summary.transferred += 1;
            }
        }

        summary.failures.sort();
        summary.failed = summary.failures.len();
        summary
    }

    /// Whether every resource either succeeded or was left untouched
    pub fn is_clean(&self) -> bool {
        self.failed == 0
    }

    /// Emit the summary through `tracing`
    pub fn log(&self) {
        info!(
            directories = self.directories,
            files = self.files,
            transferred = self.transferred,
            "successfully synced {} files/folders",
            self.succeeded
        );
        if self.unsupported > 0 {
            info!(
                "left {} item(s) untouched (unsupported remote shape)",
                self.unsupported
            );
        }
        if self.failed > 0 {
            warn!("failed to sync {} files/folders:", self.failed);
            for failure in &self.failures {
                warn!("{}: {}", failure.path, failure.reason);
            }
        }
    }
}
