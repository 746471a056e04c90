//! Sync command - Mirror a local directory into a Girder folder
//!
//! `rivet sync <source-dir> girder://<folder-id>` creates (or reuses) one
//! remote folder per local directory and one item per file, then uploads
//! every file whose remote size differs.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use rivet_sync::Direction;

use super::{parse_girder_uri, run_mirror, Context};

#[derive(Debug, Args)]
pub struct SyncCommand {
    /// Local directory to upload
    pub source: PathBuf,

    /// Destination folder, as girder://<folder-id>
    pub destination: String,
}

impl SyncCommand {
    pub async fn execute(&self, ctx: &Context) -> Result<()> {
        let destination = parse_girder_uri(&self.destination)?;
        run_mirror(ctx, Direction::Upload, self.source.clone(), destination).await
    }
}
