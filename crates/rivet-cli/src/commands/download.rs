//! Download command - Mirror a Girder folder into a local directory
//!
//! `rivet download girder://<folder-id> <dest-dir>` recreates the folder
//! tree locally and downloads every item that holds exactly one file. Local
//! files that already have the remote size are left alone.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use rivet_sync::Direction;

use super::{parse_girder_uri, run_mirror, Context};

#[derive(Debug, Args)]
pub struct DownloadCommand {
    /// Source folder, as girder://<folder-id>
    pub source: String,

    /// Local directory to write into (created if missing)
    pub destination: PathBuf,
}

impl DownloadCommand {
    pub async fn execute(&self, ctx: &Context) -> Result<()> {
        let source = parse_girder_uri(&self.source)?;
        run_mirror(ctx, Direction::Download, self.destination.clone(), source).await
    }
}
