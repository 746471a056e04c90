//! Command implementations and the setup they share
//!
//! Every remote command connects the same way: normalize the server URL,
//! check the server version, then exchange the credential for a token.

pub mod configure;
pub mod download;
pub mod sync;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context as _, Result};
use rivet_core::config::Config;
use rivet_core::domain::{RemoteId, Summary, SyncError};
use rivet_girder::auth::{check_minimum_version, normalize_url, resolve_credential};
use rivet_girder::client::GirderClient;
use rivet_girder::provider::GirderRemoteStore;
use rivet_sync::{Direction, SyncEngine};
use tracing::info;

use crate::output::{get_formatter, OutputFormat};

/// Scheme every remote folder argument must carry
pub const GIRDER_SCHEME: &str = "girder://";

/// Global options resolved once in `main`
#[derive(Debug, Clone)]
pub struct Context {
    pub format: OutputFormat,
    pub config_path: PathBuf,
    pub config: Config,
    /// `--url` / `RIVET_URL`, overriding the saved profile
    pub url: Option<String>,
    /// `--auth` / `RIVET_AUTH`, overriding the saved profile
    pub auth: Option<String>,
}

impl Context {
    fn url(&self) -> Result<&str> {
        self.url
            .as_deref()
            .or(self.config.profile.url.as_deref())
            .context("no server URL; pass --url or run `rivet configure`")
    }

    fn auth(&self) -> Result<&str> {
        self.auth
            .as_deref()
            .or(self.config.profile.auth.as_deref())
            .context("no credential; pass --auth or run `rivet configure`")
    }
}

/// Parse `girder://<folder-id>` into the folder id
pub fn parse_girder_uri(uri: &str) -> Result<RemoteId> {
    let Some(id) = uri.strip_prefix(GIRDER_SCHEME) else {
        bail!("expected {GIRDER_SCHEME}<folder-id>, got {uri:?}");
    };
    let id = id.trim_end_matches('/');
    RemoteId::new(id.to_string()).with_context(|| format!("invalid folder id in {uri:?}"))
}

/// Validate `url`, check the server version, and authenticate
///
/// Returns the normalized base URL along with the authenticated client.
pub async fn connect(ctx: &Context, url: &str, auth: &str) -> Result<(String, GirderClient)> {
    let transfer = &ctx.config.transfer;
    let base = normalize_url(url, transfer).await?;
    let mut client = GirderClient::new(&base, transfer)?;
    let (major, minor) = check_minimum_version(&client).await?;
    info!(url = %base, version = %format!("{major}.{minor}"), "connected");
    resolve_credential(&mut client, auth).await?;
    Ok((base, client))
}

/// Reject a loaded profile before any request is made
fn ensure_valid(config: &Config) -> Result<(), SyncError> {
    let errors = config.validate();
    if errors.is_empty() {
        return Ok(());
    }
    let joined: Vec<String> = errors.iter().map(ToString::to_string).collect();
    Err(SyncError::Config(joined.join("; ")))
}

/// Connect with the resolved profile and run one mirror
pub async fn run_mirror(
    ctx: &Context,
    direction: Direction,
    local_root: PathBuf,
    remote_root: RemoteId,
) -> Result<()> {
    let formatter = get_formatter(ctx.format);
    ensure_valid(&ctx.config)?;
    let (_, client) = connect(ctx, ctx.url()?, ctx.auth()?).await?;

    let store = Arc::new(GirderRemoteStore::new(client));
    let engine = SyncEngine::new(store, ctx.config.transfer.clone())?;
    let summary: Summary = engine.sync(direction, &local_root, &remote_root).await?;

    formatter.summary(direction, &summary);
    if !summary.is_clean() {
        return Err(SyncError::PartialSync {
            failed: summary.failed,
        }
        .into());
    }
    Ok(())
}
