//! Credential resolution and server checks
//!
//! Everything that must succeed before a sync starts:
//!
//! - [`normalize_url`] - Find the API root for a user-supplied URL
//! - [`check_minimum_version`] - Refuse servers older than 2.3
//! - [`classify_credential`] / [`resolve_credential`] - Turn a username:password
//!   pair, a 40-character API key, or a 64-character token into a token the
//!   client sends as `Girder-Token`
//!
//! Failures here are fatal and are reported as [`SyncError`] variants.

use std::fmt;

use reqwest::Method;
use rivet_core::config::TransferConfig;
use rivet_core::domain::SyncError;
use serde::Deserialize;
use tracing::{debug, info};
use url::Url;

use crate::client::{check_status, decode_json, GirderClient};
use crate::GirderError;

/// Length of a Girder API key
pub const API_KEY_LEN: usize = 40;

/// Length of a Girder session token
pub const TOKEN_LEN: usize = 64;

/// Oldest supported server release as `(major, minor)`
pub const MINIMUM_VERSION: (u32, u32) = (2, 3);

// ============================================================================
// Response types
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenResponse {
    auth_token: AuthToken,
    #[serde(default)]
    user: Option<TokenUser>,
}

#[derive(Debug, Deserialize)]
struct AuthToken {
    token: String,
}

#[derive(Debug, Default, Deserialize)]
struct TokenUser {
    #[serde(default)]
    email: Option<String>,
    #[serde(rename = "_id", default)]
    id: Option<String>,
}

/// Body of `GET system/version`
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerVersion {
    #[serde(default)]
    pub release: Option<String>,
    #[serde(default)]
    pub api_version: Option<String>,
}

impl ServerVersion {
    /// `release` if present and non-empty, else `apiVersion`
    pub fn effective(&self) -> Option<&str> {
        [self.release.as_deref(), self.api_version.as_deref()]
            .into_iter()
            .flatten()
            .find(|v| !v.is_empty())
    }
}

// ============================================================================
// Credential classification
// ============================================================================

/// The shape of a raw credential string
#[derive(Clone, PartialEq, Eq)]
pub enum Credential {
    /// `username:password`, split on the first `:`
    UsernamePassword { username: String, password: String },
    /// 40-character API key
    ApiKey(String),
    /// 64-character session token
    Token(String),
}

impl Credential {
    pub fn kind(&self) -> &'static str {
        match self {
            Credential::UsernamePassword { .. } => "username/password",
            Credential::ApiKey(_) => "api key",
            Credential::Token(_) => "token",
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credential::UsernamePassword { username, .. } => f
                .debug_struct("UsernamePassword")
                .field("username", username)
                .field("password", &"<redacted>")
                .finish(),
            Credential::ApiKey(_) => f.write_str("ApiKey(<redacted>)"),
            Credential::Token(_) => f.write_str("Token(<redacted>)"),
        }
    }
}

/// Classify a raw credential by its shape
///
/// # Errors
/// Returns [`SyncError::Auth`] if the string is none of the known shapes
pub fn classify_credential(raw: &str) -> Result<Credential, SyncError> {
    if let Some((username, password)) = raw.split_once(':') {
        return Ok(Credential::UsernamePassword {
            username: username.to_string(),
            password: password.to_string(),
        });
    }
    match raw.len() {
        API_KEY_LEN => Ok(Credential::ApiKey(raw.to_string())),
        TOKEN_LEN => Ok(Credential::Token(raw.to_string())),
        _ => Err(SyncError::Auth("unrecognized credential format".to_string())),
    }
}

fn auth_error(err: GirderError) -> SyncError {
    SyncError::Auth(err.to_string())
}

/// Exchange a raw credential for a token and install it on `client`
///
/// # Arguments
/// * `client` - Client for the validated base URL; its token is replaced on success
/// * `raw` - Username:password, API key, or token
///
/// # Returns
/// The resolved token
///
/// # Errors
/// Returns [`SyncError::Auth`] on a malformed credential, a failed exchange,
/// or a token that resolves to the anonymous (null) user
pub async fn resolve_credential(client: &mut GirderClient, raw: &str) -> Result<String, SyncError> {
    let credential = classify_credential(raw)?;
    debug!(kind = credential.kind(), "resolving credential");

    let token = match credential {
        Credential::UsernamePassword { username, password } => {
            let url = client.url("user/authentication", &[]).map_err(auth_error)?;
            let request = client
                .http_client()
                .request(Method::GET, url)
                .basic_auth(&username, Some(&password));
            let response = client.execute(request).await.map_err(auth_error)?;
            let response = check_status(response).await.map_err(auth_error)?;
            let body: TokenResponse = decode_json(response).await.map_err(auth_error)?;
            let email = body.user.and_then(|u| u.email).unwrap_or_default();
            info!("authenticated with username/password (user {email})");
            body.auth_token.token
        }
        Credential::ApiKey(key) => {
            let body: TokenResponse = client
                .post_json("api_key/token", &[("key", key.as_str())])
                .await
                .map_err(auth_error)?;
            let id = body.user.and_then(|u| u.id).unwrap_or_default();
            info!("authenticated with api key (user {id})");
            body.auth_token.token
        }
        Credential::Token(token) => {
            client.set_token(token.clone());
            let me: Option<TokenUser> = client.get_json("user/me", &[]).await.map_err(auth_error)?;
            let email = me.and_then(|u| u.email).unwrap_or_default();
            if email.is_empty() {
                return Err(SyncError::Auth("failed to authenticate".to_string()));
            }
            info!("authenticated as {email}");
            token
        }
    };

    client.set_token(token.clone());
    Ok(token)
}

// ============================================================================
// Version gate
// ============================================================================

/// Parse `major.minor[.anything]` into `(major, minor)`
pub fn parse_version(version: &str) -> Option<(u32, u32)> {
    let mut parts = version.trim().splitn(3, '.');
    let major = parts.next()?.parse().ok()?;
    let minor = parts.next()?.parse().ok()?;
    Some((major, minor))
}

/// Require the server to be at least [`MINIMUM_VERSION`]
///
/// # Returns
/// The parsed `(major, minor)` of the server
///
/// # Errors
/// Returns [`SyncError::Version`] if the server is older, its version is
/// missing or unparsable, or the version endpoint fails
pub async fn check_minimum_version(client: &GirderClient) -> Result<(u32, u32), SyncError> {
    let version: ServerVersion = client
        .get_json("system/version", &[])
        .await
        .map_err(|e| SyncError::Version(e.to_string()))?;

    let raw = version.effective().ok_or_else(|| {
        SyncError::Version("unable to determine version of remote girder".to_string())
    })?;
    let parsed = parse_version(raw)
        .ok_or_else(|| SyncError::Version(format!("unparsable girder version {raw:?}")))?;

    if parsed < MINIMUM_VERSION {
        return Err(SyncError::Version(format!(
            "girder located at {} is version {raw} but rivet requires >= {}.{}.0",
            client.base_url(),
            MINIMUM_VERSION.0,
            MINIMUM_VERSION.1
        )));
    }
    debug!(version = raw, "remote version accepted");
    Ok(parsed)
}

// ============================================================================
// URL normalization
// ============================================================================

/// Prefix `https://` when the input has no scheme
pub fn with_default_scheme(input: &str) -> String {
    if input.contains("://") {
        input.to_string()
    } else {
        format!("https://{input}")
    }
}

async fn probe(candidate: &str, transfer: &TransferConfig) -> bool {
    let Ok(client) = GirderClient::new(candidate, transfer) else {
        return false;
    };
    match client.send(Method::GET, "describe", &[]).await {
        Ok(_) => true,
        Err(e) => {
            debug!(url = candidate, error = %e, "describe probe failed");
            false
        }
    }
}

/// Find the API root for a user-supplied URL
///
/// Probes `<url>/describe`; if that fails, probes again with `/api/v1`
/// appended to the path.
///
/// # Returns
/// The validated base URL, without a trailing slash
///
/// # Errors
/// Returns [`SyncError::Connectivity`] naming `input` if both probes fail
pub async fn normalize_url(input: &str, transfer: &TransferConfig) -> Result<String, SyncError> {
    let connect_error = || SyncError::Connectivity(format!("failed to connect to {input}"));

    let mut url = Url::parse(&with_default_scheme(input.trim())).map_err(|_| connect_error())?;
    let first = url.as_str().trim_end_matches('/').to_string();
    if probe(&first, transfer).await {
        return Ok(first);
    }

    let path = url.path().trim_end_matches('/').to_string();
    url.set_path(&format!("{path}/api/v1"));
    let second = url.as_str().trim_end_matches('/').to_string();
    if probe(&second, transfer).await {
        return Ok(second);
    }

    Err(connect_error())
}
