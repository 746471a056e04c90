//! Rivet Girder - Girder REST API client
//!
//! Provides async client for:
//! - Credential resolution (username/password, API key, token) and the
//!   minimum-version gate
//! - Folder and item creation with reuse semantics
//! - Chunked uploads and streamed downloads
//!
//! ## Modules
//!
//! - [`auth`] - Credential classification, token exchange, version and URL checks
//! - [`client`] - Retrying HTTP transport with Girder headers and error decoding
//! - [`resources`] - Folder, item, file, and listing endpoints
//! - [`upload`] - Upload sessions and chunk transfer
//! - [`provider`] - [`provider::GirderRemoteStore`], the `IRemoteStore` adapter

pub mod auth;
pub mod client;
pub mod provider;
pub mod resources;
pub mod upload;

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur when communicating with a Girder server
#[derive(Debug, Error)]
pub enum GirderError {
    /// A network-level error occurred (after retries, if the error was transient)
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The server answered with a non-2xx status
    ///
    /// Displays as the server's `message` so it can be used verbatim as a
    /// skip reason.
    #[error("{message}")]
    Remote {
        /// HTTP status code
        status: u16,
        /// Decoded `message`, or `HTTP <status>` when the body had none
        message: String,
    },

    /// The API response could not be parsed or was malformed
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// A base URL or request URL could not be built
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Writing a downloaded blob to disk failed
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl GirderError {
    /// HTTP status of a [`GirderError::Remote`] error
    pub fn status(&self) -> Option<u16> {
        match self {
            GirderError::Remote { status, .. } => Some(*status),
            GirderError::Network(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
