//! Rivet Sync - Directory mirror engine
//!
//! Provides:
//! - Local tree scanning into a resource graph
//! - Remote folder mirroring with dynamic fan-out
//! - Item creation and chunked blob upload, reconciled by size
//! - Paginated remote listing and partial-file downloads
//!
//! ## Modules
//!
//! - [`engine`] - Orchestrates the phases of an upload or download run
//! - [`pool`] - Bounded work queue with enqueue-time join counting
//! - [`scanner`] - Local walk (symbolic links are never followed)

pub mod download;
pub mod engine;
pub mod mirror;
pub mod pipeline;
pub mod pool;
pub mod scanner;
pub mod session;
pub mod transfer;

pub use engine::{Direction, SyncEngine};
pub use session::Session;
