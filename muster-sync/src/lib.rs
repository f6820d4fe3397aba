//! Offline-first sync engine for Muster.
//!
//! Writes are dual-path: apply to the local cache immediately, then either
//! reach the remote row store or land in the durable queue. The queue
//! replays in FIFO order when connectivity returns, relying on the remote's
//! idempotent writes (client-generated row ids, upsert semantics) so that a
//! half-finished replay is always safe to repeat.
//!
//! # Architecture
//!
//! - [`RemoteStore`] is the seam to the server; [`HttpRemoteStore`] is the
//!   production implementation
//! - [`FailureClassifier`] decides retry-vs-discard per failed write;
//!   [`HttpStatusClassifier`] encodes the default HTTP conventions
//! - [`SyncEngine`] owns the submit and replay logic
//! - [`SyncService`] wraps the engine in a command-driven background loop

mod classify;
mod config;
mod engine;
mod error;
mod http;
mod remote;
mod service;
mod status;

pub use classify::{FailureClassifier, FailureKind, HttpStatusClassifier};
pub use config::{RemoteConfig, SyncConfig};
pub use engine::{SubmitOutcome, SyncEngine, SyncReport};
pub use error::{SyncError, SyncResult};
pub use http::HttpRemoteStore;
pub use remote::{RemoteError, RemoteResult, RemoteRow, RemoteStore, SettingsStore};
pub use service::{create_sync_service, SyncCommand, SyncHandle, SyncService};
pub use status::{ConnectivityState, SyncStatus};
