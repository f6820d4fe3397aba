//! The data facade for Muster: the single entry point an app shell calls.
//!
//! Every operation takes a [`Session`] carrying the signed-in user and their
//! cache key, checks the role gate before touching any state, applies to the
//! encrypted local cache, submits through the sync engine's dual write path
//! and appends the audit entry that makes the action revertible.
//!
//! # Layering
//!
//! - Reads go remote-first while online, refreshing the cache, and fall back
//!   to the cache on transient failure
//! - Writes always land in the cache first, so the UI never waits on the
//!   network; queued writes replay via [`DataFacade::sync`]
//! - Batch operations (bulk updates, mark recording) produce one audit entry
//!   and fan the row writes out concurrently
//! - Reverts are planned by `muster-audit` and executed here, appending a
//!   `RevertAction` entry only after the inverse writes succeed

mod admin;
mod error;
mod facade;
mod logs;
mod members;
mod merge;
mod session;
mod settings;

pub use error::{DataError, DataResult};
pub use facade::DataFacade;
pub use members::MarkEntry;
pub use session::Session;
