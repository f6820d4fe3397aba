//! DuckDB local cache and pending-write queue for Muster.
//!
//! Every device keeps a full encrypted copy of the rows it has seen plus a
//! FIFO queue of writes that have not reached the server yet. Reads are
//! served from here when the network is down; the queue is replayed in order
//! once it comes back.
//!
//! # Architecture
//!
//! - `cache_rows` holds one encrypted blob per remote row, keyed by
//!   (row kind, section, id)
//! - `pending_writes` is the replay queue, ordered by a strictly increasing
//!   sequence number assigned at enqueue time
//! - [`ChangeNotifier`] broadcasts a refresh event after every cache
//!   mutation so views re-read without polling

mod cache;
mod error;
mod notify;

pub use cache::{CacheStore, CachedRow, QueuedWrite};
pub use error::{StoreError, StoreResult};
pub use notify::{ChangeNotifier, RefreshEvent, RefreshTopic};
