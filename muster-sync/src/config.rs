//! Sync configuration.

use serde::{Deserialize, Serialize};

/// Configuration for the HTTP remote row store.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// Base URL for the Muster API (e.g., "https://api.musterhq.io").
    pub api_base_url: String,

    /// Bearer token for the signed-in session, if any.
    pub bearer_token: Option<String>,

    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            api_base_url: "https://api.musterhq.io".to_string(),
            bearer_token: None,
            request_timeout_secs: 30,
        }
    }
}

/// Configuration for the background sync service.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Interval between scheduled replay attempts (seconds).
    pub poll_interval_secs: u64,

    /// Command channel capacity.
    pub command_buffer: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 30,
            command_buffer: 16,
        }
    }
}
