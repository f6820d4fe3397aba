//! Background sync service.
//!
//! A single task that replays the queue on a timer and on demand. The app
//! shell spawns [`SyncService::run`] once per session and keeps the
//! [`SyncHandle`] for force-sync and shutdown.

use std::time::Duration;

use muster_crypto::DerivedKey;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::config::SyncConfig;
use crate::engine::SyncEngine;
use crate::error::{SyncError, SyncResult};

pub enum SyncCommand {
    ForceSync,
    Stop,
}

/// Handle for sending commands to the sync service.
#[derive(Clone)]
pub struct SyncHandle {
    command_tx: mpsc::Sender<SyncCommand>,
}

impl SyncHandle {
    pub async fn force_sync(&self) -> SyncResult<()> {
        self.command_tx
            .send(SyncCommand::ForceSync)
            .await
            .map_err(|_| SyncError::ServiceStopped)
    }

    pub async fn stop(&self) -> SyncResult<()> {
        self.command_tx
            .send(SyncCommand::Stop)
            .await
            .map_err(|_| SyncError::ServiceStopped)
    }
}

/// Creates the sync service and its command handle. The caller spawns
/// `service.run()`.
pub fn create_sync_service(
    engine: SyncEngine,
    key: DerivedKey,
    config: SyncConfig,
) -> (SyncHandle, SyncService) {
    let (command_tx, command_rx) = mpsc::channel(config.command_buffer);
    let handle = SyncHandle { command_tx };
    let service = SyncService {
        engine,
        key,
        config,
        command_rx,
    };
    (handle, service)
}

pub struct SyncService {
    engine: SyncEngine,
    key: DerivedKey,
    config: SyncConfig,
    command_rx: mpsc::Receiver<SyncCommand>,
}

impl SyncService {
    /// Runs the service event loop until stopped.
    pub async fn run(mut self) {
        info!(
            "sync service started (poll every {}s)",
            self.config.poll_interval_secs
        );

        let mut poll = tokio::time::interval(Duration::from_secs(self.config.poll_interval_secs));
        // Skip first immediate tick
        poll.tick().await;

        loop {
            tokio::select! {
                _ = poll.tick() => {
                    self.replay("scheduled").await;
                }
                cmd = self.command_rx.recv() => {
                    match cmd {
                        Some(SyncCommand::ForceSync) => {
                            self.replay("forced").await;
                        }
                        Some(SyncCommand::Stop) => {
                            info!("sync service stopping");
                            break;
                        }
                        None => {
                            info!("command channel closed, stopping sync service");
                            break;
                        }
                    }
                }
            }
        }

        info!("sync service stopped");
    }

    async fn replay(&self, trigger: &str) {
        match self.engine.pending_count() {
            Ok(0) => return,
            Ok(n) => debug!("{trigger} sync: {n} queued writes"),
            Err(e) => {
                warn!("{trigger} sync: queue inspection failed: {e}");
                return;
            }
        }
        match self.engine.sync_pending_writes(&self.key).await {
            Ok(report) => debug!(
                "{trigger} sync applied {} writes ({} discarded)",
                report.applied, report.discarded
            ),
            Err(e) => debug!("{trigger} sync deferred: {e}"),
        }
    }
}
