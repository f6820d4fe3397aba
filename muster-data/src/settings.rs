//! Per-section settings blobs. Settings live in their own backend behind
//! [`muster_sync::SettingsStore`], but reads cache locally and writes go
//! through the same dual write path as rows, so they queue offline too.

use muster_sync::FailureKind;
use muster_types::{AuditAction, AuditLog, RevertData, RowKind, Section};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::DataResult;
use crate::facade::{require, require_grant, DataFacade};
use crate::session::Session;

impl DataFacade {
    /// The settings blob for a section, or `None` when none has been saved.
    /// Online reads refresh the cache; offline reads serve it.
    pub async fn fetch_settings(
        &self,
        section: Section,
        session: &Session,
    ) -> DataResult<Option<Value>> {
        let key = section.as_str();
        if self.engine.is_online() {
            match self.settings.get(key).await {
                Ok(Some(blob)) => {
                    self.cache_put(&session.key, RowKind::Settings, key, key, &blob)?;
                    return Ok(Some(blob));
                }
                Ok(None) => return Ok(None),
                Err(err) if self.engine.classify_read(&err) == FailureKind::Transient => {
                    debug!("settings fetch failed, serving cache: {err}");
                    self.engine.connectivity().set_online(false);
                }
                Err(err) => return Err(err.into()),
            }
        }
        let Some(blob) = self.store.get(RowKind::Settings, key, key)? else {
            return Ok(None);
        };
        match self.decode::<Value>(&session.key, &blob) {
            Ok(value) => Ok(Some(value)),
            Err(err) => {
                warn!("cached settings for {key} are unreadable: {err}");
                Ok(None)
            }
        }
    }

    /// Replaces a section's settings blob and records the prior blob so the
    /// change can be reverted.
    pub async fn update_settings(
        &self,
        section: Section,
        blob: Value,
        session: &Session,
    ) -> DataResult<()> {
        require(session.role.can_edit_roster(), "editing settings requires the officer role")?;
        require_grant(session, section)?;

        let key = section.as_str();
        let prior = match self.store.get(RowKind::Settings, key, key)? {
            Some(cached) => self.decode::<Value>(&session.key, &cached).ok(),
            None if self.engine.is_online() => {
                self.settings.get(key).await.ok().flatten()
            }
            None => None,
        }
        .unwrap_or(Value::Null);

        self.cache_put(&session.key, RowKind::Settings, key, key, &blob)?;
        self.submit_upsert(RowKind::Settings, key, key, blob, session).await?;

        let log = AuditLog::new(
            AuditAction::UpdateSettings,
            Some(section),
            session.email.clone(),
            "Updated settings".to_string(),
            Some(RevertData::PriorSettings { settings: prior }),
        );
        self.persist_log(&log, session).await?;
        Ok(())
    }
}
