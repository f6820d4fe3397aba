//! HTTP implementation of the remote row store.
//!
//! Routes:
//! - `PUT    /api/rows/{kind}/{section}/{id}` — upsert one row
//! - `DELETE /api/rows/{kind}/{section}/{id}` — delete one row
//! - `GET    /api/rows/{kind}/{section}`      — list a section's rows
//! - `GET    /api/rows/{kind}/{section}/{id}` — fetch one row

use std::time::Duration;

use async_trait::async_trait;
use muster_types::RowKind;
use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::config::RemoteConfig;
use crate::remote::{RemoteError, RemoteResult, RemoteRow, RemoteStore};

/// Row shape on the wire. The section is implicit in the route.
#[derive(Debug, Deserialize)]
struct WireRow {
    id: String,
    payload: Value,
}

/// Remote row store over plain HTTP with bearer auth.
pub struct HttpRemoteStore {
    client: Client,
    config: RemoteConfig,
}

impl HttpRemoteStore {
    pub fn new(config: RemoteConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .expect("failed to build HTTP client");
        Self { client, config }
    }

    fn rows_url(&self, kind: RowKind, section_key: &str) -> String {
        format!(
            "{}/api/rows/{}/{}",
            self.config.api_base_url,
            kind.as_str(),
            section_key
        )
    }

    fn row_url(&self, kind: RowKind, section_key: &str, id: &str) -> String {
        format!("{}/{}", self.rows_url(kind, section_key), id)
    }

    fn authorize(&self, req: RequestBuilder) -> RequestBuilder {
        match &self.config.bearer_token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    async fn check(resp: Response) -> RemoteResult<Response> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let code = status.as_u16();
        let message = resp.text().await.unwrap_or_default();
        Err(RemoteError::Status { code, message })
    }
}

#[async_trait]
impl RemoteStore for HttpRemoteStore {
    async fn upsert_row(
        &self,
        kind: RowKind,
        section_key: &str,
        id: &str,
        payload: &Value,
    ) -> RemoteResult<()> {
        let url = self.row_url(kind, section_key, id);
        debug!("PUT {url}");
        let resp = self
            .authorize(self.client.put(&url))
            .json(payload)
            .send()
            .await
            .map_err(|e| RemoteError::Network(e.to_string()))?;
        Self::check(resp).await?;
        Ok(())
    }

    /// Deleting an absent row succeeds; the row store's deletes are
    /// idempotent.
    async fn delete_row(&self, kind: RowKind, section_key: &str, id: &str) -> RemoteResult<()> {
        let url = self.row_url(kind, section_key, id);
        debug!("DELETE {url}");
        let resp = self
            .authorize(self.client.delete(&url))
            .send()
            .await
            .map_err(|e| RemoteError::Network(e.to_string()))?;
        if resp.status().as_u16() == 404 {
            return Ok(());
        }
        Self::check(resp).await?;
        Ok(())
    }

    async fn fetch_rows(&self, kind: RowKind, section_key: &str) -> RemoteResult<Vec<RemoteRow>> {
        let url = self.rows_url(kind, section_key);
        debug!("GET {url}");
        let resp = self
            .authorize(self.client.get(&url))
            .send()
            .await
            .map_err(|e| RemoteError::Network(e.to_string()))?;
        let resp = Self::check(resp).await?;
        let body = resp
            .text()
            .await
            .map_err(|e| RemoteError::Network(e.to_string()))?;
        let rows: Vec<WireRow> = serde_json::from_str(&body)?;
        Ok(rows
            .into_iter()
            .map(|w| RemoteRow {
                id: w.id,
                section_key: section_key.to_string(),
                payload: w.payload,
            })
            .collect())
    }

    async fn fetch_row(
        &self,
        kind: RowKind,
        section_key: &str,
        id: &str,
    ) -> RemoteResult<Option<RemoteRow>> {
        let url = self.row_url(kind, section_key, id);
        debug!("GET {url}");
        let resp = self
            .authorize(self.client.get(&url))
            .send()
            .await
            .map_err(|e| RemoteError::Network(e.to_string()))?;
        if resp.status().as_u16() == 404 {
            return Ok(None);
        }
        let resp = Self::check(resp).await?;
        let body = resp
            .text()
            .await
            .map_err(|e| RemoteError::Network(e.to_string()))?;
        let row: WireRow = serde_json::from_str(&body)?;
        Ok(Some(RemoteRow {
            id: row.id,
            section_key: section_key.to_string(),
            payload: row.payload,
        }))
    }
}
