use std::future::Future;
use std::time::Duration;

use lokimap_core::error::{LokimapError, Result};
use serde_json::Value;

/// The capability the fetch loop consumes: one GET against the store's
/// query API, returning the decoded JSON body. Tests substitute an
/// in-memory implementation.
pub trait LokiTransport: Send + Sync {
    fn get_json(
        &self,
        path: &str,
        params: &[(String, String)],
    ) -> impl Future<Output = Result<Value>> + Send;
}

#[derive(Debug, Clone)]
pub struct LokiClient {
    http: reqwest::Client,
    base_url: String,
}

impl LokiClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LokimapError::Internal(format!("failed to build http client: {e}")))?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

impl LokiTransport for LokiClient {
    async fn get_json(&self, path: &str, params: &[(String, String)]) -> Result<Value> {
        let url = format!("{}/loki/api/v1{path}", self.base_url);
        let response = self
            .http
            .get(&url)
            .query(params)
            .send()
            .await
            .map_err(|e| LokimapError::Upstream(format!("loki request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LokimapError::Upstream(format!(
                "loki returned {status}: {body}"
            )));
        }

        response
            .json()
            .await
            .map_err(|e| LokimapError::Upstream(format!("loki response was not valid json: {e}")))
    }
}
