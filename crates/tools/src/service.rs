//! HTTP transport to the local tool service.
//!
//! Every operation is a plain `GET {base_url}/{endpoint}?k=v...` returning a
//! JSON object with a `status` field. No retry, no request timeout.

use async_trait::async_trait;
use ambit_core::error::ToolError;
use ambit_core::tool::{ToolResponse, ToolService};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Talks to the tool service over loop-back HTTP.
pub struct HttpToolService {
    base_url: String,
    client: reqwest::Client,
}

impl HttpToolService {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.base_url, endpoint.trim_start_matches('/'))
    }
}

#[async_trait]
impl ToolService for HttpToolService {
    async fn call(
        &self,
        endpoint: &str,
        params: &BTreeMap<String, String>,
    ) -> Result<ToolResponse, ToolError> {
        let url = self.url(endpoint);
        debug!(endpoint, params = params.len(), "Calling tool service");

        let response = self
            .client
            .get(&url)
            .query(params)
            .send()
            .await
            .map_err(|e| ToolError::Http {
                endpoint: endpoint.to_string(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            warn!(endpoint, status = status.as_u16(), "Tool service returned error status");
            return Err(ToolError::Status {
                endpoint: endpoint.to_string(),
                status_code: status.as_u16(),
            });
        }

        let body: serde_json::Value =
            response.json().await.map_err(|e| ToolError::MalformedResponse {
                endpoint: endpoint.to_string(),
                reason: e.to_string(),
            })?;

        validate_body(endpoint, body)
    }
}

/// A tool service body must be an object carrying a string `status`.
pub(crate) fn validate_body(
    endpoint: &str,
    body: serde_json::Value,
) -> Result<ToolResponse, ToolError> {
    let response = ToolResponse(body);
    if response.status().is_none() {
        return Err(ToolError::MalformedResponse {
            endpoint: endpoint.to_string(),
            reason: "missing 'status' field".into(),
        });
    }
    Ok(response)
}
