use serde::{Deserialize, Serialize};

use crate::utils::url::construct_api_url;

#[derive(Serialize, Clone)]
pub struct QueryRequest {
    pub query: String,
    pub max_context_docs: u32,
}

/// One citation attached to an answer. `origin` is whatever locator the
/// backend indexed the document under; it is treated as opaque text.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct SourceRef {
    pub title: String,
    pub origin: String,
}

#[derive(Deserialize)]
pub struct QueryResponse {
    pub answer: String,
    #[serde(default)]
    pub sources: Vec<SourceRef>,
}

#[derive(Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

/// One decoded record from the `/query-stream` event stream.
#[derive(Deserialize)]
pub struct StreamEventPayload {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub data: String,
}

/// The backend reports exactly this literal when it is ready to answer.
/// Anything else, including a failed request, counts as unhealthy.
pub fn is_healthy_status(status: &str) -> bool {
    status == "healthy"
}

#[derive(Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub max_context_docs: u32,
}

/// HTTP client for the advisor service's request/response endpoints. The
/// streaming endpoint is driven separately by `core::chat_stream`.
#[derive(Clone)]
pub struct AdvisorClient {
    client: reqwest::Client,
    config: ClientConfig,
}

impl AdvisorClient {
    pub fn new(client: reqwest::Client, config: ClientConfig) -> Self {
        Self { client, config }
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    pub fn max_context_docs(&self) -> u32 {
        self.config.max_context_docs
    }

    pub fn http_client(&self) -> &reqwest::Client {
        &self.client
    }

    /// Single-shot query. The caller surfaces failures in the transcript;
    /// there is no retry here.
    pub async fn query(
        &self,
        query: &str,
    ) -> Result<QueryResponse, Box<dyn std::error::Error + Send + Sync>> {
        let query_url = construct_api_url(&self.config.base_url, "query");
        let request = QueryRequest {
            query: query.to_string(),
            max_context_docs: self.config.max_context_docs,
        };

        let response = self
            .client
            .post(query_url)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(format!("API request failed with status {status}: {error_text}").into());
        }

        let query_response = response.json::<QueryResponse>().await?;
        Ok(query_response)
    }

    /// Liveness probe. Absorbs every failure into `false` so startup never
    /// has to distinguish "down" from "unreachable".
    pub async fn health_check(&self) -> bool {
        let health_url = construct_api_url(&self.config.base_url, "health");

        let response = match self.client.get(health_url).send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::debug!(error = %e, "health check request failed");
                return false;
            }
        };

        if !response.status().is_success() {
            tracing::debug!(status = %response.status(), "health check returned non-success");
            return false;
        }

        match response.json::<HealthResponse>().await {
            Ok(health) => is_healthy_status(&health.status),
            Err(e) => {
                tracing::debug!(error = %e, "health check body was not valid JSON");
                false
            }
        }
    }
}
