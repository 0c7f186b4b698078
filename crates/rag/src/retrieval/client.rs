//! HTTP client for the tag-scoped search endpoint.

use super::{Retriever, SearchParams, TagSelector};
use crate::types::{RetrievalFailure, RetrievalOutcome, RetrievedDocument};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use verirag_core::config::RetrievalConfig;
use verirag_core::{AppError, AppResult};

/// Search request body.
#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    query: &'a str,
    tag: &'a [TagSelector],
    top_k: u32,
    show_image: bool,
    score_threshold: f32,
}

/// Search response envelope: documents live under `data.context`.
#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    data: Option<SearchData>,
}

#[derive(Debug, Deserialize)]
struct SearchData {
    #[serde(default)]
    context: Vec<RetrievedDocument>,
}

/// Retrieval service client.
pub struct HttpRetriever {
    endpoint: String,
    app_id: Option<String>,
    app_key: Option<String>,
    client: reqwest::Client,
}

impl HttpRetriever {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            app_id: None,
            app_key: None,
            client: reqwest::Client::new(),
        }
    }

    /// Send `X-APP-ID` / `X-APP-KEY` with every request.
    pub fn with_credentials(mut self, app_id: Option<String>, app_key: Option<String>) -> Self {
        self.app_id = app_id;
        self.app_key = app_key;
        self
    }

    /// Give up on a request after `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> AppResult<Self> {
        self.client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Retrieval(format!("Failed to build HTTP client: {}", e)))?;
        Ok(self)
    }

    /// Build a client from the `retrieval` config section.
    pub fn from_config(config: &RetrievalConfig) -> AppResult<Self> {
        let endpoint = config
            .endpoint
            .as_deref()
            .ok_or_else(|| AppError::Config("retrieval.endpoint is not set".to_string()))?;
        let (app_id, app_key) = config.resolve_credentials();

        Self::new(endpoint)
            .with_credentials(app_id, app_key)
            .with_timeout(Duration::from_secs(config.timeout))
    }
}

/// Turn a response status and body into an outcome.
fn parse_search_body(status: u16, body: String) -> RetrievalOutcome {
    let parsed: SearchResponse = match serde_json::from_str(&body) {
        Ok(parsed) => parsed,
        Err(e) => {
            return RetrievalOutcome::Failed(RetrievalFailure {
                error: format!("invalid search response: {}", e),
                status_code: Some(status),
                text: body,
            })
        }
    };

    match parsed.data {
        Some(data) => RetrievalOutcome::Documents(data.context),
        None => RetrievalOutcome::Failed(RetrievalFailure {
            error: "search response has no data field".to_string(),
            status_code: Some(status),
            text: body,
        }),
    }
}

#[async_trait]
impl Retriever for HttpRetriever {
    async fn search(
        &self,
        query: &str,
        tags: &[TagSelector],
        params: &SearchParams,
    ) -> RetrievalOutcome {
        let body = SearchRequest {
            query,
            tag: tags,
            top_k: params.top_k,
            show_image: params.show_image,
            score_threshold: params.score_threshold,
        };

        let mut request = self.client.post(&self.endpoint).json(&body);
        if let Some(app_id) = &self.app_id {
            request = request.header("X-APP-ID", app_id);
        }
        if let Some(app_key) = &self.app_key {
            request = request.header("X-APP-KEY", app_key);
        }

        tracing::debug!(tags = tags.len(), top_k = params.top_k, "Sending search request");

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(error = %e, "Search request failed");
                return RetrievalOutcome::Failed(RetrievalFailure {
                    error: e.to_string(),
                    status_code: e.status().map(|s| s.as_u16()),
                    text: String::new(),
                });
            }
        };

        let status = response.status();
        let text = match response.text().await {
            Ok(text) => text,
            Err(e) => {
                return RetrievalOutcome::Failed(RetrievalFailure {
                    error: format!("failed to read search response: {}", e),
                    status_code: Some(status.as_u16()),
                    text: String::new(),
                })
            }
        };

        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), "Search service returned an error");
            return RetrievalOutcome::Failed(RetrievalFailure {
                error: format!("search service returned {}", status),
                status_code: Some(status.as_u16()),
                text,
            });
        }

        parse_search_body(status.as_u16(), text)
    }
}
