//! JSON/HTTP implementation of the backend collaborators.
//!
//! Thin reqwest wrapper. Body parsing lives in pure functions so it can be
//! tested without a server.

use std::time::Duration;

use super::config::{ApiConfig, ApiTimeouts};
use super::{ActionApi, ChatReply, ChatRequest, ConversationApi, HttpMethod, MutationRequest, ProgressApi};
use crate::error::ApiError;
use crate::types::JobProgressSnapshot;

const CHAT_PATH: &str = "/cypher/chat";

// =============================================================================
// CLIENT
// =============================================================================

pub struct HttpBackend {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl HttpBackend {
    /// Build a backend client from parsed config.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        let ApiTimeouts { request_secs, connect_secs } = config.timeouts;
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(request_secs))
            .connect_timeout(Duration::from_secs(connect_secs))
            .build()
            .map_err(|e| ApiError::HttpClientBuild(e.to_string()))?;
        Ok(Self { http, base_url: config.base_url.clone(), token: config.token.clone() })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        join_url(&self.base_url, path)
    }

    fn authorize(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Send a request and return the body text of a 2xx response.
    async fn send_for_text(&self, builder: reqwest::RequestBuilder) -> Result<String, ApiError> {
        let response = self
            .authorize(builder)
            .send()
            .await
            .map_err(|e| ApiError::Request(e.to_string()))?;

        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| ApiError::Request(e.to_string()))?;

        if !(200..300).contains(&status) {
            return Err(ApiError::Status { status, body: text });
        }
        Ok(text)
    }
}

#[async_trait::async_trait]
impl ConversationApi for HttpBackend {
    async fn send(&self, request: &ChatRequest) -> Result<ChatReply, ApiError> {
        let text = self
            .send_for_text(self.http.post(self.url(CHAT_PATH)).json(request))
            .await?;
        parse_chat_reply(&text)
    }
}

#[async_trait::async_trait]
impl ProgressApi for HttpBackend {
    async fn get_progress(&self, job_id: &str) -> Result<JobProgressSnapshot, ApiError> {
        let path = progress_path(job_id)?;
        let text = self.send_for_text(self.http.get(self.url(&path))).await?;
        parse_snapshot(&text)
    }
}

#[async_trait::async_trait]
impl ActionApi for HttpBackend {
    async fn execute(&self, request: &MutationRequest) -> Result<serde_json::Value, ApiError> {
        let url = self.url(&request.path);
        let builder = match request.method {
            HttpMethod::Post => self.http.post(url).json(&request.body),
            HttpMethod::Patch => self.http.patch(url).json(&request.body),
        };
        let text = self.send_for_text(builder).await?;
        Ok(parse_mutation_body(&text))
    }
}

// =============================================================================
// PARSING
// =============================================================================

pub(crate) fn join_url(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}

/// Progress endpoint for a job. The id must be a single, non-empty path
/// segment, matching what the dispatcher accepts for case ids.
pub(crate) fn progress_path(job_id: &str) -> Result<String, ApiError> {
    let id = job_id.trim();
    if id.is_empty() || id.contains(['/', '?', '#']) {
        return Err(ApiError::InvalidPath(job_id.to_string()));
    }
    Ok(format!("/cases/{id}/progress"))
}

pub(crate) fn parse_chat_reply(json: &str) -> Result<ChatReply, ApiError> {
    serde_json::from_str(json).map_err(|e| ApiError::Decode(e.to_string()))
}

pub(crate) fn parse_snapshot(json: &str) -> Result<JobProgressSnapshot, ApiError> {
    serde_json::from_str(json).map_err(|e| ApiError::Decode(e.to_string()))
}

/// Mutation responses are informational; an empty or non-JSON body is fine.
pub(crate) fn parse_mutation_body(text: &str) -> serde_json::Value {
    if text.trim().is_empty() {
        return serde_json::Value::Null;
    }
    serde_json::from_str(text).unwrap_or_else(|_| serde_json::Value::String(text.to_string()))
}

#[cfg(test)]
#[path = "http_test.rs"]
mod tests;
