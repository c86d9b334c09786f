//! Deep Research Engine client
//!
//! One POST to `{base_url}/api/research` per job. The engine answers with
//! `{answer, learnings, visitedUrls}` on success, or a non-success status with
//! an optional `{error}` body. No retries: a failed call fails the job.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

const RESEARCH_PATH: &str = "/api/research";
const UNKNOWN_ERROR: &str = "Unknown error";

#[derive(Debug, Error)]
pub enum ResearchEngineError {
    #[error("research engine request failed: {0}")]
    Transport(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("malformed research engine response: {0}")]
    MalformedResponse(String),
}

/// Engine output before enhancement. Every field is required.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawResearch {
    pub answer: String,
    pub learnings: Vec<String>,
    pub visited_urls: Vec<String>,
}

#[async_trait]
pub trait ResearchEngine: Send + Sync {
    async fn fetch_research(
        &self,
        query: &str,
        depth: i32,
        breadth: i32,
    ) -> Result<RawResearch, ResearchEngineError>;
}

#[derive(Serialize)]
struct ResearchRequestBody<'a> {
    query: &'a str,
    depth: i32,
    breadth: i32,
}

#[derive(Deserialize)]
struct EngineErrorBody {
    error: Option<String>,
}

pub struct HttpResearchClient {
    client: Client,
    base_url: String,
}

impl HttpResearchClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn endpoint(&self) -> String {
        format!("{}{}", self.base_url, RESEARCH_PATH)
    }

    fn error_message(body: &str) -> String {
        serde_json::from_str::<EngineErrorBody>(body)
            .ok()
            .and_then(|b| b.error)
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| UNKNOWN_ERROR.to_string())
    }
}

#[async_trait]
impl ResearchEngine for HttpResearchClient {
    async fn fetch_research(
        &self,
        query: &str,
        depth: i32,
        breadth: i32,
    ) -> Result<RawResearch, ResearchEngineError> {
        let url = self.endpoint();
        debug!(%url, depth, breadth, "Calling research engine");

        let response = self
            .client
            .post(&url)
            .json(&ResearchRequestBody { query, depth, breadth })
            .send()
            .await
            .map_err(|e| ResearchEngineError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ResearchEngineError::Transport(e.to_string()))?;

        if !status.is_success() {
            let message = Self::error_message(&body);
            warn!(status = status.as_u16(), %message, "Research engine returned an error");
            return Err(ResearchEngineError::Api {
                status: status.as_u16(),
                message,
            });
        }

        serde_json::from_str::<RawResearch>(&body)
            .map_err(|e| ResearchEngineError::MalformedResponse(e.to_string()))
    }
}
