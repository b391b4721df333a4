use std::env;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use crate::errors::{AgentError, AgentResult};
use crate::models::content::Content;
use crate::models::tool::Tool;
use crate::tools::{require_str, ToolHandler};

pub const SEARCH_HOST: &str = "https://google.serper.dev";

/// Thin client for the search service; the JSON result body is passed
/// through to the requesting agent verbatim.
#[derive(Clone)]
pub struct SearchClient {
    client: Client,
    host: String,
    api_key: String,
}

impl SearchClient {
    pub fn new(host: String, api_key: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()?;
        Ok(Self {
            client,
            host,
            api_key,
        })
    }

    pub fn from_env() -> Result<Self> {
        let api_key = env::var("SERPER_API_KEY").context("SERPER_API_KEY is not set")?;
        let host = env::var("SEARCH_HOST").unwrap_or_else(|_| SEARCH_HOST.to_string());
        Self::new(host, api_key)
    }

    pub async fn search(&self, query: &str) -> AgentResult<String> {
        tracing::debug!(query, "searching");
        let url = format!("{}/search", self.host.trim_end_matches('/'));
        let response = self
            .client
            .post(&url)
            .header("X-API-KEY", &self.api_key)
            .json(&json!({ "q": query, "num": 10 }))
            .send()
            .await
            .map_err(|e| AgentError::ExternalService(e.to_string()))?;

        if !response.status().is_success() {
            return Err(AgentError::ExternalService(format!(
                "Search request failed with status {}",
                response.status()
            )));
        }

        response
            .text()
            .await
            .map_err(|e| AgentError::ExternalService(e.to_string()))
    }
}

pub struct SearchTool {
    client: SearchClient,
}

impl SearchTool {
    pub fn new(client: SearchClient) -> Self {
        Self { client }
    }

    pub fn tool() -> Tool {
        Tool::new(
            "search",
            "Google search for relevant information",
            json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "Google search query"
                    }
                },
                "required": ["query"]
            }),
        )
    }
}

#[async_trait]
impl ToolHandler for SearchTool {
    async fn call(&self, arguments: Value) -> AgentResult<Vec<Content>> {
        let query = require_str(&arguments, "query")?;
        let results = self.client.search(query).await?;
        Ok(vec![Content::text(results)])
    }
}
