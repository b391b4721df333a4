use std::env;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use reqwest::Client;
use serde_json::{json, Value};
use url::Url;

use crate::errors::{AgentError, AgentResult};
use crate::models::content::Content;
use crate::models::tool::Tool;
use crate::tools::summarize::{Summarizer, SUMMARY_THRESHOLD};
use crate::tools::{require_str, ToolHandler};

pub const SCRAPE_HOST: &str = "https://chrome.browserless.io";

lazy_static! {
    static ref SCRIPT_STYLE: Regex =
        Regex::new(r"(?is)<(script|style)[^>]*>.*?</(script|style)>").unwrap();
    static ref TAGS: Regex = Regex::new(r"<[^>]+>").unwrap();
    static ref BLANK_LINES: Regex = Regex::new(r"\n{3,}").unwrap();
}

/// Reduce an HTML document to its visible text
pub fn html_to_text(html: &str) -> String {
    let without_scripts = SCRIPT_STYLE.replace_all(html, "");
    let without_tags = TAGS.replace_all(&without_scripts, "\n");
    let collapsed = BLANK_LINES.replace_all(&without_tags, "\n\n");
    collapsed.trim().to_string()
}

/// Client for the headless-browser scrape service
#[derive(Clone)]
pub struct ScrapeClient {
    client: Client,
    host: String,
    token: String,
}

impl ScrapeClient {
    pub fn new(host: String, token: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()?;
        Ok(Self {
            client,
            host,
            token,
        })
    }

    pub fn from_env() -> Result<Self> {
        let token = env::var("SCRAPE_API_KEY").context("SCRAPE_API_KEY is not set")?;
        let host = env::var("SCRAPE_HOST").unwrap_or_else(|_| SCRAPE_HOST.to_string());
        Self::new(host, token)
    }

    /// Fetch the rendered page and return its visible text
    pub async fn fetch(&self, page_url: &str) -> AgentResult<String> {
        tracing::debug!(url = page_url, "scraping website");
        let url = format!(
            "{}/content?token={}",
            self.host.trim_end_matches('/'),
            self.token
        );
        let response = self
            .client
            .post(&url)
            .header("Cache-Control", "no-cache")
            .json(&json!({ "url": page_url }))
            .send()
            .await
            .map_err(|e| AgentError::ExternalService(e.to_string()))?;

        if !response.status().is_success() {
            return Err(AgentError::ExternalService(format!(
                "Scrape request failed with status {}",
                response.status()
            )));
        }

        let html = response
            .text()
            .await
            .map_err(|e| AgentError::ExternalService(e.to_string()))?;
        Ok(html_to_text(&html))
    }
}

/// Scrapes a page; content above the summary threshold is condensed before
/// being handed back to the requesting agent.
pub struct ScrapeTool {
    client: ScrapeClient,
    summarizer: Arc<Summarizer>,
}

impl ScrapeTool {
    pub fn new(client: ScrapeClient, summarizer: Arc<Summarizer>) -> Self {
        Self { client, summarizer }
    }

    pub fn tool() -> Tool {
        Tool::new(
            "scrape",
            "Scraping website content based on url",
            json!({
                "type": "object",
                "properties": {
                    "url": {
                        "type": "string",
                        "description": "Website url to scrape"
                    }
                },
                "required": ["url"]
            }),
        )
    }
}

#[async_trait]
impl ToolHandler for ScrapeTool {
    async fn call(&self, arguments: Value) -> AgentResult<Vec<Content>> {
        let page_url = require_str(&arguments, "url")?;
        Url::parse(page_url)
            .map_err(|e| AgentError::InvalidArgument(format!("Bad url {}: {}", page_url, e)))?;

        let text = self.client.fetch(page_url).await?;
        let output = if text.chars().count() > SUMMARY_THRESHOLD {
            self.summarizer.summarize(&text).await?
        } else {
            text
        };
        Ok(vec![Content::text(output)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::message::Message;
    use crate::providers::mock::MockProvider;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn summarizer(responses: Vec<Message>) -> Arc<Summarizer> {
        Arc::new(Summarizer::new(Arc::new(MockProvider::new(responses))))
    }

    #[test]
    fn test_html_to_text_strips_markup() {
        let html = r#"<html><head><style>body { color: red; }</style></head>
            <body><script>var x = 1;</script><h1>Title</h1><p>Some  text</p></body></html>"#;
        let text = html_to_text(html);
        assert!(text.contains("Title"));
        assert!(text.contains("Some  text"));
        assert!(!text.contains("script"));
        assert!(!text.contains("color: red"));
    }

    #[tokio::test]
    async fn test_scrape_short_page_returned_directly() -> Result<()> {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/content"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string("<html><body>Hello page</body></html>"),
            )
            .mount(&mock_server)
            .await;

        let client = ScrapeClient::new(mock_server.uri(), "token".to_string())?;
        let tool = ScrapeTool::new(client, summarizer(vec![]));
        let result = tool
            .call(json!({"url": "https://example.com/article"}))
            .await
            .unwrap();
        assert_eq!(result[0].as_text(), Some("Hello page"));
        Ok(())
    }

    #[tokio::test]
    async fn test_scrape_long_page_is_summarized() -> Result<()> {
        let long_body: String = std::iter::repeat('a').take(12_000).collect();
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/content"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(format!("<html><body>{}</body></html>", long_body)),
            )
            .mount(&mock_server)
            .await;

        let client = ScrapeClient::new(mock_server.uri(), "token".to_string())?;
        let tool = ScrapeTool::new(
            client,
            summarizer(vec![
                Message::assistant().with_text("first chunk summary"),
                Message::assistant().with_text("second chunk summary"),
                Message::assistant().with_text("page summary"),
            ]),
        );
        let result = tool
            .call(json!({"url": "https://example.com/long"}))
            .await
            .unwrap();
        assert_eq!(result[0].as_text(), Some("page summary"));
        Ok(())
    }

    #[tokio::test]
    async fn test_scrape_bad_url() -> Result<()> {
        let client = ScrapeClient::new("http://localhost".to_string(), "token".to_string())?;
        let tool = ScrapeTool::new(client, summarizer(vec![]));
        let result = tool.call(json!({"url": "not a url"})).await;
        assert!(matches!(result, Err(AgentError::InvalidArgument(_))));
        Ok(())
    }

    #[tokio::test]
    async fn test_scrape_non_200_status() -> Result<()> {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/content"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&mock_server)
            .await;

        let client = ScrapeClient::new(mock_server.uri(), "token".to_string())?;
        let result = client.fetch("https://example.com").await;
        assert!(matches!(result, Err(AgentError::ExternalService(_))));
        Ok(())
    }
}
