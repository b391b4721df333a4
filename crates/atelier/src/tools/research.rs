use std::sync::Arc;

use async_trait::async_trait;
use futures::TryStreamExt;
use indoc::indoc;
use serde_json::{json, Value};

use crate::agent::Agent;
use crate::coordinator::GroupChat;
use crate::errors::{AgentError, AgentResult};
use crate::models::content::Content;
use crate::models::message::Message;
use crate::models::tool::Tool;
use crate::providers::base::Provider;
use crate::tools::scrape::{ScrapeClient, ScrapeTool};
use crate::tools::search::{SearchClient, SearchTool};
use crate::tools::summarize::Summarizer;
use crate::tools::{require_str, ToolHandler};

const RESEARCH_MAX_ROUND: usize = 10;

const ASSISTANT_PROMPT: &str = indoc! {r#"
    As the Research Assistant your task is to research the provided query extensively.
    Use the search function to find relevant information and the scrape function to read
    promising pages. Produce a detailed report, ensuring you include technical specifics
    and reference all sources. Conclude your report with "TERMINATE".
"#};

const REPORT_REQUEST: &str =
    "Give me the research report that just generated again, return ONLY the report & reference links.";

/// Research a topic in a nested two-agent chat: a research assistant with
/// search and scrape tools, driven to completion by a research admin proxy.
/// The assistant's final report is the tool's return value.
pub struct ResearchTool {
    provider: Arc<dyn Provider>,
    search: SearchClient,
    scrape: ScrapeClient,
    summarizer: Arc<Summarizer>,
}

impl ResearchTool {
    pub fn new(
        provider: Arc<dyn Provider>,
        search: SearchClient,
        scrape: ScrapeClient,
        summarizer: Arc<Summarizer>,
    ) -> Self {
        Self {
            provider,
            search,
            scrape,
            summarizer,
        }
    }

    pub fn tool() -> Tool {
        Tool::new(
            "research",
            "Research about a given topic, return the research material including reference links",
            json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "The topic to be researched about"
                    }
                },
                "required": ["query"]
            }),
        )
    }

    async fn run_chat(&self, query: &str) -> AgentResult<String> {
        let assistant = Arc::new(
            Agent::new(
                "Research_Assistant",
                ASSISTANT_PROMPT,
                Arc::clone(&self.provider),
            )
            .with_tool(
                SearchTool::tool(),
                Arc::new(SearchTool::new(self.search.clone())),
            )
            .with_tool(
                ScrapeTool::tool(),
                Arc::new(ScrapeTool::new(
                    self.scrape.clone(),
                    Arc::clone(&self.summarizer),
                )),
            ),
        );
        let admin = Arc::new(Agent::proxy("Research_Admin"));

        let mut chat = GroupChat::new(vec![admin, Arc::clone(&assistant)])
            .with_max_round(RESEARCH_MAX_ROUND);
        chat.run(query)
            .await
            .map_err(|e| AgentError::ExternalService(e.to_string()))?;

        // Ask the assistant once more for a clean copy of the report
        let mut transcript = chat.into_transcript();
        transcript.push(
            Message::user()
                .with_speaker("Research_Admin")
                .with_text(REPORT_REQUEST),
        );

        let mut stream = assistant
            .reply(&transcript)
            .await
            .map_err(|e| AgentError::ExternalService(e.to_string()))?;
        let mut report = String::new();
        while let Some(message) = stream
            .try_next()
            .await
            .map_err(|e| AgentError::ExternalService(e.to_string()))?
        {
            report = message.text();
        }
        Ok(report)
    }
}

#[async_trait]
impl ToolHandler for ResearchTool {
    async fn call(&self, arguments: Value) -> AgentResult<Vec<Content>> {
        let query = require_str(&arguments, "query")?;
        tracing::info!(query, "starting research sub-chat");
        let report = self.run_chat(query).await?;
        Ok(vec![Content::text(report)])
    }
}
