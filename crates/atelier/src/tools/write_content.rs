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
use crate::tools::{require_str, ToolHandler};

const EDITORIAL_MAX_ROUND: usize = 10;

const EDITOR_PROMPT: &str = indoc! {r#"
    Welcome, Senior Editor.
    As a seasoned professional, you bring meticulous attention to detail and a commitment
    to upholding the highest editorial standards. Your role is to craft the structure of a
    short blog post using the provided research material. Once structured, pass it to the
    Writer to pen the final piece.
"#};

const WRITER_PROMPT: &str = indoc! {r#"
    Welcome, Blogger.
    Your task is to compose a short blog post using the structure given by the Editor and
    incorporating feedback from the Reviewer. Embrace stylistic minimalism: be clear,
    concise, and direct. Approach the topic from a journalistic perspective; aim to inform
    and engage the readers without adopting a sales-oriented tone.
    After two rounds of revisions, conclude your post with "TERMINATE".
"#};

const REVIEWER_PROMPT: &str = indoc! {r#"
    As a distinguished blog content critic, you are known for your discerning eye and an
    unwavering commitment to editorial excellence. Your role is to meticulously review and
    critique the written blog, ensuring it meets the highest standards of clarity,
    coherence, and precision. Provide invaluable feedback to the Writer to elevate the
    piece. After two rounds of content iteration, conclude with "TERMINATE".
"#};

const BLOG_REQUEST: &str = "Give me the blog that just generated again, return ONLY the blog, \
                            and add TERMINATE in the end of the message";

/// Write content in a nested editorial chat: an editor structures the
/// piece, a writer drafts it, a reviewer critiques, with an editorial
/// admin proxy anchoring the chat. The writer's final copy is the tool's
/// return value.
pub struct WriteContentTool {
    provider: Arc<dyn Provider>,
}

impl WriteContentTool {
    pub fn new(provider: Arc<dyn Provider>) -> Self {
        Self { provider }
    }

    pub fn tool() -> Tool {
        Tool::new(
            "write_content",
            "Write content based on the given research material & topic",
            json!({
                "type": "object",
                "properties": {
                    "research_material": {
                        "type": "string",
                        "description": "Research material of a given topic, including reference links when available"
                    },
                    "topic": {
                        "type": "string",
                        "description": "The topic of the content"
                    }
                },
                "required": ["research_material", "topic"]
            }),
        )
    }

    async fn run_chat(&self, research_material: &str, topic: &str) -> AgentResult<String> {
        let admin = Arc::new(Agent::proxy("Editorial_Admin"));
        let editor = Arc::new(Agent::new("Editor", EDITOR_PROMPT, Arc::clone(&self.provider)));
        let writer = Arc::new(Agent::new("Writer", WRITER_PROMPT, Arc::clone(&self.provider)));
        let reviewer = Arc::new(Agent::new(
            "Reviewer",
            REVIEWER_PROMPT,
            Arc::clone(&self.provider),
        ));

        let mut chat = GroupChat::new(vec![
            admin,
            editor,
            Arc::clone(&writer),
            reviewer,
        ])
        .with_max_round(EDITORIAL_MAX_ROUND);

        let task = format!(
            "Write a blog about {}, here are the material: {}",
            topic, research_material
        );
        chat.run(&task)
            .await
            .map_err(|e| AgentError::ExternalService(e.to_string()))?;

        // Ask the writer once more for a clean copy of the blog
        let mut transcript = chat.into_transcript();
        transcript.push(
            Message::user()
                .with_speaker("Editorial_Admin")
                .with_text(BLOG_REQUEST),
        );

        let mut stream = writer
            .reply(&transcript)
            .await
            .map_err(|e| AgentError::ExternalService(e.to_string()))?;
        let mut blog = String::new();
        while let Some(message) = stream
            .try_next()
            .await
            .map_err(|e| AgentError::ExternalService(e.to_string()))?
        {
            blog = message.text();
        }
        Ok(blog)
    }
}

#[async_trait]
impl ToolHandler for WriteContentTool {
    async fn call(&self, arguments: Value) -> AgentResult<Vec<Content>> {
        let research_material = require_str(&arguments, "research_material")?;
        let topic = require_str(&arguments, "topic")?;
        tracing::info!(topic, "starting editorial sub-chat");
        let blog = self.run_chat(research_material, topic).await?;
        Ok(vec![Content::text(blog)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::mock::MockProvider;

    #[tokio::test]
    async fn test_write_content_returns_writer_copy() {
        // Editorial round-robin: editor structures, writer drafts with the
        // marker, then the clean copy request
        let provider = Arc::new(MockProvider::new(vec![
            Message::assistant().with_text("Structure: intro, body, close"),
            Message::assistant().with_text("Draft blog TERMINATE"),
            Message::assistant().with_text("Final blog TERMINATE"),
        ]));
        let tool = WriteContentTool::new(provider);

        let result = tool
            .call(json!({
                "research_material": "calm research notes",
                "topic": "stress management"
            }))
            .await
            .unwrap();
        assert_eq!(result[0].as_text(), Some("Final blog TERMINATE"));
    }

    #[tokio::test]
    async fn test_write_content_requires_both_arguments() {
        let tool = WriteContentTool::new(Arc::new(MockProvider::new(vec![])));
        let result = tool.call(json!({"topic": "stress"})).await;
        assert_eq!(
            result,
            Err(AgentError::MissingParameter("research_material".to_string()))
        );
    }
}
