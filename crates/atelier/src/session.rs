use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use anyhow::Result;

use crate::checkpoint::CheckpointGate;
use crate::coordinator::{GroupChat, DEFAULT_MAX_ROUND};
use crate::models::message::Message;
use crate::notify::{Notifier, TracingNotifier};
use crate::providers::base::Provider;
use crate::providers::configs::OpenAiProviderConfig;
use crate::providers::openai::OpenAiProvider;
use crate::team;
use crate::tools::image::{ImageClient, IMAGE_DIR};
use crate::tools::scrape::ScrapeClient;
use crate::tools::search::SearchClient;
use crate::tools::summarize::Summarizer;
use crate::transcript::Transcript;

/// The result of one chat session: the final message and the transcript
/// that produced it
pub struct SessionOutcome {
    pub reply: Message,
    pub transcript: Transcript,
}

/// One end user's chat session: the live agent roster, its service
/// clients, and the per-session image counter. Sessions are fully
/// isolated from each other; dropping the struct tears everything down.
pub struct Session {
    provider: Arc<dyn Provider>,
    selector: Arc<dyn Provider>,
    search: SearchClient,
    scrape: ScrapeClient,
    image: ImageClient,
    summarizer: Arc<Summarizer>,
    image_dir: PathBuf,
    images_generated: Arc<AtomicU32>,
    gate: Option<Arc<dyn CheckpointGate>>,
    notifier: Arc<dyn Notifier>,
    max_round: usize,
}

impl Session {
    pub fn new(
        provider: Arc<dyn Provider>,
        selector: Arc<dyn Provider>,
        search: SearchClient,
        scrape: ScrapeClient,
        image: ImageClient,
    ) -> Self {
        let summarizer = Arc::new(Summarizer::new(Arc::clone(&provider)));
        Self {
            provider,
            selector,
            search,
            scrape,
            image,
            summarizer,
            image_dir: PathBuf::from(IMAGE_DIR),
            images_generated: Arc::new(AtomicU32::new(0)),
            gate: None,
            notifier: Arc::new(TracingNotifier),
            max_round: DEFAULT_MAX_ROUND,
        }
    }

    /// Build a session from environment configuration
    pub fn from_env() -> Result<Self> {
        let provider = Arc::new(OpenAiProvider::new(OpenAiProviderConfig::from_env()?)?);
        let selector = Arc::new(OpenAiProvider::new(
            OpenAiProviderConfig::selector_from_env()?,
        )?);
        Ok(Self::new(
            provider,
            selector,
            SearchClient::from_env()?,
            ScrapeClient::from_env()?,
            ImageClient::from_env()?,
        ))
    }

    pub fn with_gate(mut self, gate: Arc<dyn CheckpointGate>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn with_image_dir(mut self, dir: PathBuf) -> Self {
        self.image_dir = dir;
        self
    }

    pub fn with_max_round(mut self, max_round: usize) -> Self {
        self.max_round = max_round;
        self
    }

    pub fn images_generated(&self) -> u32 {
        self.images_generated.load(Ordering::SeqCst)
    }

    /// Run the content team on a task until the chat terminates. Any
    /// uncaught error aborts the session; the caller returns to idle.
    pub async fn run(&self, task: &str) -> Result<SessionOutcome> {
        let agents = team::content_team(
            Arc::clone(&self.provider),
            self.search.clone(),
            self.scrape.clone(),
            self.image.clone(),
            Arc::clone(&self.summarizer),
            &self.image_dir,
            Arc::clone(&self.images_generated),
        );

        let mut chat = GroupChat::new(agents)
            .with_max_round(self.max_round)
            .with_selector(Arc::clone(&self.selector))
            .with_notifier(Arc::clone(&self.notifier));
        if let Some(gate) = &self.gate {
            chat = chat.with_gate(Arc::clone(gate));
        }

        tracing::info!(task, "starting agents on task");
        let reply = match chat.run(task).await {
            Ok(reply) => reply,
            Err(e) => {
                tracing::error!(error = %e, "session aborted");
                return Err(e);
            }
        };

        Ok(SessionOutcome {
            reply,
            transcript: chat.into_transcript(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::message::MessageContent;
    use crate::models::tool::ToolCall;
    use crate::providers::mock::MockProvider;
    use serde_json::json;

    fn stub_session(worker: Arc<MockProvider>, selector: Arc<MockProvider>) -> Session {
        Session::new(
            worker,
            selector,
            SearchClient::new("http://localhost".into(), "k".into()).unwrap(),
            ScrapeClient::new("http://localhost".into(), "t".into()).unwrap(),
            ImageClient::new("http://localhost".into(), "t".into()).unwrap(),
        )
    }

    #[tokio::test]
    async fn test_blog_task_end_to_end_with_stubbed_completions() {
        let final_blog = "Stress less, live more. TERMINATE";

        // The copywriter drafts through the nested editorial chat; the
        // worker queue is consumed in dispatch order
        let worker = Arc::new(MockProvider::new(vec![
            // Copywriter requests the write_content tool
            Message::assistant().with_tool_request(
                "1",
                Ok(ToolCall::new(
                    "write_content",
                    json!({
                        "research_material": "breathing exercises, sleep hygiene",
                        "topic": "stress management"
                    }),
                )),
            ),
            // Nested editorial chat: editor, then writer with the marker
            Message::assistant().with_text("Structure: hook, three tips, close"),
            Message::assistant().with_text("Draft blog TERMINATE"),
            // Writer's clean copy returned by the tool
            Message::assistant().with_text(final_blog),
            // Copywriter's final reply after the tool result
            Message::assistant().with_text(final_blog),
        ]));
        let selector = Arc::new(MockProvider::new(vec![
            Message::assistant().with_text("Copywriter"),
        ]));

        let session = stub_session(worker, selector);
        let outcome = session
            .run("write a blog about stress management")
            .await
            .unwrap();

        assert_eq!(outcome.reply.text(), final_blog);

        // No tool errors were recorded anywhere in the transcript
        for message in outcome.transcript.messages() {
            for content in &message.content {
                if let MessageContent::ToolResponse(response) = content {
                    assert!(response.tool_result.is_ok());
                }
            }
        }
        assert_eq!(session.images_generated(), 0);
    }
}
