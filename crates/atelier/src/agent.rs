use std::sync::Arc;

use anyhow::Result;
use futures::stream::BoxStream;

use crate::models::content::Content;
use crate::models::message::{Message, MessageContent, ToolRequest};
use crate::models::role::Role;
use crate::models::tool::Tool;
use crate::providers::base::Provider;
use crate::tools::{ToolHandler, ToolRegistry};
use crate::transcript::Transcript;

/// When the gate is consulted for an agent's produced content
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HumanInputPolicy {
    Never,
    OnTermination,
    Always,
}

/// A role-bound chat participant.
///
/// Assistants produce replies via model completion and may call tools from
/// their registry along the way. Proxy agents have no model; they stand in
/// for the human operator, seed tasks, and anchor the checkpoint gate.
pub struct Agent {
    name: String,
    system_prompt: String,
    provider: Option<Arc<dyn Provider>>,
    tools: ToolRegistry,
    human_input: HumanInputPolicy,
}

impl Agent {
    /// Create an assistant agent with the given role prompt
    pub fn new<N, S>(name: N, system_prompt: S, provider: Arc<dyn Provider>) -> Self
    where
        N: Into<String>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            system_prompt: system_prompt.into(),
            provider: Some(provider),
            tools: ToolRegistry::new(),
            human_input: HumanInputPolicy::Never,
        }
    }

    /// Create a proxy agent standing in for the human operator
    pub fn proxy<N: Into<String>>(name: N) -> Self {
        Self {
            name: name.into(),
            system_prompt: String::new(),
            provider: None,
            tools: ToolRegistry::new(),
            human_input: HumanInputPolicy::OnTermination,
        }
    }

    pub fn with_tool(mut self, tool: Tool, handler: Arc<dyn ToolHandler>) -> Self {
        self.tools.register(tool, handler);
        self
    }

    pub fn with_human_input(mut self, policy: HumanInputPolicy) -> Self {
        self.human_input = policy;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn role_prompt(&self) -> &str {
        &self.system_prompt
    }

    pub fn human_input(&self) -> HumanInputPolicy {
        self.human_input
    }

    /// The shared transcript relabeled for this agent: own messages become
    /// assistant turns (tool traffic kept structured), everyone else's are
    /// flattened to user-role text. Tool exchanges of other agents reach
    /// the model as plain text so the wire history stays well-formed.
    fn transcript_view(&self, transcript: &Transcript) -> Vec<Message> {
        let mut view = Vec::new();
        for message in transcript.messages() {
            let own = message.speaker.as_deref() == Some(self.name.as_str());
            if own {
                let mut m = message.clone();
                m.role = Role::Assistant;
                view.push(m);
            } else if let Some(text) = flatten_text(message) {
                let mut m = Message::user().with_text(text);
                m.speaker = message.speaker.clone();
                m.created = message.created;
                view.push(m);
            }
        }
        view
    }

    /// Produce this agent's reply to the transcript as a stream of
    /// messages: any tool request/response exchanges first, the final
    /// plain-text reply last. The caller appends each yielded message.
    pub async fn reply(&self, transcript: &Transcript) -> Result<BoxStream<'_, Result<Message>>> {
        let provider = match &self.provider {
            Some(provider) => Arc::clone(provider),
            None => {
                // A proxy without pending human input has nothing to add
                let name = self.name.clone();
                return Ok(Box::pin(async_stream::try_stream! {
                    yield Message::assistant().with_speaker(name).with_text("");
                }));
            }
        };

        let mut messages = self.transcript_view(transcript);
        let tools = self.tools.schemas();

        Ok(Box::pin(async_stream::try_stream! {
            loop {
                let (response, _usage) = provider
                    .complete(&self.system_prompt, &messages, &tools)
                    .await?;

                let mut announced = response.clone();
                announced.speaker = Some(self.name.clone());
                yield announced;

                let tool_requests: Vec<ToolRequest> =
                    response.tool_requests().into_iter().cloned().collect();
                if tool_requests.is_empty() {
                    break;
                }

                // Tools run sequentially; their results are folded back in
                // before the next completion is requested
                let mut tool_response = Message::user().with_speaker(self.name.clone());
                for request in &tool_requests {
                    let output = match &request.tool_call {
                        Ok(call) => self.tools.dispatch(call).await,
                        Err(e) => Err(e.clone()),
                    };
                    if let Err(e) = &output {
                        tracing::warn!(agent = %self.name, error = %e, "tool call failed");
                    }
                    tool_response = tool_response.with_tool_response(request.id.clone(), output);
                }
                yield tool_response.clone();

                messages.push(response);
                messages.push(tool_response);
            }
        }))
    }
}

/// Collapse a message to displayable text, ignoring tool requests
fn flatten_text(message: &Message) -> Option<String> {
    let mut parts = Vec::new();
    for content in &message.content {
        match content {
            MessageContent::Text(text) => {
                if !text.is_empty() {
                    parts.push(text.clone());
                }
            }
            MessageContent::ToolResponse(response) => match &response.tool_result {
                Ok(contents) => parts.extend(
                    contents
                        .iter()
                        .filter_map(Content::as_text)
                        .map(String::from),
                ),
                Err(e) => parts.push(format!("Error: {}", e)),
            },
            MessageContent::ToolRequest(_) => {}
        }
    }
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::AgentError;
    use crate::models::tool::ToolCall;
    use crate::providers::mock::MockProvider;
    use crate::tools::require_str;
    use async_trait::async_trait;
    use futures::TryStreamExt;
    use serde_json::{json, Value};

    struct EchoHandler;

    #[async_trait]
    impl ToolHandler for EchoHandler {
        async fn call(&self, arguments: Value) -> crate::errors::AgentResult<Vec<Content>> {
            Ok(vec![Content::text(require_str(&arguments, "message")?)])
        }
    }

    fn echo_tool() -> Tool {
        Tool::new(
            "echo",
            "Echoes back the input",
            json!({
                "type": "object",
                "properties": { "message": { "type": "string" } },
                "required": ["message"]
            }),
        )
    }

    fn transcript_with_task(task: &str) -> Transcript {
        let mut transcript = Transcript::new();
        transcript.push(Message::user().with_speaker("User_Proxy").with_text(task));
        transcript
    }

    async fn drain(agent: &Agent, transcript: &Transcript) -> Vec<Message> {
        let mut stream = agent.reply(transcript).await.unwrap();
        let mut messages = Vec::new();
        while let Some(msg) = stream.try_next().await.unwrap() {
            messages.push(msg);
        }
        messages
    }

    #[tokio::test]
    async fn test_simple_reply() {
        let provider = Arc::new(MockProvider::new(vec![
            Message::assistant().with_text("Hello!"),
        ]));
        let agent = Agent::new("Copywriter", "You are a Copywriter.", provider);

        let messages = drain(&agent, &transcript_with_task("Hi")).await;
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].text(), "Hello!");
        assert_eq!(messages[0].speaker.as_deref(), Some("Copywriter"));
    }

    #[tokio::test]
    async fn test_tool_call_loop() {
        let provider = Arc::new(MockProvider::new(vec![
            Message::assistant()
                .with_tool_request("1", Ok(ToolCall::new("echo", json!({"message": "test"})))),
            Message::assistant().with_text("Done!"),
        ]));
        let agent = Agent::new("Researcher", "You research.", provider)
            .with_tool(echo_tool(), Arc::new(EchoHandler));

        let messages = drain(&agent, &transcript_with_task("Echo test")).await;

        // Tool request, tool response, then the final text reply
        assert_eq!(messages.len(), 3);
        assert!(!messages[0].tool_requests().is_empty());
        let response = messages[1].content[0].as_tool_response().unwrap();
        assert_eq!(
            response.tool_result.as_ref().unwrap()[0].as_text(),
            Some("test")
        );
        assert_eq!(messages[2].text(), "Done!");
    }

    #[tokio::test]
    async fn test_unknown_tool_is_folded_into_response() {
        let provider = Arc::new(MockProvider::new(vec![
            Message::assistant().with_tool_request("1", Ok(ToolCall::new("bogus", json!({})))),
            Message::assistant().with_text("Recovered"),
        ]));
        let agent = Agent::new("Researcher", "You research.", provider)
            .with_tool(echo_tool(), Arc::new(EchoHandler));

        let messages = drain(&agent, &transcript_with_task("Go")).await;
        assert_eq!(messages.len(), 3);
        let response = messages[1].content[0].as_tool_response().unwrap();
        assert!(matches!(
            response.tool_result,
            Err(AgentError::ToolNotFound(_))
        ));
        assert_eq!(messages[2].text(), "Recovered");
    }

    #[tokio::test]
    async fn test_missing_parameter_does_not_crash_the_reply() {
        let provider = Arc::new(MockProvider::new(vec![
            Message::assistant().with_tool_request("1", Ok(ToolCall::new("echo", json!({})))),
            Message::assistant().with_text("Let me try again"),
        ]));
        let agent = Agent::new("Researcher", "You research.", provider)
            .with_tool(echo_tool(), Arc::new(EchoHandler));

        let messages = drain(&agent, &transcript_with_task("Go")).await;
        let response = messages[1].content[0].as_tool_response().unwrap();
        assert_eq!(
            response.tool_result,
            Err(AgentError::MissingParameter("message".to_string()))
        );
        assert_eq!(messages[2].text(), "Let me try again");
    }

    #[tokio::test]
    async fn test_proxy_reply_is_empty() {
        let agent = Agent::proxy("User_Proxy");
        let messages = drain(&agent, &transcript_with_task("task")).await;
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].text(), "");
    }

    #[test]
    fn test_transcript_view_relabels_roles() {
        let provider = Arc::new(MockProvider::new(vec![]));
        let agent = Agent::new("Writer", "You write.", provider);

        let mut transcript = Transcript::new();
        transcript.push(Message::user().with_speaker("User_Proxy").with_text("task"));
        transcript.push(Message::assistant().with_speaker("Writer").with_text("draft"));
        transcript.push(Message::assistant().with_speaker("Reviewer").with_text("notes"));

        let view = agent.transcript_view(&transcript);
        assert_eq!(view.len(), 3);
        assert_eq!(view[0].role, Role::User);
        assert_eq!(view[1].role, Role::Assistant);
        assert_eq!(view[2].role, Role::User);
        assert_eq!(view[2].speaker.as_deref(), Some("Reviewer"));
    }
}
