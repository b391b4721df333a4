use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::content::Content;
use super::role::Role;
use super::tool::ToolCall;
use crate::errors::AgentResult;

/// A message is considered final when its text ends with this marker
pub const TERMINATE_MARKER: &str = "TERMINATE";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolRequest {
    pub id: String,
    pub tool_call: AgentResult<ToolCall>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResponse {
    pub id: String,
    pub tool_result: AgentResult<Vec<Content>>,
}

/// Content carried inside a message, either plain text or tool traffic
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MessageContent {
    Text(String),
    ToolRequest(ToolRequest),
    ToolResponse(ToolResponse),
}

impl MessageContent {
    pub fn text<S: Into<String>>(text: S) -> Self {
        MessageContent::Text(text.into())
    }

    pub fn tool_request<S: Into<String>>(id: S, tool_call: AgentResult<ToolCall>) -> Self {
        MessageContent::ToolRequest(ToolRequest {
            id: id.into(),
            tool_call,
        })
    }

    pub fn tool_response<S: Into<String>>(id: S, tool_result: AgentResult<Vec<Content>>) -> Self {
        MessageContent::ToolResponse(ToolResponse {
            id: id.into(),
            tool_result,
        })
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            MessageContent::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_tool_request(&self) -> Option<&ToolRequest> {
        if let MessageContent::ToolRequest(ref tool_request) = self {
            Some(tool_request)
        } else {
            None
        }
    }

    pub fn as_tool_response(&self) -> Option<&ToolResponse> {
        if let MessageContent::ToolResponse(ref tool_response) = self {
            Some(tool_response)
        } else {
            None
        }
    }
}

/// A message in a chat transcript or on the wire to the completion provider.
///
/// Immutable once appended to a transcript. `speaker` names the chat
/// participant the message is attributed to; `recipient` is set when the
/// message is addressed to a single participant (checkpoint feedback).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speaker: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recipient: Option<String>,
    pub created: i64,
    pub content: Vec<MessageContent>,
}

impl Message {
    /// Create a new user message with the current timestamp
    pub fn user() -> Self {
        Message {
            role: Role::User,
            speaker: None,
            recipient: None,
            created: Utc::now().timestamp(),
            content: Vec::new(),
        }
    }

    /// Create a new assistant message with the current timestamp
    pub fn assistant() -> Self {
        Message {
            role: Role::Assistant,
            speaker: None,
            recipient: None,
            created: Utc::now().timestamp(),
            content: Vec::new(),
        }
    }

    pub fn with_speaker<S: Into<String>>(mut self, speaker: S) -> Self {
        self.speaker = Some(speaker.into());
        self
    }

    pub fn with_recipient<S: Into<String>>(mut self, recipient: S) -> Self {
        self.recipient = Some(recipient.into());
        self
    }

    pub fn with_content(mut self, content: MessageContent) -> Self {
        self.content.push(content);
        self
    }

    pub fn with_text<S: Into<String>>(self, text: S) -> Self {
        self.with_content(MessageContent::text(text))
    }

    pub fn with_tool_request<S: Into<String>>(
        self,
        id: S,
        tool_call: AgentResult<ToolCall>,
    ) -> Self {
        self.with_content(MessageContent::tool_request(id, tool_call))
    }

    pub fn with_tool_response<S: Into<String>>(
        self,
        id: S,
        result: AgentResult<Vec<Content>>,
    ) -> Self {
        self.with_content(MessageContent::tool_response(id, result))
    }

    /// All text content joined with newlines
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(|c| c.as_text())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// The tool requests carried by this message, if any
    pub fn tool_requests(&self) -> Vec<&ToolRequest> {
        self.content
            .iter()
            .filter_map(|c| c.as_tool_request())
            .collect()
    }

    /// Whether this message signals the end of the conversation, i.e. its
    /// text ends with the terminate marker after trailing whitespace is
    /// trimmed.
    pub fn is_terminal(&self) -> bool {
        self.text().trim_end().ends_with(TERMINATE_MARKER)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_message_builders() {
        let message = Message::assistant()
            .with_speaker("Copywriter")
            .with_text("Hello");
        assert_eq!(message.role, Role::Assistant);
        assert_eq!(message.speaker.as_deref(), Some("Copywriter"));
        assert_eq!(message.text(), "Hello");
        assert!(message.tool_requests().is_empty());
    }

    #[test]
    fn test_terminal_detection_trims_trailing_whitespace() {
        let message = Message::assistant().with_text("All done. TERMINATE  \n");
        assert!(message.is_terminal());

        let message = Message::assistant().with_text("TERMINATE is not at the end");
        assert!(!message.is_terminal());
    }

    #[test]
    fn test_tool_request_roundtrip() {
        let message = Message::assistant().with_tool_request(
            "1",
            Ok(ToolCall::new("search", json!({"query": "mental health"}))),
        );
        let serialized = serde_json::to_string(&message).unwrap();
        let deserialized: Message = serde_json::from_str(&serialized).unwrap();
        assert_eq!(message, deserialized);
    }
}
