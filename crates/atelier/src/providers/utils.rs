use anyhow::{anyhow, Result};
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::{json, Value};

use crate::errors::AgentError;
use crate::models::content::Content;
use crate::models::message::{Message, MessageContent};
use crate::models::role::Role;
use crate::models::tool::{Tool, ToolCall};

lazy_static! {
    static ref INVALID_NAME_CHARS: Regex = Regex::new(r"[^a-zA-Z0-9_-]").unwrap();
}

/// OpenAI rejects function and participant names outside [a-zA-Z0-9_-]
pub fn sanitize_name(name: &str) -> String {
    INVALID_NAME_CHARS.replace_all(name, "_").to_string()
}

/// Convert internal messages to the OpenAI chat completion spec.
///
/// Tool responses become separate `role: tool` entries keyed by the call id,
/// and failed tool results are rendered as error text so the model can react
/// to them conversationally instead of the session aborting.
pub fn messages_to_openai_spec(messages: &[Message]) -> Vec<Value> {
    let mut messages_spec = Vec::new();

    for message in messages {
        let role = match message.role {
            Role::User => "user",
            Role::Assistant => "assistant",
        };
        let mut converted = json!({ "role": role });
        if let Some(speaker) = &message.speaker {
            converted["name"] = json!(sanitize_name(speaker));
        }

        let mut output = Vec::new();

        for content in &message.content {
            match content {
                MessageContent::Text(text) => {
                    if !text.is_empty() {
                        converted["content"] = json!(text);
                    }
                }
                MessageContent::ToolRequest(request) => match &request.tool_call {
                    Ok(tool_call) => {
                        let tool_calls = converted
                            .as_object_mut()
                            .unwrap()
                            .entry("tool_calls")
                            .or_insert(json!([]));
                        tool_calls.as_array_mut().unwrap().push(json!({
                            "id": request.id,
                            "type": "function",
                            "function": {
                                "name": sanitize_name(&tool_call.name),
                                "arguments": tool_call.arguments.to_string(),
                            }
                        }));
                    }
                    Err(e) => {
                        output.push(json!({
                            "role": "tool",
                            "content": format!("Error: {}", e),
                            "tool_call_id": request.id
                        }));
                    }
                },
                MessageContent::ToolResponse(response) => match &response.tool_result {
                    Ok(contents) => {
                        let text: Vec<String> = contents
                            .iter()
                            .map(|content| match content {
                                Content::Text(text) => text.text.clone(),
                                Content::Image(_) => {
                                    "This tool result included an image.".to_string()
                                }
                            })
                            .collect();
                        output.push(json!({
                            "role": "tool",
                            "content": text.join("\n"),
                            "tool_call_id": response.id
                        }));
                    }
                    Err(e) => {
                        output.push(json!({
                            "role": "tool",
                            "content": format!("The tool call returned the following error:\n{}", e),
                            "tool_call_id": response.id
                        }));
                    }
                },
            }
        }

        // Skip empty shells, e.g. a message that carried only tool responses
        let has_payload = converted.get("content").is_some() || converted.get("tool_calls").is_some();
        if has_payload {
            messages_spec.push(converted);
        }
        messages_spec.extend(output);
    }

    messages_spec
}

/// Convert tool schemas to the OpenAI function-calling spec
pub fn tools_to_openai_spec(tools: &[Tool]) -> Result<Vec<Value>> {
    let mut seen = std::collections::HashSet::new();
    let mut result = Vec::new();
    for tool in tools {
        if !seen.insert(&tool.name) {
            return Err(anyhow!("Duplicate tool name: {}", tool.name));
        }
        result.push(json!({
            "type": "function",
            "function": {
                "name": sanitize_name(&tool.name),
                "description": tool.description,
                "parameters": tool.parameters,
            }
        }));
    }
    Ok(result)
}

/// Parse an OpenAI chat completion response into an internal message
pub fn openai_response_to_message(response: Value) -> Result<Message> {
    let original = response["choices"][0]["message"].clone();
    let mut message = Message::assistant();

    if let Some(text) = original.get("content").and_then(|v| v.as_str()) {
        message = message.with_text(text);
    }

    if let Some(tool_calls) = original.get("tool_calls").and_then(|v| v.as_array()) {
        for tool_call in tool_calls {
            let id = tool_call["id"]
                .as_str()
                .unwrap_or_default()
                .to_string();
            let name = tool_call["function"]["name"]
                .as_str()
                .ok_or_else(|| anyhow!("Tool call missing function name"))?
                .to_string();
            let arguments = tool_call["function"]["arguments"].as_str().unwrap_or("{}");

            let call = match serde_json::from_str::<Value>(arguments) {
                Ok(params) => Ok(ToolCall::new(&name, params)),
                Err(e) => Err(AgentError::InvalidArgument(format!(
                    "Could not interpret tool call arguments for {}: {}",
                    name, e
                ))),
            };
            message = message.with_tool_request(id, call);
        }
    }

    Ok(message)
}
