//! Tools are stateless request/response operations against external
//! services, registered per agent by name. Arguments are validated against
//! each tool's declared schema before the handler runs, and handler
//! failures are returned as values so the requesting agent can react
//! conversationally.
pub mod image;
pub mod research;
pub mod scrape;
pub mod search;
pub mod summarize;
pub mod write_content;

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::errors::{AgentError, AgentResult};
use crate::models::content::Content;
use crate::models::tool::{Tool, ToolCall};

/// A callable capability backing a registered tool
#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn call(&self, arguments: Value) -> AgentResult<Vec<Content>>;
}

struct ToolEntry {
    tool: Tool,
    handler: Arc<dyn ToolHandler>,
}

/// Name -> (schema, handler) registry owned by a single agent
#[derive(Default)]
pub struct ToolRegistry {
    entries: Vec<ToolEntry>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, tool: Tool, handler: Arc<dyn ToolHandler>) {
        self.entries.push(ToolEntry { tool, handler });
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Schemas for every registered tool, passed along with completion
    /// requests
    pub fn schemas(&self) -> Vec<Tool> {
        self.entries.iter().map(|e| e.tool.clone()).collect()
    }

    /// Look up the named tool, validate the arguments against its schema
    /// and invoke the handler
    pub async fn dispatch(&self, call: &ToolCall) -> AgentResult<Vec<Content>> {
        let entry = self
            .entries
            .iter()
            .find(|e| e.tool.name == call.name)
            .ok_or_else(|| AgentError::ToolNotFound(call.name.clone()))?;

        validate_required(&entry.tool.parameters, &call.arguments)?;
        entry.handler.call(call.arguments.clone()).await
    }
}

/// Check that every parameter the schema marks required is present
pub fn validate_required(schema: &Value, arguments: &Value) -> AgentResult<()> {
    let required = match schema.get("required").and_then(|v| v.as_array()) {
        Some(required) => required,
        None => return Ok(()),
    };

    for name in required.iter().filter_map(|v| v.as_str()) {
        if arguments.get(name).is_none() {
            return Err(AgentError::MissingParameter(name.to_string()));
        }
    }
    Ok(())
}

/// Extract a required string argument
pub fn require_str<'a>(arguments: &'a Value, name: &str) -> AgentResult<&'a str> {
    arguments
        .get(name)
        .and_then(|v| v.as_str())
        .ok_or_else(|| AgentError::MissingParameter(name.to_string()))
}
