//! Tool-related types.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::model::ToolSpec;

/// A tool advertised by the connected peer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    /// JSON Schema for the arguments.
    pub parameters: Value,
}

impl From<mcp::Tool> for ToolDescriptor {
    fn from(tool: mcp::Tool) -> Self {
        Self {
            name: tool.name,
            description: tool.description.unwrap_or_default(),
            parameters: tool.input_schema,
        }
    }
}

impl From<&ToolDescriptor> for ToolSpec {
    fn from(tool: &ToolDescriptor) -> Self {
        Self {
            name: tool.name.clone(),
            description: tool.description.clone(),
            parameters: tool.parameters.clone(),
        }
    }
}

/// Output of a tool call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolOutput {
    Text(String),
    Segments(Vec<String>),
}

impl ToolOutput {
    /// Single text blob; segments are joined by newlines.
    pub fn normalize(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Segments(segments) => segments.join("\n"),
        }
    }
}

impl From<mcp::CallToolResult> for ToolOutput {
    fn from(result: mcp::CallToolResult) -> Self {
        match result.content {
            mcp::CallToolContent::Text(text) => Self::Text(text),
            mcp::CallToolContent::Segments(blocks) => {
                Self::Segments(blocks.iter().map(mcp::ToolContent::render).collect())
            }
        }
    }
}
