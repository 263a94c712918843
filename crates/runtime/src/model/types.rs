use super::errors::ModelError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::future::Future;

/// The role of a message sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// A tool call requested by the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCallRequest {
    /// Unique within one completion; echoed back on the tool result.
    pub id: String,
    pub name: String,
    /// Raw JSON arguments as emitted by the model.
    pub arguments: String,
}

impl ToolCallRequest {
    /// Parse the arguments payload into a JSON object.
    ///
    /// An empty payload means "no arguments". Anything that is not a JSON
    /// object is rejected.
    pub fn parse_arguments(&self) -> Result<Map<String, Value>, String> {
        if self.arguments.trim().is_empty() {
            return Ok(Map::new());
        }
        match serde_json::from_str(&self.arguments) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(other) => Err(format!(
                "arguments for {} must be a JSON object, got {other}",
                self.name
            )),
            Err(e) => Err(format!("malformed arguments for {}: {e}", self.name)),
        }
    }
}

/// A message of the model transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Calls requested by an assistant message.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCallRequest>,
}

impl Message {
    /// Create a message with a role and text content.
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            tool_call_id: None,
            name: None,
            tool_calls: Vec::new(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Assistant turn that requested tool calls.
    pub fn tool_requests(content: impl Into<String>, calls: Vec<ToolCallRequest>) -> Self {
        Self {
            tool_calls: calls,
            ..Self::assistant(content)
        }
    }

    /// Result of a tool call, addressed to the call that produced it.
    pub fn tool_result(
        tool_call_id: impl Into<String>,
        name: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            tool_call_id: Some(tool_call_id.into()),
            name: Some(name.into()),
            ..Self::new(Role::Tool, content)
        }
    }
}

/// A tool definition in function-calling form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    /// JSON Schema for the arguments, passed through verbatim.
    pub parameters: Value,
}

/// How the model should choose tools.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ToolChoice {
    /// Model decides whether to use tools.
    #[default]
    Auto,
}

/// Bearer credential for the model provider.
///
/// `Debug` never prints the secret.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Wrap a key; blank input yields `None`.
    pub fn new(key: impl Into<String>) -> Option<Self> {
        let key = key.into();
        let trimmed = key.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Credential(****)")
    }
}

/// Token usage statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

/// Everything needed for a model request.
#[derive(Debug, Clone)]
pub struct ModelRequest<'a> {
    pub credential: &'a Credential,
    pub messages: &'a [Message],
    pub tools: &'a [ToolSpec],
    /// `None` leaves tool selection to the provider default.
    pub tool_choice: Option<ToolChoice>,
}

/// The response from a model.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Completion {
    pub content: Option<String>,
    /// Requested calls, in the order the model emitted them.
    pub tool_calls: Vec<ToolCallRequest>,
    pub usage: Usage,
}

impl Completion {
    /// Text content, empty for pure tool-call responses.
    pub fn text(&self) -> &str {
        self.content.as_deref().unwrap_or_default()
    }
}

/// Trait for LLM provider backends.
pub trait Backend: Send + Sync {
    fn complete(
        &self,
        request: ModelRequest<'_>,
    ) -> impl Future<Output = Result<Completion, ModelError>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(arguments: &str) -> ToolCallRequest {
        ToolCallRequest {
            id: "call_1".into(),
            name: "get_news".into(),
            arguments: arguments.into(),
        }
    }

    #[test]
    fn arguments_parse_to_object() {
        let args = call(r#"{"news_type":"world","max_items":2}"#)
            .parse_arguments()
            .unwrap();
        assert_eq!(args["news_type"], "world");
        assert_eq!(args["max_items"], 2);
    }

    #[test]
    fn empty_arguments_mean_no_arguments() {
        assert!(call("").parse_arguments().unwrap().is_empty());
        assert!(call("  ").parse_arguments().unwrap().is_empty());
    }

    #[test]
    fn malformed_or_non_object_arguments_fail() {
        assert!(call("{not json").parse_arguments().is_err());
        assert!(call("[1,2]").parse_arguments().is_err());
        assert!(call("null").parse_arguments().is_err());
    }

    #[test]
    fn tool_result_message_carries_correlation() {
        let msg = Message::tool_result("call_9", "get_news", "a\nb");
        assert_eq!(msg.role, Role::Tool);
        assert_eq!(msg.tool_call_id.as_deref(), Some("call_9"));
        assert_eq!(msg.name.as_deref(), Some("get_news"));
        assert_eq!(msg.content, "a\nb");
    }

    #[test]
    fn credential_rejects_blank_and_hides_secret() {
        assert!(Credential::new("   ").is_none());
        let key = Credential::new(" gsk_secret ").unwrap();
        assert_eq!(key.expose(), "gsk_secret");
        assert_eq!(format!("{key:?}"), "Credential(****)");
    }
}
