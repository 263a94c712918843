//! OpenAI-compatible chat completions backend (Groq, OpenAI, local gateways).

use crate::model::{
    Backend, Completion, Message, ModelError, ModelRequest, Role, ToolCallRequest, ToolChoice,
    ToolSpec, Usage,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

/// Groq's OpenAI-compatible endpoint.
pub const DEFAULT_API_BASE: &str = "https://api.groq.com/openai/v1";
pub const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 1000;

// ─────────────────────────────────────────────────────────────────────────────
// API Wire Types
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ApiRequest {
    model: String,
    messages: Vec<ApiMessage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<ApiTool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<&'static str>,
    max_completion_tokens: u32,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct ApiMessage {
    role: &'static str,
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<ApiToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
}

#[derive(Debug, Serialize)]
struct ApiTool {
    #[serde(rename = "type")]
    kind: &'static str,
    function: ApiFunction,
}

#[derive(Debug, Serialize)]
struct ApiFunction {
    name: String,
    description: String,
    parameters: Value,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiToolCall {
    id: String,
    #[serde(rename = "type", default = "function_kind")]
    kind: String,
    function: ApiToolCallFunction,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiToolCallFunction {
    name: String,
    #[serde(default)]
    arguments: String,
}

fn function_kind() -> String {
    "function".to_string()
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    choices: Vec<ApiChoice>,
    #[serde(default)]
    usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ApiResponseMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<ApiToolCall>>,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}

// ─────────────────────────────────────────────────────────────────────────────
// Backend Implementation
// ─────────────────────────────────────────────────────────────────────────────

/// Builder for creating an OpenAI-compatible backend.
#[derive(Debug, Clone)]
pub struct OpenAiBackendBuilder {
    model: String,
    api_base: String,
    max_output_tokens: u32,
}

impl OpenAiBackendBuilder {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            api_base: DEFAULT_API_BASE.to_string(),
            max_output_tokens: DEFAULT_MAX_OUTPUT_TOKENS,
        }
    }

    pub fn api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    pub fn max_output_tokens(mut self, max_output_tokens: u32) -> Self {
        self.max_output_tokens = max_output_tokens;
        self
    }

    pub fn build(self) -> OpenAiBackend {
        OpenAiBackend {
            client: reqwest::Client::new(),
            model: self.model,
            api_base: self.api_base,
            max_output_tokens: self.max_output_tokens,
        }
    }
}

/// OpenAI-compatible chat completions backend.
pub struct OpenAiBackend {
    client: reqwest::Client,
    model: String,
    api_base: String,
    max_output_tokens: u32,
}

impl OpenAiBackend {
    pub fn builder(model: impl Into<String>) -> OpenAiBackendBuilder {
        OpenAiBackendBuilder::new(model)
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.api_base.trim_end_matches('/'))
    }

    fn role_to_api(role: Role) -> &'static str {
        match role {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Tool => "tool",
        }
    }

    fn message_to_api(msg: &Message) -> ApiMessage {
        let tool_calls = (!msg.tool_calls.is_empty()).then(|| {
            msg.tool_calls
                .iter()
                .map(|call| ApiToolCall {
                    id: call.id.clone(),
                    kind: function_kind(),
                    function: ApiToolCallFunction {
                        name: call.name.clone(),
                        arguments: call.arguments.clone(),
                    },
                })
                .collect()
        });

        // Pure tool-call turns carry no text.
        let content = if tool_calls.is_some() && msg.content.is_empty() {
            None
        } else {
            Some(msg.content.clone())
        };

        ApiMessage {
            role: Self::role_to_api(msg.role),
            content,
            tool_calls,
            tool_call_id: msg.tool_call_id.clone(),
            name: msg.name.clone(),
        }
    }

    fn tool_to_api(spec: &ToolSpec) -> ApiTool {
        ApiTool {
            kind: "function",
            function: ApiFunction {
                name: spec.name.clone(),
                description: spec.description.clone(),
                parameters: spec.parameters.clone(),
            },
        }
    }

    fn build_request(&self, request: &ModelRequest<'_>) -> ApiRequest {
        let tools: Vec<ApiTool> = request.tools.iter().map(Self::tool_to_api).collect();
        // tool_choice is only meaningful alongside tools.
        let tool_choice = match request.tool_choice {
            _ if tools.is_empty() => None,
            Some(ToolChoice::Auto) => Some("auto"),
            None => None,
        };

        ApiRequest {
            model: self.model.clone(),
            messages: request.messages.iter().map(Self::message_to_api).collect(),
            tools,
            tool_choice,
            max_completion_tokens: self.max_output_tokens,
            stream: false,
        }
    }

    fn response_to_completion(response: ApiResponse) -> Result<Completion, ModelError> {
        let choice = response.choices.into_iter().next().ok_or_else(|| {
            ModelError::InvalidResponse("no choices in completion response".to_string())
        })?;

        let tool_calls = choice
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|call| ToolCallRequest {
                id: call.id,
                name: call.function.name,
                arguments: call.function.arguments,
            })
            .collect();

        let usage = response
            .usage
            .map(|u| Usage {
                input_tokens: u.prompt_tokens,
                output_tokens: u.completion_tokens,
            })
            .unwrap_or_default();

        Ok(Completion {
            content: choice.message.content,
            tool_calls,
            usage,
        })
    }
}

impl std::fmt::Display for OpenAiBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "openai-compatible({}, {})", self.model, self.api_base)
    }
}

impl Backend for OpenAiBackend {
    async fn complete(&self, request: ModelRequest<'_>) -> Result<Completion, ModelError> {
        let api_request = self.build_request(&request);
        debug!(
            model = %self.model,
            messages = api_request.messages.len(),
            tools = api_request.tools.len(),
            "requesting completion"
        );

        let response = self
            .client
            .post(self.endpoint())
            .header("content-type", "application/json")
            .header("accept", "application/json")
            .bearer_auth(request.credential.expose())
            .json(&api_request)
            .send()
            .await
            .map_err(|e| ModelError::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ModelError::Api(format!("{status}: {body}")));
        }

        let api_response: ApiResponse = response
            .json()
            .await
            .map_err(|e| ModelError::InvalidResponse(e.to_string()))?;

        let completion = Self::response_to_completion(api_response)?;
        debug!(
            tool_calls = completion.tool_calls.len(),
            input_tokens = completion.usage.input_tokens,
            output_tokens = completion.usage.output_tokens,
            "completion received"
        );
        Ok(completion)
    }
}
