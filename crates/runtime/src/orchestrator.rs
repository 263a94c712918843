//! The tool-augmented conversation loop.
//!
//! One turn moves through
//! `Idle → AwaitingCompletion1 → (Done | ExecutingTools → AwaitingCompletion2 → Done)`.
//! Display entries are committed to the conversation as they are produced, so
//! a turn that faults leaves its progress (and any pending announcement)
//! visible.

use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::conversation::{Conversation, DisplayMessage, Metadata, Status};
use crate::model::{
    Backend, Completion, Credential, Message, ModelRequest, ToolCallRequest, ToolChoice, ToolSpec,
};
use crate::tools::{ToolChannel, registry};
use crate::{Error, Result};

/// Everything a turn borrows from its session.
pub(crate) struct Turn<'a, B, C> {
    pub backend: &'a B,
    pub channel: &'a C,
    pub credential: &'a Credential,
    pub system_prompt: &'a str,
    pub conversation: &'a mut Conversation,
}

impl<B: Backend, C: ToolChannel> Turn<'_, B, C> {
    /// Run one turn for `input`.
    pub async fn run(self, input: &str) -> Result<()> {
        let Turn {
            backend,
            channel,
            credential,
            system_prompt,
            conversation,
        } = self;

        let mut messages = conversation.model_transcript(system_prompt, input);
        conversation.push(DisplayMessage::user(input));

        let tools = registry::available_specs(Some(channel)).await?;
        debug!(tools = tools.len(), "requesting first completion");
        let first = complete(backend, credential, &messages, &tools, Some(ToolChoice::Auto)).await?;

        if first.tool_calls.is_empty() {
            conversation.push(DisplayMessage::assistant(first.text()));
            return Ok(());
        }

        info!(calls = first.tool_calls.len(), "model requested tool calls");
        messages.push(Message::tool_requests(
            first.text(),
            first.tool_calls.clone(),
        ));

        for call in &first.tool_calls {
            let content = execute(channel, conversation, call).await?;
            messages.push(Message::tool_result(&call.id, &call.name, content));
        }

        debug!("requesting final completion");
        let second = complete(backend, credential, &messages, &[], None).await?;
        conversation.push(DisplayMessage::assistant(second.text()));
        Ok(())
    }
}

async fn complete<B: Backend>(
    backend: &B,
    credential: &Credential,
    messages: &[Message],
    tools: &[ToolSpec],
    tool_choice: Option<ToolChoice>,
) -> Result<Completion> {
    let request = ModelRequest {
        credential,
        messages,
        tools,
        tool_choice,
    };
    Ok(backend.complete(request).await?)
}

/// Execute one tool call, recording its announcement, parameters and result.
/// Returns the normalized result text for the model transcript.
async fn execute<C: ToolChannel>(
    channel: &C,
    conversation: &mut Conversation,
    call: &ToolCallRequest,
) -> Result<String> {
    let name = call.name.as_str();
    let arguments = match call.parse_arguments() {
        Ok(arguments) => arguments,
        Err(message) => {
            // Announced with the raw payload; stays pending.
            conversation.push(announcement(name, &call.arguments));
            warn!(tool = name, error = %message, "malformed tool arguments");
            return Err(Error::ToolExecution {
                tool: name.to_string(),
                message,
            });
        }
    };

    let compact = Value::Object(arguments.clone()).to_string();
    let announcement = conversation.push(announcement(name, &compact));
    conversation.push(parameters(name, &arguments));

    debug!(tool = name, id = %call.id, "executing tool call");
    let output = channel.call_tool(name, arguments).await.map_err(|e| {
        warn!(tool = name, error = %e, "tool call failed");
        Error::ToolExecution {
            tool: name.to_string(),
            message: e.to_string(),
        }
    })?;

    conversation.mark_done(announcement);
    let content = output.normalize();
    conversation.push(DisplayMessage::annotated(
        content.clone(),
        Metadata {
            title: Some(format!("Tool Result for {name}")),
            status: Some(Status::Done),
            id: Some(format!("result_{name}")),
            parent_id: Some(format!("tool_call_{name}")),
            ..Metadata::default()
        },
    ));
    Ok(content)
}

fn announcement(name: &str, compact: &str) -> DisplayMessage {
    DisplayMessage::annotated(
        format!("I'll use the {name} tool to help answer your question."),
        Metadata {
            title: Some(format!("Using tool: {name}")),
            log: Some(format!("Parameters: {compact}")),
            status: Some(Status::Pending),
            id: Some(format!("tool_call_{name}")),
            parent_id: None,
        },
    )
}

fn parameters(name: &str, arguments: &Map<String, Value>) -> DisplayMessage {
    let pretty = Value::Object(arguments.clone());
    DisplayMessage::annotated(
        format!("```json\n{pretty:#}\n```"),
        Metadata {
            title: Some("Tool Parameters".to_string()),
            id: Some(format!("params_{name}")),
            parent_id: Some(format!("tool_call_{name}")),
            ..Metadata::default()
        },
    )
}
