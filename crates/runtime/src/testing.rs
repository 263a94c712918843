//! In-memory fakes for exercising sessions without a network or processes.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use mcp::ServerConfig;
use serde_json::{Map, Value, json};
use tokio::sync::Notify;

use crate::model::{Backend, Completion, Message, ModelError, ModelRequest, ToolCallRequest, ToolChoice};
use crate::tools::{Launcher, ToolChannel, ToolDescriptor, ToolError, ToolOutput};

pub fn descriptor(name: &str) -> ToolDescriptor {
    ToolDescriptor {
        name: name.to_string(),
        description: format!("{name} tool"),
        parameters: json!({"type": "object"}),
    }
}

pub fn text(content: &str) -> Completion {
    Completion {
        content: Some(content.to_string()),
        ..Completion::default()
    }
}

pub fn calls(requests: &[(&str, &str, &str)]) -> Completion {
    Completion {
        content: None,
        tool_calls: requests
            .iter()
            .map(|(id, name, arguments)| ToolCallRequest {
                id: id.to_string(),
                name: name.to_string(),
                arguments: arguments.to_string(),
            })
            .collect(),
        ..Completion::default()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Backend
// ─────────────────────────────────────────────────────────────────────────────

/// What the backend was asked.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub credential: String,
    pub messages: Vec<Message>,
    pub tools: Vec<String>,
    pub tool_choice: Option<ToolChoice>,
}

#[derive(Default)]
struct BackendState {
    replies: Mutex<VecDeque<Result<Completion, ModelError>>>,
    requests: Mutex<Vec<RecordedRequest>>,
    gate: Option<Gate>,
}

struct Gate {
    entered: Notify,
    release: Notify,
}

/// Backend replying from a script, optionally parking each call on a gate.
#[derive(Clone, Default)]
pub struct ScriptedBackend {
    state: Arc<BackendState>,
}

impl ScriptedBackend {
    pub fn new(replies: Vec<Result<Completion, ModelError>>) -> Self {
        Self {
            state: Arc::new(BackendState {
                replies: Mutex::new(replies.into()),
                ..BackendState::default()
            }),
        }
    }

    /// Every call waits for [`release`](Self::release) after announcing itself.
    pub fn gated(replies: Vec<Result<Completion, ModelError>>) -> Self {
        Self {
            state: Arc::new(BackendState {
                replies: Mutex::new(replies.into()),
                requests: Mutex::default(),
                gate: Some(Gate {
                    entered: Notify::new(),
                    release: Notify::new(),
                }),
            }),
        }
    }

    pub async fn entered(&self) {
        if let Some(gate) = &self.state.gate {
            gate.entered.notified().await;
        }
    }

    pub fn release(&self) {
        if let Some(gate) = &self.state.gate {
            gate.release.notify_one();
        }
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.requests.lock().unwrap().clone()
    }
}

impl Backend for ScriptedBackend {
    async fn complete(&self, request: ModelRequest<'_>) -> Result<Completion, ModelError> {
        self.state.requests.lock().unwrap().push(RecordedRequest {
            credential: request.credential.expose().to_string(),
            messages: request.messages.to_vec(),
            tools: request.tools.iter().map(|t| t.name.clone()).collect(),
            tool_choice: request.tool_choice,
        });

        if let Some(gate) = &self.state.gate {
            gate.entered.notify_one();
            gate.release.notified().await;
        }

        self.state
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ModelError::Api("no scripted reply".to_string())))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tool channel
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Default)]
struct ChannelState {
    label: String,
    tools: Mutex<Vec<ToolDescriptor>>,
    responses: Mutex<HashMap<String, Result<ToolOutput, ToolError>>>,
    calls: Mutex<Vec<(String, Map<String, Value>)>>,
    list_calls: AtomicUsize,
    log: Option<Arc<LaunchLog>>,
}

/// Tool channel with canned responses. Clones share state.
#[derive(Clone, Default)]
pub struct FakeChannel {
    state: Arc<ChannelState>,
}

impl FakeChannel {
    pub fn with_tools(tools: Vec<ToolDescriptor>) -> Self {
        Self {
            state: Arc::new(ChannelState {
                tools: Mutex::new(tools),
                ..ChannelState::default()
            }),
        }
    }

    pub fn set_tools(&self, tools: Vec<ToolDescriptor>) {
        *self.state.tools.lock().unwrap() = tools;
    }

    /// Canned response for every call to `tool`.
    pub fn respond(&self, tool: &str, response: Result<ToolOutput, ToolError>) {
        self.state
            .responses
            .lock()
            .unwrap()
            .insert(tool.to_string(), response);
    }

    pub fn calls(&self) -> Vec<(String, Map<String, Value>)> {
        self.state.calls.lock().unwrap().clone()
    }

    pub fn list_calls(&self) -> usize {
        self.state.list_calls.load(Ordering::SeqCst)
    }
}

impl ToolChannel for FakeChannel {
    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>, ToolError> {
        self.state.list_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.state.tools.lock().unwrap().clone())
    }

    async fn call_tool(
        &self,
        name: &str,
        arguments: Map<String, Value>,
    ) -> Result<ToolOutput, ToolError> {
        self.state
            .calls
            .lock()
            .unwrap()
            .push((name.to_string(), arguments));
        self.state
            .responses
            .lock()
            .unwrap()
            .get(name)
            .cloned()
            .unwrap_or_else(|| Ok(ToolOutput::Text(format!("{name} ok"))))
    }

    async fn close(self) {
        if let Some(log) = &self.state.log {
            log.closed(&self.state.label);
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Launcher
// ─────────────────────────────────────────────────────────────────────────────

/// Ordered spawn/close events plus the number of peers alive at once.
#[derive(Default)]
pub struct LaunchLog {
    events: Mutex<Vec<String>>,
    live: AtomicUsize,
    max_live: AtomicUsize,
}

impl LaunchLog {
    fn spawned(&self, label: &str) {
        self.events.lock().unwrap().push(format!("spawn {label}"));
        let live = self.live.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_live.fetch_max(live, Ordering::SeqCst);
    }

    fn closed(&self, label: &str) {
        self.events.lock().unwrap().push(format!("close {label}"));
        self.live.fetch_sub(1, Ordering::SeqCst);
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    pub fn live(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    pub fn max_live(&self) -> usize {
        self.max_live.load(Ordering::SeqCst)
    }
}

/// Launcher handing out [`FakeChannel`]s.
#[derive(Clone, Default)]
pub struct FakeLauncher {
    pub log: Arc<LaunchLog>,
    tools: Vec<ToolDescriptor>,
    fail_with: Option<ToolError>,
    last: Arc<Mutex<Option<FakeChannel>>>,
}

impl FakeLauncher {
    pub fn with_tools(tools: Vec<ToolDescriptor>) -> Self {
        Self {
            tools,
            ..Self::default()
        }
    }

    pub fn failing(error: ToolError) -> Self {
        Self {
            fail_with: Some(error),
            ..Self::default()
        }
    }

    /// The most recently launched channel.
    pub fn last_channel(&self) -> Option<FakeChannel> {
        self.last.lock().unwrap().clone()
    }
}

impl Launcher for FakeLauncher {
    type Channel = FakeChannel;

    async fn launch(&self, config: ServerConfig) -> Result<FakeChannel, ToolError> {
        if let Some(error) = &self.fail_with {
            return Err(error.clone());
        }

        let label = format!("{} {}", config.command, config.args.join(" "));
        self.log.spawned(&label);

        let channel = FakeChannel {
            state: Arc::new(ChannelState {
                label,
                tools: Mutex::new(self.tools.clone()),
                log: Some(Arc::clone(&self.log)),
                ..ChannelState::default()
            }),
        };
        *self.last.lock().unwrap() = Some(channel.clone());
        Ok(channel)
    }
}
