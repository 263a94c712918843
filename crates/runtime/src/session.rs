//! Session management.
//!
//! A [`Session`] owns the credential, at most one live tool channel and the
//! conversation. It is the only place where the channel is replaced.
//!
//! Turns never overlap: [`Session::submit`] takes `&mut self`, and
//! [`SessionHandle`] serializes (or rejects) concurrent submissions for
//! callers that share a session.

use std::path::Path;
use std::sync::Arc;

use mcp::LaunchTable;
use tokio::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

use crate::conversation::{Conversation, DisplayMessage};
use crate::model::{Backend, Credential};
use crate::orchestrator::Turn;
use crate::tools::{Launcher, ToolChannel, ToolDescriptor, registry};
use crate::{Error, Result};

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are an assistant that can respond to the user \
queries and if required, use the available tools to help answer questions.";

/// Reply shown when a message arrives before a credential is configured.
pub const CREDENTIAL_MISSING_REPLY: &str = "Please set your API key first.";

/// Reply shown when a message arrives before a tool server is connected.
pub const NOT_CONNECTED_REPLY: &str = "Please connect to an MCP server first.";

/// Result of a submitted message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    /// Full display transcript after the turn.
    pub transcript: Vec<DisplayMessage>,
    /// The caller should clear its input field.
    pub clear_input: bool,
}

/// A conversation session.
pub struct Session<B, L: Launcher> {
    id: Uuid,
    backend: B,
    launcher: L,
    launch_table: LaunchTable,
    system_prompt: String,
    credential: Option<Credential>,
    channel: Option<L::Channel>,
    conversation: Conversation,
}

impl<B: Backend, L: Launcher> Session<B, L> {
    /// Create a new session with no credential and no channel.
    pub fn new(backend: B, launcher: L) -> Self {
        Self {
            id: Uuid::new_v4(),
            backend,
            launcher,
            launch_table: LaunchTable::default(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            credential: None,
            channel: None,
            conversation: Conversation::new(),
        }
    }

    /// Set the system prompt.
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    /// Set the extension → launcher mapping used by [`connect`](Self::connect).
    pub fn with_launch_table(mut self, table: LaunchTable) -> Self {
        self.launch_table = table;
        self
    }

    /// Start with a credential (blank keys are ignored).
    pub fn with_credential(mut self, key: impl Into<String>) -> Self {
        self.credential = Credential::new(key);
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    // --- Credential ---

    /// Set or replace the credential. A blank key unsets it.
    pub fn set_credential(&mut self, key: impl Into<String>) -> String {
        self.credential = Credential::new(key);
        if self.credential.is_some() {
            info!(session = %self.id, "credential updated");
            "API key set successfully".to_string()
        } else {
            self.credential_status().to_string()
        }
    }

    pub fn has_credential(&self) -> bool {
        self.credential.is_some()
    }

    pub fn credential_status(&self) -> &'static str {
        if self.has_credential() {
            "API key is set"
        } else {
            "API key is not set"
        }
    }

    // --- Channel lifecycle ---

    pub fn is_connected(&self) -> bool {
        self.channel.is_some()
    }

    /// Connect to the server script at `path` and report the outcome as
    /// display text. Never fails.
    pub async fn connect(&mut self, path: &str) -> String {
        match self.try_connect(path).await {
            Ok(tools) if tools.is_empty() => "Connected to server with no tools".to_string(),
            Ok(tools) => {
                let names: Vec<_> = tools.iter().map(|t| t.name.as_str()).collect();
                format!("Connected to server with tools: {}", names.join(", "))
            }
            Err(e) => {
                warn!(session = %self.id, path, error = %e, "connect failed");
                format!("Error: {e}")
            }
        }
    }

    /// Connect to the server script at `path`, returning its tools.
    ///
    /// The script is validated before anything else happens, so a rejected
    /// path leaves the current channel untouched. Otherwise the current
    /// channel is closed before the new peer is spawned.
    pub async fn try_connect(&mut self, path: &str) -> Result<Vec<ToolDescriptor>> {
        let config = self
            .launch_table
            .resolve(Path::new(path))
            .map_err(|e| match e {
                mcp::Error::UnsupportedScript { path, allowed } => Error::UnsupportedScript {
                    path: path.display().to_string(),
                    allowed,
                },
                other => Error::Connection(other.to_string()),
            })?;

        self.disconnect().await;

        info!(session = %self.id, path, command = %config.command, "connecting to tool server");
        let channel = self
            .launcher
            .launch(config)
            .await
            .map_err(|e| Error::Connection(e.to_string()))?;

        let tools = match registry::list_tools(Some(&channel)).await {
            Ok(tools) => tools,
            Err(e) => {
                channel.close().await;
                return Err(Error::Connection(e.to_string()));
            }
        };

        info!(session = %self.id, tools = tools.len(), "connected");
        self.channel = Some(channel);
        Ok(tools)
    }

    /// Close the current channel, if any. Idempotent.
    pub async fn disconnect(&mut self) {
        if let Some(channel) = self.channel.take() {
            info!(session = %self.id, "closing tool channel");
            channel.close().await;
        }
    }

    /// Tools of the connected peer, fetched fresh.
    pub async fn list_tools(&self) -> Result<Vec<ToolDescriptor>> {
        registry::list_tools(self.channel.as_ref()).await
    }

    // --- Conversation ---

    /// Run one turn for `input`.
    ///
    /// Without a credential or a channel the turn ends immediately with an
    /// instructional reply and no completion is requested. Faults propagate
    /// after the entries produced so far have been kept in the transcript.
    pub async fn submit(&mut self, input: &str) -> Result<Submission> {
        let ready = match (&self.credential, &self.channel) {
            (None, _) => Err(Error::CredentialMissing),
            (Some(_), None) => Err(Error::ChannelNotConnected),
            (Some(credential), Some(channel)) => Ok((credential, channel)),
        };

        match ready {
            Ok((credential, channel)) => {
                Turn {
                    backend: &self.backend,
                    channel,
                    credential,
                    system_prompt: &self.system_prompt,
                    conversation: &mut self.conversation,
                }
                .run(input)
                .await?;
            }
            Err(e) => {
                let reply = match e {
                    Error::CredentialMissing => CREDENTIAL_MISSING_REPLY,
                    _ => NOT_CONNECTED_REPLY,
                };
                info!(session = %self.id, reason = %e, "turn short-circuited");
                self.conversation.push(DisplayMessage::user(input));
                self.conversation.push(DisplayMessage::assistant(reply));
            }
        }

        Ok(Submission {
            transcript: self.conversation.transcript().to_vec(),
            clear_input: true,
        })
    }

    pub fn transcript(&self) -> &[DisplayMessage] {
        self.conversation.transcript()
    }

    /// Adopt a transcript kept by the caller (e.g. a UI that owns history).
    pub fn replace_transcript(&mut self, transcript: Vec<DisplayMessage>) {
        self.conversation = Conversation::from_transcript(transcript);
    }

    /// Empty the conversation. Credential and channel are kept.
    pub fn clear(&mut self) -> Vec<DisplayMessage> {
        self.conversation.clear();
        Vec::new()
    }

    /// End the session, terminating the peer.
    pub async fn shutdown(mut self) {
        self.disconnect().await;
    }
}

/// Shared, cloneable access to a [`Session`] with a one-turn-at-a-time
/// guarantee.
pub struct SessionHandle<B, L: Launcher> {
    inner: Arc<Mutex<Session<B, L>>>,
}

impl<B, L: Launcher> Clone for SessionHandle<B, L> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<B: Backend, L: Launcher> SessionHandle<B, L> {
    pub fn new(session: Session<B, L>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(session)),
        }
    }

    /// Submit a message, waiting for any running turn to finish first.
    pub async fn submit(&self, input: &str) -> Result<Submission> {
        self.inner.lock().await.submit(input).await
    }

    /// Submit a message, or fail with [`Error::TurnInProgress`] if a turn is
    /// already running.
    pub async fn try_submit(&self, input: &str) -> Result<Submission> {
        let mut session = self.inner.try_lock().map_err(|_| Error::TurnInProgress)?;
        session.submit(input).await
    }

    pub async fn set_credential(&self, key: impl Into<String>) -> String {
        self.inner.lock().await.set_credential(key)
    }

    pub async fn credential_status(&self) -> &'static str {
        self.inner.lock().await.credential_status()
    }

    pub async fn connect(&self, path: &str) -> String {
        self.inner.lock().await.connect(path).await
    }

    pub async fn is_connected(&self) -> bool {
        self.inner.lock().await.is_connected()
    }

    pub async fn list_tools(&self) -> Result<Vec<ToolDescriptor>> {
        self.inner.lock().await.list_tools().await
    }

    pub async fn transcript(&self) -> Vec<DisplayMessage> {
        self.inner.lock().await.transcript().to_vec()
    }

    pub async fn clear(&self) -> Vec<DisplayMessage> {
        self.inner.lock().await.clear()
    }

    pub async fn disconnect(&self) {
        self.inner.lock().await.disconnect().await;
    }
}
