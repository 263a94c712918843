//! MCP server management (spawn, communicate, lifecycle).

use std::collections::HashMap;
use std::process::Stdio;
use std::time::Duration;

use serde_json::{Map, Value};
use tokio::io::BufReader;
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::peer::Peer;
use crate::protocol::{CallToolResult, InitializeResult, Tool};

/// Configuration for an MCP server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub name: String,
    pub command: String,
    pub args: Vec<String>,
    pub env: HashMap<String, String>,
    /// Per-request limit. `None` waits for as long as the server takes.
    pub timeout: Option<Duration>,
}

/// Handle to a running MCP server.
///
/// The child process is killed when the handle is shut down or dropped.
pub struct Server {
    config: ServerConfig,
    process: Mutex<Child>,
    pid: Option<u32>,
    peer: Peer<BufReader<ChildStdout>, ChildStdin>,
    info: Option<InitializeResult>,
}

impl Server {
    /// Spawn a new MCP server process.
    pub async fn spawn(config: ServerConfig) -> Result<Self> {
        let mut cmd = Command::new(&config.command);
        cmd.args(&config.args)
            .envs(&config.env)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);

        let mut process = cmd.spawn().map_err(Error::Spawn)?;
        let pid = process.id();

        let stdin = process
            .stdin
            .take()
            .ok_or_else(|| Error::Spawn(std::io::Error::other("failed to capture stdin")))?;

        let stdout = process
            .stdout
            .take()
            .ok_or_else(|| Error::Spawn(std::io::Error::other("failed to capture stdout")))?;

        info!(
            server = %config.name,
            command = %config.command,
            pid,
            "spawned mcp server"
        );

        let peer = Peer::new(BufReader::new(stdout), stdin).with_timeout(config.timeout);

        Ok(Self {
            config,
            process: Mutex::new(process),
            pid,
            peer,
            info: None,
        })
    }

    /// Get the server name.
    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Initialize the server (must be called before other operations).
    pub async fn initialize(&mut self) -> Result<&InitializeResult> {
        let result = self.peer.initialize().await?;
        Ok(self.info.insert(result))
    }

    /// Check if the server is initialized.
    pub fn is_initialized(&self) -> bool {
        self.peer.is_initialized()
    }

    /// Handshake result (after initialization).
    pub fn server_info(&self) -> Option<&InitializeResult> {
        self.info.as_ref()
    }

    /// Get the list of available tools, fresh from the server.
    pub async fn list_tools(&self) -> Result<Vec<Tool>> {
        self.peer.list_tools().await
    }

    /// Call a tool by name.
    pub async fn call_tool(
        &self,
        name: &str,
        arguments: Map<String, Value>,
    ) -> Result<CallToolResult> {
        debug!(server = %self.config.name, tool = name, "calling tool");
        self.peer.call_tool(name, arguments).await
    }

    /// OS process id, as reported at spawn time.
    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Terminate the server process and wait for it to exit.
    pub async fn shutdown(self) -> Result<()> {
        let mut process = self.process.into_inner();
        if let Ok(Some(status)) = process.try_wait() {
            debug!(server = %self.config.name, %status, "mcp server already exited");
            return Ok(());
        }

        if let Err(e) = process.kill().await {
            warn!(server = %self.config.name, error = %e, "failed to kill mcp server");
            return Err(Error::Io(e));
        }

        info!(server = %self.config.name, pid = self.pid, "mcp server terminated");
        Ok(())
    }
}
