//! MCP-backed tool channel.

use super::{Launcher, ToolChannel, ToolDescriptor, ToolError, ToolOutput};
use mcp::{Server, ServerConfig};
use serde_json::{Map, Value};
use tracing::{info, warn};

/// Tool channel backed by an MCP server subprocess.
pub struct McpChannel {
    server: Server,
}

impl McpChannel {
    /// Name and version the server reported during the handshake.
    pub fn server_info(&self) -> Option<&mcp::Implementation> {
        self.server.server_info().map(|info| &info.server_info)
    }

    /// OS process id of the server.
    pub fn pid(&self) -> Option<u32> {
        self.server.pid()
    }
}

impl ToolChannel for McpChannel {
    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>, ToolError> {
        let tools = self
            .server
            .list_tools()
            .await
            .map_err(|e| ToolError::Channel(e.to_string()))?;
        Ok(tools.into_iter().map(ToolDescriptor::from).collect())
    }

    async fn call_tool(
        &self,
        name: &str,
        arguments: Map<String, Value>,
    ) -> Result<ToolOutput, ToolError> {
        let result = self
            .server
            .call_tool(name, arguments)
            .await
            .map_err(|e| ToolError::Execution(e.to_string()))?;
        Ok(ToolOutput::from(result))
    }

    async fn close(self) {
        let name = self.server.name().to_string();
        if let Err(e) = self.server.shutdown().await {
            warn!(server = %name, error = %e, "error while closing mcp server");
        }
    }
}

/// Launches MCP servers as child processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct McpLauncher;

impl Launcher for McpLauncher {
    type Channel = McpChannel;

    async fn launch(&self, config: ServerConfig) -> Result<McpChannel, ToolError> {
        let name = config.name.clone();
        let mut server = Server::spawn(config)
            .await
            .map_err(|e| ToolError::Launch(format!("failed to spawn MCP server {name}: {e}")))?;

        if let Err(e) = server.initialize().await {
            if let Err(close_err) = server.shutdown().await {
                warn!(server = %name, error = %close_err, "failed to reap server after handshake error");
            }
            return Err(ToolError::Launch(format!(
                "failed to initialize MCP server {name}: {e}"
            )));
        }

        let channel = McpChannel { server };
        if let Some(info) = channel.server_info() {
            info!(server = %name, peer = %info.name, pid = channel.pid(), "connected to mcp server");
        }
        Ok(channel)
    }
}
