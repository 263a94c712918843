//! Tool channel and launcher traits.

use crate::tools::{ToolDescriptor, ToolError, ToolOutput};
use mcp::ServerConfig;
use serde_json::{Map, Value};
use std::future::Future;

/// A live connection to a tool-executing peer.
///
/// This is the boundary between the orchestration loop and side effects.
pub trait ToolChannel: Send + Sync {
    /// Current tool list, fetched from the peer on every call.
    fn list_tools(&self) -> impl Future<Output = Result<Vec<ToolDescriptor>, ToolError>> + Send;

    /// Execute a tool. Arguments are forwarded without local validation.
    fn call_tool(
        &self,
        name: &str,
        arguments: Map<String, Value>,
    ) -> impl Future<Output = Result<ToolOutput, ToolError>> + Send;

    /// Release the peer. Must not return before the peer is gone.
    fn close(self) -> impl Future<Output = ()> + Send
    where
        Self: Sized;
}

/// Spawns peers and performs their handshake.
pub trait Launcher: Send + Sync {
    type Channel: ToolChannel;

    /// Start the peer described by `config`. A failed launch must not leave
    /// a process behind.
    fn launch(
        &self,
        config: ServerConfig,
    ) -> impl Future<Output = Result<Self::Channel, ToolError>> + Send;
}
