//! Tool execution and MCP integration.

mod channel;
pub mod errors;
mod mcp_host;
pub mod registry;
mod types;

pub use channel::{Launcher, ToolChannel};
pub use errors::ToolError;
pub use mcp_host::{McpChannel, McpLauncher};
pub use types::{ToolDescriptor, ToolOutput};
