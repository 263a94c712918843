//! MCP (Model Context Protocol) client library.
//!
//! This crate talks to tool servers over stdio: a child process speaking
//! newline-delimited JSON-RPC 2.0. The framing lives in [`codec`], the
//! request/response session in [`Peer`] (usable over any async byte stream)
//! and process lifecycle in [`Server`]. [`LaunchTable`] decides which
//! interpreter runs a given server script.
//!
//! # Example
//!
//! ```no_run
//! use mcp::{LaunchTable, Server};
//! use std::path::Path;
//!
//! # async fn example() -> mcp::Result<()> {
//! let config = LaunchTable::default().resolve(Path::new("news.py"))?;
//!
//! let mut server = Server::spawn(config).await?;
//! server.initialize().await?;
//!
//! for tool in server.list_tools().await? {
//!     println!("Tool: {}", tool.name);
//! }
//!
//! let args = serde_json::json!({ "news_type": "latest" });
//! let result = server
//!     .call_tool("get_news", args.as_object().cloned().unwrap_or_default())
//!     .await?;
//! println!("{}", result.text());
//!
//! server.shutdown().await?;
//! # Ok(())
//! # }
//! ```

pub mod codec;
mod error;
mod launcher;
mod peer;
mod protocol;
mod server;

pub use error::{Error, Result};
pub use launcher::LaunchTable;
pub use peer::Peer;
pub use protocol::{
    CallToolContent, CallToolResult, Implementation, InitializeResult, JsonRpcError, Tool,
    ToolContent,
};
pub use server::{Server, ServerConfig};
