//! Parley runtime: chat sessions with tool-calling over MCP.
//!
//! This crate ties an OpenAI-compatible chat backend to a single MCP tool
//! server and runs the two-completion tool loop on behalf of a user.
//!
//! # Overview
//!
//! - **Session**: owns the credential, the live tool channel and the
//!   conversation. At most one turn runs at a time.
//! - **Backend**: a trait abstracting chat-completion providers.
//! - **ToolChannel / Launcher**: traits for the connection to a tool server
//!   and for starting one. [`McpLauncher`] spawns script servers over stdio.
//!
//! # Example
//!
//! ```no_run
//! use runtime::{McpLauncher, OpenAiBackend, Session};
//!
//! # async fn example() -> runtime::Result<()> {
//! let backend = OpenAiBackend::builder("llama-3.3-70b-versatile").build();
//! let mut session = Session::new(backend, McpLauncher).with_credential("gsk_...");
//!
//! println!("{}", session.connect("servers/news.py").await);
//! let submission = session.submit("What's the latest news?").await?;
//! for entry in &submission.transcript {
//!     println!("{:?}: {}", entry.role, entry.content);
//! }
//! session.shutdown().await;
//! # Ok(())
//! # }
//! ```

mod conversation;
mod error;
pub mod model;
mod orchestrator;
pub mod providers;
mod session;
pub mod tools;

#[cfg(test)]
mod testing;

pub use conversation::{Conversation, DisplayMessage, Metadata, Status};
pub use error::{Error, Result};
pub use model::{Backend, Credential, ModelError, Role};
pub use providers::{OpenAiBackend, OpenAiBackendBuilder};
pub use session::{
    CREDENTIAL_MISSING_REPLY, DEFAULT_SYSTEM_PROMPT, NOT_CONNECTED_REPLY, Session,
    SessionHandle, Submission,
};
pub use tools::{Launcher, McpChannel, McpLauncher, ToolChannel, ToolDescriptor, ToolOutput};

// Re-export mcp types callers need to configure launchers.
pub use mcp::{LaunchTable, ServerConfig};
