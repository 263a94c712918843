use thiserror::Error;

/// Errors raised by a tool channel.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ToolError {
    /// The peer could not be spawned or the handshake failed.
    #[error("launch failed: {0}")]
    Launch(String),
    /// The peer broke the protocol or went away.
    #[error("channel: {0}")]
    Channel(String),
    /// The peer reported a failure for this call.
    #[error("execution failed: {0}")]
    Execution(String),
}
