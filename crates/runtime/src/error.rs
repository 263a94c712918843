use thiserror::Error;

use crate::model::ModelError;

#[derive(Debug, Error)]
pub enum Error {
    #[error("no API key configured")]
    CredentialMissing,

    #[error("no tool server connected")]
    ChannelNotConnected,

    #[error("server script must end in one of {allowed:?}: {path}")]
    UnsupportedScript { path: String, allowed: Vec<String> },

    #[error("connection failed: {0}")]
    Connection(String),

    #[error("tool channel error: {0}")]
    Channel(String),

    #[error("tool {tool} failed: {message}")]
    ToolExecution { tool: String, message: String },

    #[error("model error: {0}")]
    Model(#[from] ModelError),

    #[error("a turn is already in progress")]
    TurnInProgress,
}

pub type Result<T> = std::result::Result<T, Error>;
