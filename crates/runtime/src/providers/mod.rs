//! LLM provider adapters.
//!
//! Each provider implements [`Backend`](crate::model::Backend) for its
//! specific API.

mod openai;

pub use openai::{DEFAULT_API_BASE, DEFAULT_MAX_OUTPUT_TOKENS, OpenAiBackend, OpenAiBackendBuilder};
