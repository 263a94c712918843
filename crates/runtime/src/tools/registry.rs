//! Tool registry adapter: fetches the peer's tools and exposes them to the
//! model as function specs.

use super::{ToolChannel, ToolDescriptor};
use crate::model::ToolSpec;
use crate::{Error, Result};

/// Query the connected peer for its tools. Never cached.
pub async fn list_tools<C: ToolChannel>(channel: Option<&C>) -> Result<Vec<ToolDescriptor>> {
    let channel = channel.ok_or(Error::ChannelNotConnected)?;
    channel
        .list_tools()
        .await
        .map_err(|e| Error::Channel(e.to_string()))
}

/// Convert descriptors into model-facing function specs, in order.
pub fn to_specs(tools: &[ToolDescriptor]) -> Vec<ToolSpec> {
    tools.iter().map(ToolSpec::from).collect()
}

/// Fetch and convert in one step.
pub async fn available_specs<C: ToolChannel>(channel: Option<&C>) -> Result<Vec<ToolSpec>> {
    let tools = list_tools(channel).await?;
    Ok(to_specs(&tools))
}
