use crate::error::AgentError;
use crate::protocol::{Message, ModelReply, ToolDefinition};
use async_trait::async_trait;

/// The model, seen as one operation: given the transcript so far and the
/// offered tools, produce either a final answer or tool invocations.
#[async_trait]
pub trait Converse: Send + Sync {
    async fn converse(
        &self,
        transcript: &[Message],
        tools: &[ToolDefinition],
    ) -> Result<ModelReply, AgentError>;
}
