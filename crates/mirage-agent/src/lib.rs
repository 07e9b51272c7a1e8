//! # mirage-agent
//!
//! Runs the conversation that stands in for an endpoint's implementation:
//! the model receives the endpoint description and request input, may call
//! the `query` tool any number of times within a turn budget, and finally
//! answers with the JSON body to return.

pub mod converse;
pub mod error;
pub mod finalize;
pub mod openai;
pub mod orchestrator;
pub mod prompt;
pub mod protocol;
pub mod tool;

pub use converse::Converse;
pub use error::AgentError;
pub use finalize::finalize;
pub use openai::OpenAiChat;
pub use orchestrator::{DEFAULT_MAX_TURNS, LIMIT_REACHED_MESSAGE, Orchestrator, Outcome};
pub use protocol::{FunctionCall, FunctionDefinition, Message, ModelReply, ToolCall, ToolDefinition};
