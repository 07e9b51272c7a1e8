//! Error types for model conversations.

use thiserror::Error;

/// Errors talking to the model.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("model API key not set; set the {0} environment variable")]
    MissingApiKey(String),

    #[error("model request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("model API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("model returned no choices")]
    EmptyResponse,
}
