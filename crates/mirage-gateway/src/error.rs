//! Error types for the gateway crate.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Failure categories reported back to the model as structured tool results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    /// A credential variable is unset or empty.
    MissingCredential,
    /// The store could not be reached within the connect timeout.
    ConnectionFailed,
    /// The operator refused a modifying statement.
    NotAuthorized,
    /// The store rejected the statement or failed while running it.
    QueryExecutionFailed,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::MissingCredential => "MissingCredential",
            ErrorKind::ConnectionFailed => "ConnectionFailed",
            ErrorKind::NotAuthorized => "NotAuthorized",
            ErrorKind::QueryExecutionFailed => "QueryExecutionFailed",
        };
        f.write_str(s)
    }
}

/// Errors that can occur while gating or executing a statement.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// A credential variable is unset or empty.
    #[error("database {what} not set; set the {variable} environment variable")]
    MissingCredential { what: &'static str, variable: String },

    /// Connecting to the store failed or timed out.
    #[error("database connection failed: {0}")]
    ConnectionFailed(String),

    /// The operator denied the statement.
    #[error("operation not authorized by user")]
    NotAuthorized,

    /// Execution failed after the connection was established.
    #[error("query execution failed: {detail}")]
    ExecutionFailed { statement: String, detail: String },
}

impl GatewayError {
    /// The failure category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            GatewayError::MissingCredential { .. } => ErrorKind::MissingCredential,
            GatewayError::ConnectionFailed(_) => ErrorKind::ConnectionFailed,
            GatewayError::NotAuthorized => ErrorKind::NotAuthorized,
            GatewayError::ExecutionFailed { .. } => ErrorKind::QueryExecutionFailed,
        }
    }

    /// Short, stable summary of the failure.
    pub fn summary(&self) -> &'static str {
        match self {
            GatewayError::MissingCredential { what: "password", .. } => "Database password not set",
            GatewayError::MissingCredential { .. } => "Database user not set",
            GatewayError::ConnectionFailed(_) => "Database connection failed",
            GatewayError::NotAuthorized => "Operation not authorized by user",
            GatewayError::ExecutionFailed { .. } => "Query execution failed",
        }
    }

    /// Diagnostic detail for the model.
    pub fn detail(&self) -> String {
        match self {
            GatewayError::MissingCredential { variable, .. } => {
                format!("Please set {} environment variable", variable)
            }
            GatewayError::ConnectionFailed(detail) => detail.clone(),
            GatewayError::NotAuthorized => {
                "The operator declined to run this modifying statement".to_string()
            }
            GatewayError::ExecutionFailed { detail, .. } => detail.clone(),
        }
    }

    /// The statement that failed, when known.
    pub fn statement(&self) -> Option<&str> {
        match self {
            GatewayError::ExecutionFailed { statement, .. } => Some(statement),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_mapping() {
        let missing = GatewayError::MissingCredential {
            what: "password",
            variable: "DB_PASSWORD".to_string(),
        };
        assert_eq!(missing.kind(), ErrorKind::MissingCredential);
        assert_eq!(missing.summary(), "Database password not set");
        assert!(missing.detail().contains("DB_PASSWORD"));

        let failed = GatewayError::ExecutionFailed {
            statement: "select nope".to_string(),
            detail: "column \"nope\" does not exist".to_string(),
        };
        assert_eq!(failed.kind(), ErrorKind::QueryExecutionFailed);
        assert_eq!(failed.statement(), Some("select nope"));
    }

    #[test]
    fn test_kind_serializes_by_name() {
        let json = serde_json::to_string(&ErrorKind::NotAuthorized).unwrap();
        assert_eq!(json, "\"NotAuthorized\"");
        assert_eq!(ErrorKind::ConnectionFailed.to_string(), "ConnectionFailed");
    }
}
