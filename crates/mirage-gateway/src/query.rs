//! Statement requests and structured results exchanged with the model.

use crate::error::{ErrorKind, GatewayError};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One statement submitted through the gateway.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryRequest {
    pub statement: String,
    /// Positional values for `$1`, `$2`, ... placeholders.
    pub parameters: Vec<Value>,
    /// The caller's claim that the statement only reads.
    pub declared_read_only: bool,
}

impl QueryRequest {
    pub fn new(statement: impl Into<String>) -> Self {
        Self {
            statement: statement.into(),
            parameters: Vec::new(),
            declared_read_only: true,
        }
    }

    pub fn with_parameters(mut self, parameters: Vec<Value>) -> Self {
        self.parameters = parameters;
        self
    }

    pub fn read_only(mut self, read_only: bool) -> Self {
        self.declared_read_only = read_only;
        self
    }
}

/// Raw output of a backend execution.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryOutcome {
    /// Rows as column-name keyed objects, when the statement produced a result set.
    pub rows: Option<Vec<Map<String, Value>>>,
    /// Rows returned, or rows affected for statements without a result set.
    pub row_count: u64,
}

impl QueryOutcome {
    pub fn with_rows(rows: Vec<Map<String, Value>>) -> Self {
        let row_count = rows.len() as u64;
        Self {
            rows: Some(rows),
            row_count,
        }
    }

    pub fn affected(row_count: u64) -> Self {
        Self {
            rows: None,
            row_count,
        }
    }
}

/// Structured result handed back to the model as a tool result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum QueryResult {
    Success {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        rows: Option<Vec<Map<String, Value>>>,
        #[serde(rename = "rowCount")]
        row_count: u64,
    },
    Error {
        kind: ErrorKind,
        error: String,
        detail: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        statement: Option<String>,
    },
}

impl QueryResult {
    pub fn is_success(&self) -> bool {
        matches!(self, QueryResult::Success { .. })
    }

    /// The failure category, if this is an error result.
    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            QueryResult::Error { kind, .. } => Some(*kind),
            QueryResult::Success { .. } => None,
        }
    }

    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

impl From<QueryOutcome> for QueryResult {
    fn from(outcome: QueryOutcome) -> Self {
        QueryResult::Success {
            rows: outcome.rows,
            row_count: outcome.row_count,
        }
    }
}

impl From<GatewayError> for QueryResult {
    fn from(err: GatewayError) -> Self {
        QueryResult::Error {
            kind: err.kind(),
            error: err.summary().to_string(),
            detail: err.detail(),
            statement: err.statement().map(str::to_string),
        }
    }
}
