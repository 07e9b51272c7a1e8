//! The `query` tool offered to the model.

use crate::protocol::ToolDefinition;
use mirage_gateway::QueryRequest;
use serde::Deserialize;
use serde_json::{Value, json};

pub const QUERY_TOOL: &str = "query";

/// Definition of the single tool the model may call.
pub fn query_tool() -> ToolDefinition {
    ToolDefinition::function(
        QUERY_TOOL,
        "Execute a SQL statement against the database",
        json!({
            "type": "object",
            "properties": {
                "statement": {
                    "type": "string",
                    "description": "The SQL statement to execute, with $1, $2, ... placeholders"
                },
                "parameters": {
                    "type": "array",
                    "description": "Positional values for the placeholders, as strings",
                    "items": {"type": "string"}
                },
                "readOnly": {
                    "type": "boolean",
                    "description": "true for statements that only read; false for statements that modify data or schema",
                    "default": true
                }
            },
            "required": ["statement"]
        }),
    )
}

#[derive(Debug, Deserialize)]
struct QueryArguments {
    #[serde(alias = "query")]
    statement: String,
    #[serde(default, alias = "params")]
    parameters: Option<Vec<Value>>,
    #[serde(default, rename = "readOnly", alias = "read_only")]
    read_only: Option<bool>,
}

/// Parse the JSON text of a `query` invocation into a gateway request.
pub fn parse_query_arguments(arguments: &str) -> Result<QueryRequest, String> {
    let raw = if arguments.trim().is_empty() { "{}" } else { arguments };
    let args: QueryArguments =
        serde_json::from_str(raw).map_err(|e| format!("invalid arguments: {}", e))?;

    if args.statement.trim().is_empty() {
        return Err("invalid arguments: statement must not be empty".to_string());
    }

    Ok(QueryRequest::new(args.statement)
        .with_parameters(args.parameters.unwrap_or_default())
        .read_only(args.read_only.unwrap_or(true)))
}
