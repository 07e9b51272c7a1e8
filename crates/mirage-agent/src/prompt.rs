//! Instruction builders for the opening turn of a conversation.

use mirage_core::{EndpointDefinition, SchemaSnapshot};
use serde_json::{Map, Value};

/// System instruction describing the endpoint the model is standing in for.
pub fn system_instruction(endpoint: &EndpointDefinition, schema: &SchemaSnapshot) -> String {
    let implementation = if endpoint.implementation.trim().is_empty() {
        "(none given; infer the behavior from the description)"
    } else {
        endpoint.implementation.trim()
    };

    format!(
        r#"You are an API server implementing the following endpoint:

Method: {method}
Path: {path}
Description: {description}

Implementation steps:
{implementation}

Database schema:
{schema}

Use the `query` tool whenever you need data from the database or need to change it.
Write PostgreSQL. Pass values through `parameters` and refer to them as $1, $2, ...
in the statement; never splice request values into the statement text. Add an
explicit cast (for example $1::date) when a placeholder's type would be ambiguous.
Set `readOnly` to false for statements that modify data or schema.

Rules:
1. Your final response MUST be a single valid JSON value; it is returned to the caller verbatim.
2. Follow the response shape described in the implementation steps.
3. Only include fields the implementation steps call for.
4. Report failures inside the JSON with a status field instead of inventing data."#,
        method = endpoint.method,
        path = endpoint.path,
        description = endpoint.description,
        implementation = implementation,
        schema = schema.to_pretty_json(),
    )
}

/// User instruction carrying the normalized request input.
pub fn user_instruction(input: &Map<String, Value>) -> String {
    let data = serde_json::to_string_pretty(input).unwrap_or_else(|_| "{}".to_string());
    format!(
        r#"Process this API request.

Request data:
{data}

Respond with ONLY the JSON that should be returned to the client, without explanations or markdown."#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use mirage_core::{ColumnInfo, HttpMethod, TableInfo};
    use serde_json::json;

    #[test]
    fn test_system_instruction_mentions_endpoint_and_schema() {
        let endpoint = EndpointDefinition::new(
            "items_id",
            HttpMethod::Get,
            "/items/{id}",
            "Fetch one item",
            "Select the item by id",
        );
        let mut schema = SchemaSnapshot::new();
        schema.insert_table(
            "public",
            "items",
            TableInfo {
                columns: vec![ColumnInfo {
                    name: "id".to_string(),
                    data_type: "integer".to_string(),
                    nullable: false,
                }],
                ..Default::default()
            },
        );

        let text = system_instruction(&endpoint, &schema);
        assert!(text.contains("Method: GET"));
        assert!(text.contains("Path: /items/{id}"));
        assert!(text.contains("Select the item by id"));
        assert!(text.contains("\"items\""));
    }

    #[test]
    fn test_empty_implementation_is_called_out() {
        let endpoint = EndpointDefinition::new("ping", HttpMethod::Get, "/ping", "Health", "");
        assert!(system_instruction(&endpoint, &SchemaSnapshot::new()).contains("(none given"));
    }

    #[test]
    fn test_user_instruction_carries_input() {
        let mut input = Map::new();
        input.insert("id".to_string(), json!("42"));
        assert!(user_instruction(&input).contains("\"id\": \"42\""));
    }
}
