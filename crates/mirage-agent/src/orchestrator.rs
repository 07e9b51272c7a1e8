//! Bounded conversation loop between the model and the query gateway.

use crate::converse::Converse;
use crate::error::AgentError;
use crate::finalize::finalize;
use crate::prompt::{system_instruction, user_instruction};
use crate::protocol::{Message, ModelReply, ToolCall};
use crate::tool::{QUERY_TOOL, parse_query_arguments, query_tool};
use mirage_core::{EndpointDefinition, SchemaSnapshot};
use mirage_gateway::QueryGateway;
use serde_json::{Map, Value, json};
use std::sync::Arc;

pub const DEFAULT_MAX_TURNS: usize = 10;

pub const LIMIT_REACHED_MESSAGE: &str =
    "Processing limit reached without generating a final response";

/// Terminal state of one orchestration.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// The model stopped calling tools; its content, finalized to JSON.
    Answer(Value),
    /// The turn budget ran out while the model was still calling tools.
    LimitReached { turns: usize },
}

impl Outcome {
    /// The JSON body reported to the caller.
    pub fn into_json(self) -> Value {
        match self {
            Outcome::Answer(value) => value,
            Outcome::LimitReached { .. } => json!({
                "status": "error",
                "error": LIMIT_REACHED_MESSAGE,
            }),
        }
    }
}

/// Drives the conversation for one request at a time.
///
/// Holds no per-request state; one instance is shared by every request.
pub struct Orchestrator {
    converse: Arc<dyn Converse>,
    gateway: Arc<QueryGateway>,
    schema: SchemaSnapshot,
    max_turns: usize,
}

impl Orchestrator {
    pub fn new(converse: Arc<dyn Converse>, gateway: Arc<QueryGateway>, schema: SchemaSnapshot) -> Self {
        Self {
            converse,
            gateway,
            schema,
            max_turns: DEFAULT_MAX_TURNS,
        }
    }

    pub fn with_max_turns(mut self, max_turns: usize) -> Self {
        self.max_turns = max_turns;
        self
    }

    pub fn max_turns(&self) -> usize {
        self.max_turns
    }

    /// Run the conversation for one request.
    ///
    /// Only a failure to reach the model is an error; statement failures are
    /// fed back to the model as tool results.
    pub async fn run(
        &self,
        endpoint: &EndpointDefinition,
        input: &Map<String, Value>,
    ) -> Result<Outcome, AgentError> {
        let mut transcript = vec![
            Message::system(system_instruction(endpoint, &self.schema)),
            Message::user(user_instruction(input)),
        ];
        let tools = [query_tool()];

        for turn in 0..self.max_turns {
            match self.converse.converse(&transcript, &tools).await? {
                ModelReply::Final(content) => {
                    tracing::debug!(turn, "Model produced a final answer");
                    return Ok(Outcome::Answer(finalize(&content)));
                }
                ModelReply::ToolCalls { content, calls } => {
                    tracing::debug!(turn, calls = calls.len(), "Model requested tool calls");

                    let mut results = Vec::with_capacity(calls.len());
                    // Sequential, in emission order.
                    for call in &calls {
                        let result = self.dispatch(call).await;
                        results.push(Message::tool_result(&call.id, result.to_string()));
                    }

                    transcript.push(Message::assistant_tool_calls(content, calls));
                    transcript.extend(results);
                }
            }
        }

        tracing::warn!(max_turns = self.max_turns, "Turn budget exhausted");
        Ok(Outcome::LimitReached {
            turns: self.max_turns,
        })
    }

    async fn dispatch(&self, call: &ToolCall) -> Value {
        if call.function.name != QUERY_TOOL {
            tracing::warn!(tool = %call.function.name, "Model called an unknown tool");
            return tool_error(format!("Unknown tool '{}'", call.function.name));
        }

        match parse_query_arguments(&call.function.arguments) {
            Ok(request) => {
                tracing::debug!(
                    statement = %request.statement,
                    read_only = request.declared_read_only,
                    "Running query tool"
                );
                self.gateway.execute(&request).await.to_json()
            }
            Err(e) => tool_error(e),
        }
    }
}

fn tool_error(message: String) -> Value {
    json!({"status": "error", "error": message})
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::ToolDefinition;
    use async_trait::async_trait;
    use mirage_core::HttpMethod;
    use mirage_gateway::{
        ApprovalDecision, FixedPrompt, GatewayError, PermissionGate, QueryBackend, QueryOutcome,
    };
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays scripted replies and keeps every transcript it was sent.
    struct Scripted {
        replies: Mutex<VecDeque<ModelReply>>,
        seen: Mutex<Vec<Vec<Message>>>,
    }

    impl Scripted {
        fn new(replies: Vec<ModelReply>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Converse for Scripted {
        async fn converse(
            &self,
            transcript: &[Message],
            tools: &[ToolDefinition],
        ) -> Result<ModelReply, AgentError> {
            assert_eq!(tools.len(), 1);
            self.seen.lock().unwrap().push(transcript.to_vec());
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .ok_or(AgentError::EmptyResponse)
        }
    }

    /// Returns two rows for reads and records every statement.
    #[derive(Default)]
    struct TwoRows {
        statements: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl QueryBackend for TwoRows {
        async fn execute(
            &self,
            statement: &str,
            _parameters: &[Value],
            _commit: bool,
        ) -> Result<QueryOutcome, GatewayError> {
            self.statements.lock().unwrap().push(statement.to_string());
            let rows = [1, 2]
                .iter()
                .map(|id| {
                    let mut row = Map::new();
                    row.insert("id".to_string(), json!(id));
                    row
                })
                .collect();
            Ok(QueryOutcome::with_rows(rows))
        }
    }

    fn orchestrator(converse: Arc<Scripted>, backend: Arc<TwoRows>) -> Orchestrator {
        let gate = PermissionGate::new(Arc::new(FixedPrompt(ApprovalDecision::Deny)));
        let gateway = Arc::new(QueryGateway::new(gate, backend));
        Orchestrator::new(converse, gateway, SchemaSnapshot::new())
    }

    fn endpoint() -> EndpointDefinition {
        EndpointDefinition::new("items_id", HttpMethod::Get, "/items/{id}", "Fetch one item", "")
    }

    fn query_call(id: &str, arguments: &str) -> ToolCall {
        ToolCall::new(id, QUERY_TOOL, arguments)
    }

    #[tokio::test]
    async fn test_tool_call_then_answer() {
        let converse = Arc::new(Scripted::new(vec![
            ModelReply::ToolCalls {
                content: None,
                calls: vec![query_call(
                    "call_1",
                    r#"{"statement": "select * from items where id = $1", "parameters": ["42"]}"#,
                )],
            },
            ModelReply::Final(r#"{"status":"success","data":[{"id":1},{"id":2}]}"#.to_string()),
        ]));
        let backend = Arc::new(TwoRows::default());
        let orch = orchestrator(converse.clone(), backend.clone());

        let mut input = Map::new();
        input.insert("id".to_string(), json!("42"));
        let outcome = orch.run(&endpoint(), &input).await.unwrap();

        assert_eq!(
            outcome,
            Outcome::Answer(json!({"status": "success", "data": [{"id": 1}, {"id": 2}]}))
        );
        assert_eq!(backend.statements.lock().unwrap().len(), 1);

        let seen = converse.seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        let second = &seen[1];
        assert_eq!(second.len(), 4);
        assert!(matches!(&second[2], Message::Assistant { tool_calls, .. } if tool_calls.len() == 1));
        match &second[3] {
            Message::Tool {
                tool_call_id,
                content,
            } => {
                assert_eq!(tool_call_id, "call_1");
                let result: Value = serde_json::from_str(content).unwrap();
                assert_eq!(result["rowCount"], 2);
            }
            other => panic!("expected tool result, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_multiple_calls_in_one_turn_keep_order() {
        let converse = Arc::new(Scripted::new(vec![
            ModelReply::ToolCalls {
                content: None,
                calls: vec![
                    query_call("a", r#"{"statement": "select 1"}"#),
                    query_call("b", r#"{"statement": "select 2"}"#),
                ],
            },
            ModelReply::Final("{}".to_string()),
        ]));
        let backend = Arc::new(TwoRows::default());
        let orch = orchestrator(converse.clone(), backend.clone());

        orch.run(&endpoint(), &Map::new()).await.unwrap();

        assert_eq!(*backend.statements.lock().unwrap(), vec!["select 1", "select 2"]);
        let seen = converse.seen.lock().unwrap();
        let ids: Vec<&str> = seen[1]
            .iter()
            .filter_map(|m| match m {
                Message::Tool { tool_call_id, .. } => Some(tool_call_id.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_limit_reached() {
        let replies = (0..5)
            .map(|i| ModelReply::ToolCalls {
                content: None,
                calls: vec![query_call(&format!("call_{i}"), r#"{"statement": "select 1"}"#)],
            })
            .collect();
        let converse = Arc::new(Scripted::new(replies));
        let orch = orchestrator(converse.clone(), Arc::new(TwoRows::default())).with_max_turns(3);

        let outcome = orch.run(&endpoint(), &Map::new()).await.unwrap();

        assert_eq!(outcome, Outcome::LimitReached { turns: 3 });
        assert_eq!(converse.seen.lock().unwrap().len(), 3);
        assert_eq!(
            outcome.into_json(),
            json!({"status": "error", "error": LIMIT_REACHED_MESSAGE})
        );
    }

    #[tokio::test]
    async fn test_bad_calls_become_tool_errors() {
        let converse = Arc::new(Scripted::new(vec![
            ModelReply::ToolCalls {
                content: None,
                calls: vec![
                    ToolCall::new("x", "shell", "{}"),
                    query_call("y", "not json"),
                ],
            },
            ModelReply::Final("done".to_string()),
        ]));
        let backend = Arc::new(TwoRows::default());
        let orch = orchestrator(converse.clone(), backend.clone());

        let outcome = orch.run(&endpoint(), &Map::new()).await.unwrap();

        assert_eq!(outcome, Outcome::Answer(json!({"status": "success", "result": "done"})));
        assert!(backend.statements.lock().unwrap().is_empty());
        let seen = converse.seen.lock().unwrap();
        for message in &seen[1][3..] {
            let Message::Tool { content, .. } = message else {
                panic!("expected tool result");
            };
            let result: Value = serde_json::from_str(content).unwrap();
            assert_eq!(result["status"], "error");
        }
    }

    #[tokio::test]
    async fn test_denied_modification_is_fed_back() {
        let converse = Arc::new(Scripted::new(vec![
            ModelReply::ToolCalls {
                content: None,
                calls: vec![query_call("d", r#"{"statement": "delete from items", "readOnly": false}"#)],
            },
            ModelReply::Final(r#"{"status":"error"}"#.to_string()),
        ]));
        let backend = Arc::new(TwoRows::default());
        let orch = orchestrator(converse.clone(), backend.clone());

        orch.run(&endpoint(), &Map::new()).await.unwrap();

        assert!(backend.statements.lock().unwrap().is_empty());
        let seen = converse.seen.lock().unwrap();
        let Message::Tool { content, .. } = &seen[1][3] else {
            panic!("expected tool result");
        };
        let result: Value = serde_json::from_str(content).unwrap();
        assert_eq!(result["kind"], "NotAuthorized");
    }

    #[tokio::test]
    async fn test_model_failure_is_an_error() {
        let converse = Arc::new(Scripted::new(vec![]));
        let orch = orchestrator(converse, Arc::new(TwoRows::default()));
        assert!(orch.run(&endpoint(), &Map::new()).await.is_err());
    }
}
