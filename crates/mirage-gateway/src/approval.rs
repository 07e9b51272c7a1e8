//! Operator approval of modifying statements.
//!
//! Every modifying statement passes through a [`PermissionGate`] before a
//! connection is opened. The gate holds a session flag that starts out
//! cleared. Once the operator answers "all", the flag is set for the rest of
//! the process and later modifying statements skip the prompt.
//!
//! ## Decisions
//!
//! | Answer | Effect                                   |
//! |--------|------------------------------------------|
//! | `y`    | Run this statement only                  |
//! | `all`  | Run this and every later statement       |
//! | other  | Refuse with `NotAuthorized`              |

use crate::error::GatewayError;
use async_trait::async_trait;
use mirage_core::ApprovalMode;
use serde_json::Value;
use std::io::{BufRead, Write};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Operator's answer to an approval prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApprovalDecision {
    ApproveOnce,
    ApproveForSession,
    Deny,
}

impl ApprovalDecision {
    /// Interpret a typed answer. Matching is case-insensitive.
    pub fn from_answer(answer: &str) -> Self {
        match answer.trim().to_ascii_lowercase().as_str() {
            "y" => ApprovalDecision::ApproveOnce,
            "all" => ApprovalDecision::ApproveForSession,
            _ => ApprovalDecision::Deny,
        }
    }
}

/// Source of approval decisions.
#[async_trait]
pub trait ApprovalPrompt: Send + Sync {
    async fn decide(&self, statement: &str, parameters: &[Value]) -> ApprovalDecision;
}

/// Asks the operator on the controlling terminal.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalPrompt;

#[async_trait]
impl ApprovalPrompt for TerminalPrompt {
    async fn decide(&self, statement: &str, parameters: &[Value]) -> ApprovalDecision {
        let statement = statement.to_string();
        let parameters = Value::Array(parameters.to_vec()).to_string();
        let answer = tokio::task::spawn_blocking(move || -> std::io::Result<String> {
            let mut stdout = std::io::stdout().lock();
            writeln!(stdout, "\nModifying statement requested:\n{}", statement)?;
            writeln!(stdout, "Parameters: {}", parameters)?;
            write!(stdout, "Allow this operation? (y/n/all): ")?;
            stdout.flush()?;

            let mut line = String::new();
            std::io::stdin().lock().read_line(&mut line)?;
            Ok(line)
        })
        .await;

        match answer {
            Ok(Ok(line)) => ApprovalDecision::from_answer(&line),
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "Failed to read approval answer; denying");
                ApprovalDecision::Deny
            }
            Err(e) => {
                tracing::warn!(error = %e, "Approval prompt task failed; denying");
                ApprovalDecision::Deny
            }
        }
    }
}

/// Always gives the same answer.
#[derive(Debug, Clone, Copy)]
pub struct FixedPrompt(pub ApprovalDecision);

#[async_trait]
impl ApprovalPrompt for FixedPrompt {
    async fn decide(&self, _statement: &str, _parameters: &[Value]) -> ApprovalDecision {
        self.0
    }
}

/// Serializes approval of modifying statements.
pub struct PermissionGate {
    session_authorized: Mutex<bool>,
    prompt: Arc<dyn ApprovalPrompt>,
}

impl PermissionGate {
    pub fn new(prompt: Arc<dyn ApprovalPrompt>) -> Self {
        Self {
            session_authorized: Mutex::new(false),
            prompt,
        }
    }

    /// Build a gate for a configured approval mode.
    pub fn for_mode(mode: ApprovalMode) -> Self {
        match mode {
            ApprovalMode::Prompt => Self::new(Arc::new(TerminalPrompt)),
            ApprovalMode::Deny => Self::new(Arc::new(FixedPrompt(ApprovalDecision::Deny))),
        }
    }

    /// Whether the operator has approved every modification for this session.
    pub async fn is_session_authorized(&self) -> bool {
        *self.session_authorized.lock().await
    }

    /// Authorize a modifying statement.
    ///
    /// The lock is held while the operator is prompted, so concurrent
    /// requests queue behind one prompt and observe a session approval
    /// granted by it.
    pub async fn authorize(
        &self,
        statement: &str,
        parameters: &[Value],
    ) -> Result<(), GatewayError> {
        let mut authorized = self.session_authorized.lock().await;
        if *authorized {
            return Ok(());
        }

        match self.prompt.decide(statement, parameters).await {
            ApprovalDecision::ApproveOnce => {
                tracing::info!("Modifying statement approved once");
                Ok(())
            }
            ApprovalDecision::ApproveForSession => {
                tracing::info!("Modifying statements approved for the session");
                *authorized = true;
                Ok(())
            }
            ApprovalDecision::Deny => {
                tracing::info!("Modifying statement denied");
                Err(GatewayError::NotAuthorized)
            }
        }
    }
}

impl std::fmt::Debug for PermissionGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PermissionGate").finish_non_exhaustive()
    }
}
