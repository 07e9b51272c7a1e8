//! The single path by which model-issued statements reach the store.

use crate::approval::PermissionGate;
use crate::backend::QueryBackend;
use crate::classify::classify;
use crate::error::GatewayError;
use crate::postgres::PostgresBackend;
use crate::query::{QueryRequest, QueryResult};
use mirage_core::{ApprovalMode, StoreConfig};
use std::sync::Arc;

/// Classifies, authorizes and executes statements.
///
/// Failures never escape as errors; they are folded into
/// [`QueryResult::Error`] so the model can read them and adapt.
pub struct QueryGateway {
    gate: PermissionGate,
    backend: Arc<dyn QueryBackend>,
}

impl QueryGateway {
    pub fn new(gate: PermissionGate, backend: Arc<dyn QueryBackend>) -> Self {
        Self { gate, backend }
    }

    /// Gateway over Postgres with environment credentials.
    pub fn postgres(store: StoreConfig, approval: ApprovalMode) -> Self {
        Self::new(
            PermissionGate::for_mode(approval),
            Arc::new(PostgresBackend::new(store)),
        )
    }

    pub fn gate(&self) -> &PermissionGate {
        &self.gate
    }

    /// Run one statement and return a structured result.
    pub async fn execute(&self, request: &QueryRequest) -> QueryResult {
        match self.try_execute(request).await {
            Ok(result) => result,
            Err(err) => {
                tracing::warn!(kind = %err.kind(), error = %err, "Statement failed");
                QueryResult::from(err)
            }
        }
    }

    async fn try_execute(&self, request: &QueryRequest) -> Result<QueryResult, GatewayError> {
        let class = classify(&request.statement, request.declared_read_only);
        tracing::debug!(
            modifying = class.is_modifying(),
            parameters = request.parameters.len(),
            "Executing statement"
        );

        if class.is_modifying() {
            self.gate
                .authorize(&request.statement, &request.parameters)
                .await?;
        }

        let outcome = self
            .backend
            .execute(&request.statement, &request.parameters, class.is_modifying())
            .await?;

        tracing::debug!(row_count = outcome.row_count, "Statement completed");
        Ok(QueryResult::from(outcome))
    }
}
