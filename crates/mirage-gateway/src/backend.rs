//! Backend trait executed by the gateway.

use crate::error::GatewayError;
use crate::query::QueryOutcome;
use async_trait::async_trait;
use serde_json::Value;

/// A store capable of running one statement.
///
/// Implementations open a private connection per call, run the statement
/// inside a transaction, commit it when `commit` is true and roll it back
/// otherwise, then release the connection on every path.
#[async_trait]
pub trait QueryBackend: Send + Sync {
    async fn execute(
        &self,
        statement: &str,
        parameters: &[Value],
        commit: bool,
    ) -> Result<QueryOutcome, GatewayError>;
}
