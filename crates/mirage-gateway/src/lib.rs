//! # mirage-gateway
//!
//! The query gateway between the model and the relational store.
//!
//! A statement flows through three steps:
//!
//! 1. **Classify**: keyword heuristic plus the caller's read-only claim
//! 2. **Authorize**: modifying statements pass the [`PermissionGate`]
//!    before any connection is opened
//! 3. **Execute**: a private connection and transaction per statement,
//!    committed only when modifying
//!
//! Every failure is returned as a structured [`QueryResult::Error`].

pub mod approval;
pub mod backend;
pub mod classify;
pub mod credentials;
pub mod error;
pub mod gateway;
pub mod introspect;
pub mod postgres;
pub mod query;

pub use approval::{ApprovalDecision, ApprovalPrompt, FixedPrompt, PermissionGate, TerminalPrompt};
pub use backend::QueryBackend;
pub use classify::{StatementClass, classify};
pub use credentials::{CredentialSource, Credentials, EnvCredentials, StaticCredentials};
pub use error::{ErrorKind, GatewayError};
pub use gateway::QueryGateway;
pub use postgres::PostgresBackend;
pub use query::{QueryOutcome, QueryRequest, QueryResult};
