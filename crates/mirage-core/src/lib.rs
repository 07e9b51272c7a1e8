//! # mirage-core
//!
//! Configuration and data types shared by every Mirage crate: endpoint
//! definitions, the HTTP method enum, store/model/server settings and the
//! schema snapshot handed to the model as context.

// Configuration types shared across all Mirage crates
pub mod config;
pub mod endpoint;
pub mod schema;

pub use config::{
    ApprovalMode, ConfigError, MirageConfig, ModelConfig, ServerConfig, StoreConfig, StoreKind,
};
pub use endpoint::{EndpointDefinition, EndpointRegistry, HttpMethod};
pub use schema::{ColumnInfo, ForeignKey, ForeignKeyTarget, IndexInfo, SchemaSnapshot, TableInfo};
