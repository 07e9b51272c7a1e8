//! Backing store configuration types.
//!
//! Connection metadata lives in the config file; credentials never do. The
//! user name and password are read at query time from the runtime variables
//! named by `user_env` and `password_env`.

use crate::schema::SchemaSnapshot;
use serde::{Deserialize, Serialize};

/// Supported store kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    #[default]
    #[serde(alias = "postgres")]
    Postgresql,
}

/// Configuration for the relational store queried by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Store kind.
    #[serde(default)]
    pub kind: StoreKind,

    /// Hostname of the Postgres server.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port of the Postgres server.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Database name to connect to.
    pub dbname: String,

    /// Environment variable holding the user name.
    #[serde(default = "default_user_env")]
    pub user_env: String,

    /// Environment variable holding the password.
    #[serde(default = "default_password_env")]
    pub password_env: String,

    /// User name used when `user_env` is unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,

    /// Connect timeout in seconds.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_seconds: u64,

    /// Schema snapshot captured at setup time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<SchemaSnapshot>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            kind: StoreKind::default(),
            host: default_host(),
            port: default_port(),
            dbname: default_dbname(),
            user_env: default_user_env(),
            password_env: default_password_env(),
            user: None,
            connect_timeout_seconds: default_connect_timeout(),
            schema: None,
        }
    }
}

impl StoreConfig {
    /// Build a connection URL without credentials, for display.
    pub fn display_url(&self) -> String {
        format!("postgresql://{}:{}/{}", self.host, self.port, self.dbname)
    }

    /// The configured schema snapshot, or an empty one.
    pub fn schema_snapshot(&self) -> SchemaSnapshot {
        self.schema.clone().unwrap_or_default()
    }
}

// Default value functions
fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    5432
}

fn default_dbname() -> String {
    "postgres".to_string()
}

fn default_user_env() -> String {
    "DB_USER".to_string()
}

fn default_password_env() -> String {
    "DB_PASSWORD".to_string()
}

fn default_connect_timeout() -> u64 {
    10
}
