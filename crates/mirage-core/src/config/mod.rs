//! Configuration types for Mirage.
//!
//! Everything Mirage needs at runtime is loaded from one YAML file
//! (`mirage.yaml` by default) into a single [`MirageConfig`].
//!
//! # Sections
//!
//! - **server**: bind address, port probing, approval mode, error detail policy
//! - **model**: chat completions API, model name, turn budget
//! - **store**: Postgres connection metadata, credential variable names,
//!   schema snapshot
//! - **endpoints**: the ordered endpoint registry

pub mod model;
pub mod store;

use crate::endpoint::{EndpointDefinition, EndpointRegistry};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub use model::ModelConfig;
pub use store::{StoreConfig, StoreKind};

/// Default configuration file name.
pub const DEFAULT_CONFIG_FILE: &str = "mirage.yaml";

/// Request body cap used when `server.max_body_bytes` is not set.
pub const DEFAULT_MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

/// Errors raised while loading, validating or saving configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration file not found: {0}")]
    NotFound(PathBuf),

    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("failed to serialize configuration: {0}")]
    Serialize(#[from] serde_yaml::Error),

    #[error("invalid endpoint '{name}': {reason}")]
    InvalidEndpoint { name: String, reason: String },

    #[error("duplicate endpoint name: {0}")]
    DuplicateEndpoint(String),

    #[error("no endpoint named '{0}'")]
    UnknownEndpoint(String),
}

/// Complete Mirage configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MirageConfig {
    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Model settings.
    #[serde(default)]
    pub model: ModelConfig,

    /// Backing store. Serving requires one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store: Option<StoreConfig>,

    /// Endpoint definitions, in match order.
    #[serde(default)]
    pub endpoints: Vec<EndpointDefinition>,
}

/// How modifying statements are authorized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalMode {
    /// Ask the operator on the terminal.
    #[default]
    Prompt,
    /// Refuse every modifying statement.
    Deny,
}

/// HTTP server settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind host.
    #[serde(default = "default_host")]
    pub host: String,

    /// First port to try.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Highest port tried when `port` is taken.
    #[serde(default = "default_port_search_limit")]
    pub port_search_limit: u16,

    /// Include error detail and cause chain in 500 responses.
    #[serde(default = "default_true")]
    pub expose_error_detail: bool,

    /// Largest request body accepted, in bytes.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,

    /// Authorization mode for modifying statements.
    #[serde(default)]
    pub approval: ApprovalMode,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            port_search_limit: default_port_search_limit(),
            expose_error_detail: true,
            max_body_bytes: default_max_body_bytes(),
            approval: ApprovalMode::default(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_port_search_limit() -> u16 {
    9000
}

fn default_max_body_bytes() -> usize {
    DEFAULT_MAX_BODY_BYTES
}

fn default_true() -> bool {
    true
}

impl MirageConfig {
    /// Load and validate a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let config = Self::from_yaml(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file, or start from defaults if it does not exist.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        match Self::load(path) {
            Err(ConfigError::NotFound(_)) => Ok(Self::default()),
            other => other,
        }
    }

    /// Parse YAML without validation.
    pub fn from_yaml(raw: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(raw)
    }

    /// Save the configuration as YAML.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let yaml = serde_yaml::to_string(self)?;
        fs::write(path, yaml).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Check endpoint definitions for structural problems.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        for endpoint in &self.endpoints {
            validate_endpoint(endpoint)?;
            if !seen.insert(endpoint.name.as_str()) {
                return Err(ConfigError::DuplicateEndpoint(endpoint.name.clone()));
            }
        }
        Ok(())
    }

    /// Snapshot of the endpoint definitions as a registry.
    pub fn registry(&self) -> EndpointRegistry {
        EndpointRegistry::new(self.endpoints.clone())
    }

    /// Whether a store is configured.
    pub fn has_store(&self) -> bool {
        self.store.is_some()
    }

    /// Append an endpoint after validating it.
    pub fn add_endpoint(&mut self, endpoint: EndpointDefinition) -> Result<(), ConfigError> {
        validate_endpoint(&endpoint)?;
        if self.endpoints.iter().any(|e| e.name == endpoint.name) {
            return Err(ConfigError::DuplicateEndpoint(endpoint.name));
        }
        self.endpoints.push(endpoint);
        Ok(())
    }

    /// Replace the endpoint called `name` in place, keeping its match
    /// position. Returns the previous definition.
    pub fn replace_endpoint(
        &mut self,
        name: &str,
        updated: EndpointDefinition,
    ) -> Result<EndpointDefinition, ConfigError> {
        let index = self
            .endpoints
            .iter()
            .position(|e| e.name == name)
            .ok_or_else(|| ConfigError::UnknownEndpoint(name.to_string()))?;

        validate_endpoint(&updated)?;
        if updated.name != name && self.endpoints.iter().any(|e| e.name == updated.name) {
            return Err(ConfigError::DuplicateEndpoint(updated.name));
        }
        Ok(std::mem::replace(&mut self.endpoints[index], updated))
    }

    /// Remove an endpoint by name, returning it if it existed.
    pub fn remove_endpoint(&mut self, name: &str) -> Option<EndpointDefinition> {
        let index = self.endpoints.iter().position(|e| e.name == name)?;
        Some(self.endpoints.remove(index))
    }
}

fn validate_endpoint(endpoint: &EndpointDefinition) -> Result<(), ConfigError> {
    let invalid = |reason: &str| ConfigError::InvalidEndpoint {
        name: endpoint.name.clone(),
        reason: reason.to_string(),
    };

    if endpoint.name.trim().is_empty() {
        return Err(invalid("name must not be empty"));
    }
    if !endpoint.path.starts_with('/') {
        return Err(invalid("path must start with '/'"));
    }
    for segment in endpoint.path.trim_matches('/').split('/') {
        if let Some(inner) = segment.strip_prefix('{').and_then(|s| s.strip_suffix('}'))
            && inner.is_empty()
        {
            return Err(invalid("placeholder name must not be empty"));
        }
    }
    Ok(())
}
