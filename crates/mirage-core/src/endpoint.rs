//! Endpoint definitions and the ordered registry that holds them.
//!
//! An endpoint is not code: it is a method, a path pattern and two pieces of
//! prose (what the endpoint does, and how it should go about doing it) that
//! the model interprets at request time.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// HTTP methods an endpoint can be declared for.
///
/// Serialized upper-case; parsed case-insensitively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE", try_from = "String")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
}

impl HttpMethod {
    /// The canonical upper-case token, as it appears on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Head => "HEAD",
            HttpMethod::Options => "OPTIONS",
        }
    }

    /// Whether requests with this method conventionally carry a body.
    pub fn carries_body(&self) -> bool {
        matches!(self, HttpMethod::Post | HttpMethod::Put | HttpMethod::Patch)
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string is not a supported HTTP method.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported HTTP method: {0}")]
pub struct UnknownMethod(pub String);

impl TryFrom<String> for HttpMethod {
    type Error = UnknownMethod;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl FromStr for HttpMethod {
    type Err = UnknownMethod;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "GET" => Ok(HttpMethod::Get),
            "POST" => Ok(HttpMethod::Post),
            "PUT" => Ok(HttpMethod::Put),
            "PATCH" => Ok(HttpMethod::Patch),
            "DELETE" => Ok(HttpMethod::Delete),
            "HEAD" => Ok(HttpMethod::Head),
            "OPTIONS" => Ok(HttpMethod::Options),
            _ => Err(UnknownMethod(s.to_string())),
        }
    }
}

/// A single dynamically interpreted route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointDefinition {
    /// Unique name, used in docs and logs.
    pub name: String,

    /// Method the endpoint answers to.
    pub method: HttpMethod,

    /// `/`-delimited pattern of literal segments and `{name}` placeholders.
    pub path: String,

    /// One-line natural-language description of the behavior.
    pub description: String,

    /// Free-text guidance on how to implement the behavior (steps,
    /// expected response schema, error handling).
    #[serde(default)]
    pub implementation: String,
}

impl EndpointDefinition {
    /// Create a new endpoint definition.
    pub fn new(
        name: impl Into<String>,
        method: HttpMethod,
        path: impl Into<String>,
        description: impl Into<String>,
        implementation: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            method,
            path: path.into(),
            description: description.into(),
            implementation: implementation.into(),
        }
    }

    /// Derive an endpoint name from its path: `/users/rooms` -> `users_rooms`.
    pub fn name_from_path(path: &str) -> String {
        path.trim_matches('/').replace('/', "_")
    }

    /// Names of the `{placeholder}` segments, in order.
    pub fn placeholders(&self) -> Vec<&str> {
        self.path
            .trim_matches('/')
            .split('/')
            .filter_map(|part| part.strip_prefix('{').and_then(|p| p.strip_suffix('}')))
            .collect()
    }
}

/// Ordered, read-only collection of endpoint definitions.
///
/// Order matters: when several endpoints could match a request, the first
/// one registered wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EndpointRegistry {
    endpoints: Vec<EndpointDefinition>,
}

impl EndpointRegistry {
    /// Build a registry preserving the given order.
    pub fn new(endpoints: Vec<EndpointDefinition>) -> Self {
        Self { endpoints }
    }

    /// All endpoints in registry order.
    pub fn endpoints(&self) -> &[EndpointDefinition] {
        &self.endpoints
    }

    /// Iterate in registry order.
    pub fn iter(&self) -> impl Iterator<Item = &EndpointDefinition> {
        self.endpoints.iter()
    }

    /// Look up an endpoint by name.
    pub fn get(&self, name: &str) -> Option<&EndpointDefinition> {
        self.endpoints.iter().find(|e| e.name == name)
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }
}

impl From<Vec<EndpointDefinition>> for EndpointRegistry {
    fn from(endpoints: Vec<EndpointDefinition>) -> Self {
        Self::new(endpoints)
    }
}
