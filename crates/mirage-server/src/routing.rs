//! Route matching over the endpoint registry.
//!
//! Patterns are compiled once into segment lists. A literal segment matches
//! only itself, character for character; a `{name}` segment matches exactly
//! one non-empty path segment. Segment counts must agree, and the first
//! endpoint in registry order that matches wins.

use mirage_core::{EndpointDefinition, EndpointRegistry, HttpMethod};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param(String),
}

/// A compiled path pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPattern {
    segments: Vec<Segment>,
}

impl PathPattern {
    pub fn compile(pattern: &str) -> Self {
        let segments = pattern
            .trim_matches('/')
            .split('/')
            .map(|part| match part.strip_prefix('{').and_then(|p| p.strip_suffix('}')) {
                Some(name) => Segment::Param(name.to_string()),
                None => Segment::Literal(part.to_string()),
            })
            .collect();
        Self { segments }
    }

    /// Match a concrete path, returning the bound placeholders.
    pub fn matches(&self, path: &str) -> Option<BTreeMap<String, String>> {
        let rest = path.strip_prefix('/')?;
        let parts: Vec<&str> = rest.split('/').collect();
        if parts.len() != self.segments.len() {
            return None;
        }

        let mut params = BTreeMap::new();
        for (segment, part) in self.segments.iter().zip(parts) {
            match segment {
                Segment::Literal(literal) if literal == part => {}
                Segment::Param(name) if !part.is_empty() => {
                    params.insert(name.clone(), part.to_string());
                }
                _ => return None,
            }
        }
        Some(params)
    }
}

/// A successful match.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteMatch<'a> {
    pub endpoint: &'a EndpointDefinition,
    pub params: BTreeMap<String, String>,
}

/// Ordered list of compiled endpoint patterns.
#[derive(Debug, Clone)]
pub struct RouteMatcher {
    routes: Vec<(EndpointDefinition, PathPattern)>,
}

impl RouteMatcher {
    pub fn new(registry: &EndpointRegistry) -> Self {
        let routes = registry
            .iter()
            .map(|endpoint| (endpoint.clone(), PathPattern::compile(&endpoint.path)))
            .collect();
        Self { routes }
    }

    /// Find the first endpoint matching `method` and `path`.
    pub fn find(&self, method: HttpMethod, path: &str) -> Option<RouteMatch<'_>> {
        self.routes
            .iter()
            .filter(|(endpoint, _)| endpoint.method == method)
            .find_map(|(endpoint, pattern)| {
                pattern
                    .matches(path)
                    .map(|params| RouteMatch { endpoint, params })
            })
    }

    pub fn endpoints(&self) -> impl Iterator<Item = &EndpointDefinition> {
        self.routes.iter().map(|(endpoint, _)| endpoint)
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
