//! Shared state for the dispatch server.

use crate::routing::RouteMatcher;
use mirage_agent::Orchestrator;
use mirage_core::EndpointRegistry;
use mirage_core::config::DEFAULT_MAX_BODY_BYTES;

/// State shared by every request handler.
pub struct AppState {
    pub matcher: RouteMatcher,
    pub orchestrator: Orchestrator,
    /// Include error detail and cause chain in 500 responses.
    pub expose_error_detail: bool,
    /// Requests with larger bodies get a 413.
    pub max_body_bytes: usize,
}

impl AppState {
    pub fn new(registry: &EndpointRegistry, orchestrator: Orchestrator) -> Self {
        Self {
            matcher: RouteMatcher::new(registry),
            orchestrator,
            expose_error_detail: true,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }

    pub fn with_error_detail(mut self, expose: bool) -> Self {
        self.expose_error_detail = expose;
        self
    }

    pub fn with_body_limit(mut self, bytes: usize) -> Self {
        self.max_body_bytes = bytes;
        self
    }
}
