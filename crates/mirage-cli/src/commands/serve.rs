//! Serve command for starting the Mirage HTTP server.
//!
//! `mirage serve` - Load endpoints, connect the model and store, and listen.

use anyhow::{Context, Result, bail};
use mirage_agent::{OpenAiChat, Orchestrator};
use mirage_core::{ApprovalMode, MirageConfig};
use mirage_gateway::QueryGateway;
use mirage_server::{AppState, MirageServer};
use std::path::Path;
use std::sync::Arc;

/// Start the server with optional host/port overrides.
pub async fn run(config_path: &Path, host: Option<String>, port: Option<u16>) -> Result<()> {
    let config = MirageConfig::load(config_path)
        .with_context(|| format!("Failed to load configuration from {:?}", config_path))?;

    if config.endpoints.is_empty() {
        bail!(
            "No endpoints configured in {:?}. Add one with `mirage endpoints add`.",
            config_path
        );
    }
    let Some(store) = config.store.clone() else {
        bail!("No store configured in {:?}", config_path);
    };

    let model = OpenAiChat::from_config(&config.model).context("Failed to set up model client")?;
    let schema = store.schema_snapshot();
    if schema.is_empty() {
        tracing::warn!("No schema snapshot saved; run `mirage schema refresh` to give the model table context");
    }

    match config.server.approval {
        ApprovalMode::Prompt => {
            tracing::info!("Modifying statements will ask for approval on this terminal")
        }
        ApprovalMode::Deny => tracing::info!("Modifying statements will be refused"),
    }
    if config.server.expose_error_detail {
        tracing::warn!("Internal error detail is included in 500 responses");
    }

    tracing::info!(
        store = %store.display_url(),
        model = %model.model(),
        endpoints = config.endpoints.len(),
        "Starting Mirage"
    );

    let gateway = Arc::new(QueryGateway::postgres(store, config.server.approval));
    let orchestrator = Orchestrator::new(Arc::new(model), gateway, schema)
        .with_max_turns(config.model.max_turns);
    let state = AppState::new(&config.registry(), orchestrator)
        .with_error_detail(config.server.expose_error_detail)
        .with_body_limit(config.server.max_body_bytes);

    let host = host.unwrap_or_else(|| config.server.host.clone());
    let port = port.unwrap_or(config.server.port);

    MirageServer::new(state, host, port)
        .with_port_search_limit(config.server.port_search_limit)
        .run()
        .await
}
