//! Schema snapshot commands.
//!
//! `mirage schema refresh` - Introspect the store and save the snapshot.
//! `mirage schema show` - Print the saved snapshot.

use anyhow::{Context, Result};
use mirage_core::MirageConfig;
use mirage_gateway::EnvCredentials;
use mirage_gateway::introspect::introspect_schema;
use std::path::Path;

/// Capture the live schema into `store.schema`.
pub async fn refresh(config_path: &Path) -> Result<()> {
    let mut config = MirageConfig::load(config_path)
        .with_context(|| format!("Failed to load configuration from {:?}", config_path))?;

    let Some(store) = config.store.as_mut() else {
        anyhow::bail!("No store configured in {:?}", config_path);
    };

    tracing::info!(store = %store.display_url(), "Introspecting schema");
    let snapshot = introspect_schema(store, &EnvCredentials)
        .await
        .context("Schema introspection failed")?;
    let tables = snapshot.table_count();
    store.schema = Some(snapshot);

    config
        .save(config_path)
        .with_context(|| format!("Failed to save configuration to {:?}", config_path))?;

    println!("✔ Captured {} tables into {}", tables, config_path.display());
    Ok(())
}

/// Print the saved snapshot as pretty JSON.
pub fn show(config_path: &Path) -> Result<()> {
    let config = MirageConfig::load(config_path)
        .with_context(|| format!("Failed to load configuration from {:?}", config_path))?;

    let snapshot = config
        .store
        .as_ref()
        .and_then(|s| s.schema.as_ref())
        .context("No schema snapshot saved; run `mirage schema refresh`")?;

    println!("{}", snapshot.to_pretty_json());
    Ok(())
}
