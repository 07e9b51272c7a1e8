//! `mirage docs` - Print the endpoint documentation served at /docs.

use anyhow::{Context, Result};
use mirage_core::MirageConfig;
use mirage_server::render_docs;
use std::path::Path;

pub fn print(config_path: &Path) -> Result<()> {
    let config = MirageConfig::load(config_path)
        .with_context(|| format!("Failed to load configuration from {:?}", config_path))?;

    print!("{}", render_docs(&config.endpoints));
    Ok(())
}
