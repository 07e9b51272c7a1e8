//! Endpoint management commands.
//!
//! `mirage endpoints list` - Show configured endpoints in match order.
//! `mirage endpoints add` - Append an endpoint to the configuration.
//! `mirage endpoints update` - Change fields of an existing endpoint.
//! `mirage endpoints remove` - Remove an endpoint by name.

use anyhow::{Context, Result, bail};
use mirage_core::{EndpointDefinition, HttpMethod, MirageConfig};
use std::path::Path;

/// Fields for a new endpoint.
#[derive(Debug, Clone)]
pub struct NewEndpoint {
    pub name: Option<String>,
    pub method: HttpMethod,
    pub path: String,
    pub description: String,
    pub implementation: String,
}

impl NewEndpoint {
    fn into_definition(self) -> EndpointDefinition {
        let name = self
            .name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| EndpointDefinition::name_from_path(&self.path));
        EndpointDefinition::new(
            name,
            self.method,
            self.path,
            self.description,
            self.implementation,
        )
    }
}

/// Print every configured endpoint.
pub fn list(config_path: &Path) -> Result<()> {
    let config = MirageConfig::load(config_path)
        .with_context(|| format!("Failed to load configuration from {:?}", config_path))?;

    if config.endpoints.is_empty() {
        println!("No endpoints configured. Add one with `mirage endpoints add`.");
        return Ok(());
    }

    println!("\n📋 Endpoints ({}):", config.endpoints.len());
    for endpoint in &config.endpoints {
        println!(
            "   {:<7} {:<30} {}",
            endpoint.method, endpoint.path, endpoint.name
        );
        if !endpoint.description.is_empty() {
            println!("           {}", endpoint.description);
        }
    }
    println!();
    Ok(())
}

/// Add an endpoint and save the configuration.
///
/// A missing configuration file is created.
pub fn add(config_path: &Path, new: NewEndpoint) -> Result<()> {
    let mut config = MirageConfig::load_or_default(config_path)
        .with_context(|| format!("Failed to load configuration from {:?}", config_path))?;

    let endpoint = new.into_definition();
    let summary = format!("{} {} ({})", endpoint.method, endpoint.path, endpoint.name);
    config.add_endpoint(endpoint)?;
    config
        .save(config_path)
        .with_context(|| format!("Failed to save configuration to {:?}", config_path))?;

    println!("✔ Added endpoint {}", summary);
    Ok(())
}

/// Field changes for an existing endpoint. `None` keeps the current value.
#[derive(Debug, Clone, Default)]
pub struct EndpointChanges {
    pub method: Option<HttpMethod>,
    pub path: Option<String>,
    pub description: Option<String>,
    pub implementation: Option<String>,
}

impl EndpointChanges {
    fn is_empty(&self) -> bool {
        self.method.is_none()
            && self.path.is_none()
            && self.description.is_none()
            && self.implementation.is_none()
    }

    fn apply(self, endpoint: &mut EndpointDefinition) {
        if let Some(method) = self.method {
            endpoint.method = method;
        }
        if let Some(path) = self.path {
            endpoint.path = path;
        }
        if let Some(description) = self.description {
            endpoint.description = description;
        }
        if let Some(implementation) = self.implementation {
            endpoint.implementation = implementation;
        }
    }
}

/// Update an endpoint in place and save the configuration.
///
/// The endpoint keeps its name and its position in match order.
pub fn update(config_path: &Path, name: &str, changes: EndpointChanges) -> Result<()> {
    if changes.is_empty() {
        bail!("Nothing to update; pass at least one of --method, --path, --description, --implementation");
    }

    let mut config = MirageConfig::load(config_path)
        .with_context(|| format!("Failed to load configuration from {:?}", config_path))?;

    let Some(current) = config.registry().get(name).cloned() else {
        bail!("No endpoint named '{}'", name);
    };
    let mut updated = current;
    changes.apply(&mut updated);
    let summary = format!("{} {} ({})", updated.method, updated.path, updated.name);

    config.replace_endpoint(name, updated)?;
    config
        .save(config_path)
        .with_context(|| format!("Failed to save configuration to {:?}", config_path))?;

    println!("✔ Updated endpoint {}", summary);
    Ok(())
}

/// Remove an endpoint and save the configuration.
pub fn remove(config_path: &Path, name: &str) -> Result<()> {
    let mut config = MirageConfig::load(config_path)
        .with_context(|| format!("Failed to load configuration from {:?}", config_path))?;

    let Some(removed) = config.remove_endpoint(name) else {
        bail!("No endpoint named '{}'", name);
    };
    config
        .save(config_path)
        .with_context(|| format!("Failed to save configuration to {:?}", config_path))?;

    println!("✔ Removed endpoint {} {} ({})", removed.method, removed.path, removed.name);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn new_endpoint(name: Option<&str>, path: &str) -> NewEndpoint {
        NewEndpoint {
            name: name.map(str::to_string),
            method: HttpMethod::Get,
            path: path.to_string(),
            description: "Example".to_string(),
            implementation: String::new(),
        }
    }

    #[test]
    fn test_add_creates_config_and_derives_name() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("mirage.yaml");

        add(&path, new_endpoint(None, "/users/rooms")).unwrap();
        add(&path, new_endpoint(Some("lookup"), "/items/{id}")).unwrap();

        let config = MirageConfig::load(&path).unwrap();
        let names: Vec<_> = config.endpoints.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["users_rooms", "lookup"]);
    }

    #[test]
    fn test_add_rejects_duplicates() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("mirage.yaml");

        add(&path, new_endpoint(None, "/items")).unwrap();
        assert!(add(&path, new_endpoint(None, "/items")).is_err());
    }

    #[test]
    fn test_update_changes_only_given_fields() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("mirage.yaml");

        add(&path, new_endpoint(None, "/items")).unwrap();
        add(&path, new_endpoint(None, "/orders")).unwrap();
        update(
            &path,
            "items",
            EndpointChanges {
                implementation: Some("Select every row from items".to_string()),
                ..Default::default()
            },
        )
        .unwrap();

        let config = MirageConfig::load(&path).unwrap();
        let items = &config.endpoints[0];
        assert_eq!(items.name, "items");
        assert_eq!(items.description, "Example");
        assert_eq!(items.implementation, "Select every row from items");
        assert_eq!(config.endpoints[1].name, "orders");
    }

    #[test]
    fn test_update_rejects_bad_input() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("mirage.yaml");
        add(&path, new_endpoint(None, "/items")).unwrap();

        assert!(update(&path, "items", EndpointChanges::default()).is_err());
        assert!(update(
            &path,
            "ghost",
            EndpointChanges {
                description: Some("x".to_string()),
                ..Default::default()
            }
        )
        .is_err());
        assert!(update(
            &path,
            "items",
            EndpointChanges {
                path: Some("relative".to_string()),
                ..Default::default()
            }
        )
        .is_err());
        assert_eq!(MirageConfig::load(&path).unwrap().endpoints[0].path, "/items");
    }

    #[test]
    fn test_remove() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("mirage.yaml");

        add(&path, new_endpoint(None, "/items")).unwrap();
        remove(&path, "items").unwrap();
        assert!(MirageConfig::load(&path).unwrap().endpoints.is_empty());
        assert!(remove(&path, "items").is_err());
    }
}
