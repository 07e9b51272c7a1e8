//! Store credentials resolved at query time.

use crate::error::GatewayError;
use mirage_core::StoreConfig;

/// User name and password for one connection.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub user: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Resolves credentials for a store.
pub trait CredentialSource: Send + Sync {
    fn resolve(&self, store: &StoreConfig) -> Result<Credentials, GatewayError>;
}

/// Reads credentials from process environment variables.
///
/// The user name falls back to `store.user` when its variable is unset.
/// The password has no fallback.
#[derive(Debug, Default, Clone, Copy)]
pub struct EnvCredentials;

impl CredentialSource for EnvCredentials {
    fn resolve(&self, store: &StoreConfig) -> Result<Credentials, GatewayError> {
        resolve_with(store, |name| std::env::var(name).ok())
    }
}

/// Fixed credentials, used when they are known up front.
#[derive(Debug, Clone)]
pub struct StaticCredentials(pub Credentials);

impl CredentialSource for StaticCredentials {
    fn resolve(&self, _store: &StoreConfig) -> Result<Credentials, GatewayError> {
        Ok(self.0.clone())
    }
}

fn resolve_with(
    store: &StoreConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<Credentials, GatewayError> {
    let non_empty = |v: Option<String>| v.filter(|s| !s.is_empty());

    let user = non_empty(lookup(&store.user_env))
        .or_else(|| non_empty(store.user.clone()))
        .ok_or_else(|| GatewayError::MissingCredential {
            what: "user",
            variable: store.user_env.clone(),
        })?;

    let password = non_empty(lookup(&store.password_env)).ok_or_else(|| {
        GatewayError::MissingCredential {
            what: "password",
            variable: store.password_env.clone(),
        }
    })?;

    Ok(Credentials { user, password })
}
