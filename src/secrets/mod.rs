//! Secret Resolution
//!
//! Resolves named credentials from, in order: in-process overrides, the
//! process environment, and an optional injected secret store.
//!
//! A source that holds the name ends the lookup, even when its value is
//! empty; only absence falls through to the next source. Store hits are
//! cached for the resolver's lifetime. Misses are never cached, so a secret
//! set after start-up is picked up by the next lookup.

use async_trait::async_trait;
use parking_lot::RwLock;
use secrecy::{ExposeSecret, SecretString};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, trace};

use crate::error::SecretError;
use crate::types::{Credential, CredentialSource};

/// External secret store capability.
///
/// Only `get` is required; stores that accept writes override `set`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Look up a secret by name. `Ok(None)` means the store does not hold it.
    async fn get(&self, name: &str) -> Result<Option<String>, SecretError>;

    /// Store a secret by name.
    async fn set(&self, name: &str, _value: &str) -> Result<(), SecretError> {
        Err(SecretError::Unreadable {
            name: name.to_string(),
            origin: CredentialSource::SecretStore,
            message: "store is read-only".to_string(),
        })
    }
}

/// In-memory secret store.
#[derive(Default)]
pub struct InMemorySecretStore {
    secrets: RwLock<HashMap<String, SecretString>>,
}

impl InMemorySecretStore {
    /// Create new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with secrets.
    pub fn with_secrets<I, K, V>(secrets: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let secrets = secrets
            .into_iter()
            .map(|(k, v)| (k.into(), SecretString::new(v.into())))
            .collect();
        Self {
            secrets: RwLock::new(secrets),
        }
    }
}

#[async_trait]
impl SecretStore for InMemorySecretStore {
    async fn get(&self, name: &str) -> Result<Option<String>, SecretError> {
        Ok(self
            .secrets
            .read()
            .get(name)
            .map(|s| s.expose_secret().clone()))
    }

    async fn set(&self, name: &str, value: &str) -> Result<(), SecretError> {
        self.secrets
            .write()
            .insert(name.to_string(), SecretString::new(value.to_string()));
        Ok(())
    }
}

/// Resolves credential names to values.
pub struct SecretResolver {
    overrides: HashMap<String, SecretString>,
    read_environment: bool,
    store: Option<Arc<dyn SecretStore>>,
    store_cache: RwLock<HashMap<String, Credential>>,
}

impl SecretResolver {
    /// Resolver reading the process environment, with no secret store.
    pub fn new() -> Self {
        Self {
            overrides: HashMap::new(),
            read_environment: true,
            store: None,
            store_cache: RwLock::new(HashMap::new()),
        }
    }

    /// Resolver that only consults explicit overrides and the store.
    pub fn isolated() -> Self {
        Self {
            read_environment: false,
            ..Self::new()
        }
    }

    /// Add an in-process override, consulted before every other source.
    pub fn with_override(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.overrides
            .insert(name.into(), SecretString::new(value.into()));
        self
    }

    /// Attach a secret store, consulted after the environment.
    pub fn with_store(mut self, store: Arc<dyn SecretStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Resolve a credential by name.
    pub async fn resolve(&self, name: &str) -> Result<Credential, SecretError> {
        if let Some(value) = self.overrides.get(name) {
            trace!(secret = name, "Secret resolved from inline override");
            return Self::accept(name, value.expose_secret(), CredentialSource::Inline);
        }

        if self.read_environment {
            match std::env::var(name) {
                Ok(value) => {
                    trace!(secret = name, "Secret resolved from environment");
                    return Self::accept(name, &value, CredentialSource::Environment);
                }
                Err(std::env::VarError::NotUnicode(_)) => {
                    return Err(SecretError::Unreadable {
                        name: name.to_string(),
                        origin: CredentialSource::Environment,
                        message: "value is not valid unicode".to_string(),
                    });
                }
                Err(std::env::VarError::NotPresent) => {}
            }
        }

        if let Some(cached) = self.store_cache.read().get(name) {
            trace!(secret = name, "Secret resolved from store cache");
            return Ok(cached.clone());
        }

        if let Some(store) = &self.store {
            if let Some(value) = store.get(name).await? {
                debug!(secret = name, "Secret resolved from secret store");
                let credential = Self::accept(name, &value, CredentialSource::SecretStore)?;
                self.store_cache
                    .write()
                    .insert(name.to_string(), credential.clone());
                return Ok(credential);
            }
        }

        Err(SecretError::NotFound {
            name: name.to_string(),
        })
    }

    /// Forget cached store values.
    pub fn clear_cache(&self) {
        self.store_cache.write().clear();
    }

    fn accept(name: &str, value: &str, origin: CredentialSource) -> Result<Credential, SecretError> {
        if value.is_empty() {
            return Err(SecretError::Empty {
                name: name.to_string(),
                origin,
            });
        }
        Ok(Credential::new(name, value, origin))
    }
}

impl Default for SecretResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SecretResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretResolver")
            .field("overrides", &self.overrides.keys().collect::<Vec<_>>())
            .field("read_environment", &self.read_environment)
            .field("store", &self.store.is_some())
            .finish()
    }
}
