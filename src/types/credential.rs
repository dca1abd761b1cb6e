//! Credential Types
//!
//! Resolved secret values and where they came from.

use secrecy::{ExposeSecret, SecretString};
use std::fmt;

/// Where a credential value was found.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CredentialSource {
    /// Process environment variable.
    Environment,
    /// Injected secret store.
    SecretStore,
    /// In-process override supplied by the caller.
    Inline,
}

impl fmt::Display for CredentialSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Environment => write!(f, "environment"),
            Self::SecretStore => write!(f, "secret store"),
            Self::Inline => write!(f, "inline override"),
        }
    }
}

/// A named secret value.
#[derive(Clone)]
pub struct Credential {
    name: String,
    value: SecretString,
    source: CredentialSource,
}

impl Credential {
    /// Create new credential.
    pub fn new(name: impl Into<String>, value: impl Into<String>, source: CredentialSource) -> Self {
        Self {
            name: name.into(),
            value: SecretString::new(value.into()),
            source,
        }
    }

    /// Credential name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Where the value was resolved from.
    pub fn source(&self) -> CredentialSource {
        self.source
    }

    /// Expose the secret value for request decoration.
    pub fn expose(&self) -> &str {
        self.value.expose_secret()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("name", &self.name)
            .field("value", &"[REDACTED]")
            .field("source", &self.source)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_redacts_value() {
        let credential = Credential::new("API_KEY", "abc123", CredentialSource::Environment);
        let debug = format!("{:?}", credential);
        assert!(debug.contains("API_KEY"));
        assert!(!debug.contains("abc123"));
        assert_eq!(credential.expose(), "abc123");
    }
}
