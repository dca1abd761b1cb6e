//! Configuration Builder
//!
//! Fluent builder for client configuration.

use reqwest::header::{HeaderName, HeaderValue};
use std::collections::BTreeMap;
use std::time::Duration;

use crate::error::{ApiError, ConfigurationError};
use crate::types::{ClientAuthMethod, ClientConfig};

/// Client configuration builder.
#[derive(Debug, Clone)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    /// Create new builder starting from defaults.
    pub fn new() -> Self {
        Self {
            config: ClientConfig::default(),
        }
    }

    /// Start from defaults with environment overrides applied.
    pub fn from_env() -> Self {
        Self {
            config: ClientConfig::from_env(),
        }
    }

    /// Set request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Set connect timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    /// Set User-Agent header.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    /// Set maximum response body size in bytes.
    pub fn max_response_size(mut self, bytes: usize) -> Self {
        self.config.max_response_size = bytes;
        self
    }

    /// Enable or disable redirect following.
    pub fn follow_redirects(mut self, follow: bool) -> Self {
        self.config.follow_redirects = follow;
        self
    }

    /// Set client authentication method for token endpoints.
    pub fn token_auth_method(mut self, method: ClientAuthMethod) -> Self {
        self.config.token_auth_method = method;
        self
    }

    /// Set how long before expiry a cached token is refreshed.
    pub fn token_refresh_buffer(mut self, buffer: Duration) -> Self {
        self.config.token_refresh_buffer = buffer;
        self
    }

    /// Add a header sent with every request.
    pub fn default_header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.config
            .default_headers
            .insert(name.as_ref().to_ascii_lowercase(), value.into());
        self
    }

    /// Build the configuration.
    pub fn build(self) -> Result<ClientConfig, ApiError> {
        let config = self.config;

        if config.timeout.is_zero() {
            return Err(invalid("timeout", "must be greater than zero"));
        }
        if config.connect_timeout.is_zero() {
            return Err(invalid("connect_timeout", "must be greater than zero"));
        }
        if config.max_response_size == 0 {
            return Err(invalid("max_response_size", "must be greater than zero"));
        }
        if config.user_agent.trim().is_empty() {
            return Err(ConfigurationError::MissingField {
                field: "user_agent".to_string(),
            }
            .into());
        }
        validate_headers(&config.default_headers)?;

        Ok(config)
    }
}

impl Default for ClientConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn invalid(field: &str, reason: &str) -> ApiError {
    ConfigurationError::InvalidValue {
        field: field.to_string(),
        reason: reason.to_string(),
    }
    .into()
}

fn validate_headers(headers: &BTreeMap<String, String>) -> Result<(), ApiError> {
    for (name, value) in headers {
        let valid = HeaderName::from_bytes(name.as_bytes()).is_ok()
            && HeaderValue::from_str(value).is_ok();
        if !valid {
            return Err(ConfigurationError::InvalidHeader { name: name.clone() }.into());
        }
    }
    Ok(())
}

/// Create a new client configuration builder.
pub fn api_client_config() -> ClientConfigBuilder {
    ClientConfigBuilder::new()
}
