//! Configuration Types
//!
//! Client configuration shared by the HTTP client and token exchanger.

use std::collections::BTreeMap;
use std::time::Duration;

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default connect timeout.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default maximum response body size (10 MiB).
pub const DEFAULT_MAX_RESPONSE_SIZE: usize = 10 * 1024 * 1024;

/// Default User-Agent header.
pub const DEFAULT_USER_AGENT: &str = concat!("api-auth-integration/", env!("CARGO_PKG_VERSION"));

/// Environment variable overriding the request timeout, in seconds.
pub const TIMEOUT_ENV_VAR: &str = "API_CLIENT_TIMEOUT_SECS";

/// Environment variable overriding the User-Agent header.
pub const USER_AGENT_ENV_VAR: &str = "API_CLIENT_USER_AGENT";

/// How client credentials are presented to a token endpoint.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ClientAuthMethod {
    /// HTTP Basic Authentication header.
    #[default]
    ClientSecretBasic,
    /// client_id and client_secret in request body.
    ClientSecretPost,
}

/// Client configuration.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Per-request timeout; expiry fails with a transport timeout.
    pub timeout: Duration,
    /// Connect timeout.
    pub connect_timeout: Duration,
    /// User-Agent header.
    pub user_agent: String,
    /// Responses larger than this fail without being buffered.
    pub max_response_size: usize,
    /// Follow 3xx redirects.
    pub follow_redirects: bool,
    /// Client authentication at token endpoints.
    pub token_auth_method: ClientAuthMethod,
    /// Treat tokens as expired this long before their expiry.
    pub token_refresh_buffer: Duration,
    /// Headers added to every request unless the request sets them.
    pub default_headers: BTreeMap<String, String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            max_response_size: DEFAULT_MAX_RESPONSE_SIZE,
            follow_redirects: true,
            token_auth_method: ClientAuthMethod::default(),
            token_refresh_buffer: Duration::ZERO,
            default_headers: BTreeMap::new(),
        }
    }
}

impl ClientConfig {
    /// Defaults with overrides from the process environment.
    ///
    /// Unparseable values are ignored.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(secs) = std::env::var(TIMEOUT_ENV_VAR)
            .ok()
            .and_then(|v| v.trim().parse::<u64>().ok())
        {
            config.timeout = Duration::from_secs(secs);
        }
        if let Ok(user_agent) = std::env::var(USER_AGENT_ENV_VAR) {
            if !user_agent.trim().is_empty() {
                config.user_agent = user_agent;
            }
        }
        config
    }
}
