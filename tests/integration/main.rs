//! Integration tests using WireMock
//!
//! These tests drive the client against a mock HTTP server through the real
//! reqwest transport: authentication, status classification, token exchange
//! and pagination over the wire.

mod auth_flows;
mod http_client;
mod pagination;

use api_auth::{api_client_config, ApiClient, ClientConfig, SecretResolver};
use std::time::Duration;
use wiremock::MockServer;

/// Helper to create a mock server.
pub async fn setup_mock_server() -> MockServer {
    MockServer::start().await
}

/// Default test configuration with a short timeout.
pub fn test_config() -> ClientConfig {
    api_client_config()
        .timeout(Duration::from_secs(5))
        .user_agent("api-auth-integration-tests")
        .build()
        .expect("valid test configuration")
}

/// Client over the reqwest transport with the given secrets.
pub fn client_with_secrets(config: ClientConfig, secrets: SecretResolver) -> ApiClient {
    let transport = api_auth::ReqwestHttpTransport::from_config(&config)
        .expect("Failed to build transport");
    ApiClient::with_components(config, std::sync::Arc::new(transport), secrets)
}
