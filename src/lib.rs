//! Authenticated JSON API Client
//!
//! Reusable plumbing for calling public and private JSON HTTP APIs: resolve a
//! credential, authenticate the request, execute it, decode the JSON body and
//! walk multi-page results.
//!
//! # Features
//!
//! - Secret resolution from inline overrides, the environment and a secret store
//! - API keys in the query string and static bearer tokens
//! - One-legged OAuth 1.0a signing (HMAC-SHA1)
//! - OAuth2 client-credentials grant with cached tokens (RFC 6749 Section 4.4)
//! - OAuth2 authorization-code tokens seeded out-of-band and refreshed (RFC 6749 Section 6)
//! - Lazy page-number and cursor pagination
//!
//! # Example
//!
//! ```rust,ignore
//! use api_auth::{api_client_config, ApiClient, AuthStrategy, RequestSpec};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = api_client_config()
//!         .timeout(std::time::Duration::from_secs(10))
//!         .build()?;
//!     let client = ApiClient::new(config)?;
//!
//!     let request = RequestSpec::get("https://newsapi.example.com/v2/everything")
//!         .with_query("q", "bicycles");
//!     let articles = client
//!         .get_json(&request, &AuthStrategy::query_key("apiKey", "NEWS_API_KEY"))
//!         .await?;
//!
//!     println!("{}", articles["totalResults"]);
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! - `types`: request, response, credential, token and configuration types
//! - `error`: error hierarchy naming the failing stage
//! - `secrets`: secret stores and the credential resolver
//! - `auth`: authentication strategies, including OAuth1 signing
//! - `token`: token cache and token endpoint exchanges
//! - `core`: HTTP transport and the executing client
//! - `json`: JSON decoding
//! - `pagination`: lazy multi-page traversal
//! - `resilience`: opt-in retry policy
//! - `builders`: fluent configuration builder
//! - `client`: high-level client combining all of the above

pub mod auth;
pub mod builders;
pub mod client;
pub mod core;
pub mod error;
pub mod json;
pub mod pagination;
pub mod resilience;
pub mod secrets;
pub mod token;
pub mod types;

// Re-export main client
pub use client::{ApiClient, PageFetcher};

// Re-export builders
pub use builders::{api_client_config, ClientConfigBuilder};

// Re-export errors
pub use error::{
    ApiError, ApiResult, AuthError, ConfigurationError, DecodeError, SecretError, Stage,
    TokenError, TransportError,
};

// Re-export types
pub use types::{
    ClientAuthMethod, ClientConfig, Credential, CredentialSource, HttpMethod, RequestSpec,
    Response, Token, TokenKey, TokenResponse,
};

// Re-export components
pub use auth::{AuthContext, AuthStrategy};
pub use core::{HttpClient, HttpRequest, HttpTransport, MockHttpTransport, ReqwestHttpTransport};
pub use json::JsonValue;
pub use pagination::{AdvanceRule, Cursor, EmbeddedCursor, Page, PageNumber, Paginator};
pub use resilience::{RetryConfig, RetryExecutor};
pub use secrets::{InMemorySecretStore, SecretResolver, SecretStore};
pub use token::{ClientCredentials, TokenCache, TokenExchanger};
