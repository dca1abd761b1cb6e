//! API Client
//!
//! High-level client combining secret resolution, authentication, request
//! execution, JSON decoding and pagination.

use futures::future::BoxFuture;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::{debug, instrument};

use crate::auth::{AuthContext, AuthStrategy};
use crate::core::{HttpClient, HttpTransport};
use crate::error::{ApiResult, ConfigurationError};
use crate::json::{self, JsonValue};
use crate::pagination::{AdvanceRule, Cursor, Page, Paginator};
use crate::secrets::SecretResolver;
use crate::token::{TokenCache, TokenExchanger};
use crate::types::{ClientConfig, RequestSpec, Response, Token, TokenResponse};

/// Boxed page fetch function produced by [`ApiClient::paginate`].
pub type PageFetcher<'a> = Box<dyn FnMut(Cursor) -> BoxFuture<'a, ApiResult<Page>> + Send + 'a>;

/// Authenticated JSON API client.
pub struct ApiClient {
    http: HttpClient,
    secrets: Arc<SecretResolver>,
    tokens: Arc<TokenCache>,
    exchanger: TokenExchanger,
}

impl ApiClient {
    /// Create a client with the reqwest transport, reading secrets from the
    /// process environment.
    pub fn new(config: ClientConfig) -> ApiResult<Self> {
        let http = HttpClient::new(config)?;
        Ok(Self::from_parts(http, SecretResolver::new()))
    }

    /// Create a client with a custom transport and secret resolver.
    pub fn with_components(
        config: ClientConfig,
        transport: Arc<dyn HttpTransport>,
        secrets: SecretResolver,
    ) -> Self {
        Self::from_parts(HttpClient::with_transport(config, transport), secrets)
    }

    fn from_parts(http: HttpClient, secrets: SecretResolver) -> Self {
        let tokens = TokenCache::new().with_refresh_buffer(http.config().token_refresh_buffer);
        let exchanger = TokenExchanger::new(http.clone());
        Self {
            http,
            secrets: Arc::new(secrets),
            tokens: Arc::new(tokens),
            exchanger,
        }
    }

    /// Get the client configuration.
    pub fn config(&self) -> &ClientConfig {
        self.http.config()
    }

    pub fn secrets(&self) -> &SecretResolver {
        &self.secrets
    }

    pub fn token_cache(&self) -> &TokenCache {
        &self.tokens
    }

    fn auth_context(&self) -> AuthContext<'_> {
        AuthContext {
            secrets: &self.secrets,
            tokens: &self.tokens,
            exchanger: &self.exchanger,
        }
    }

    /// Apply `strategy` to `spec`, returning the decorated request.
    pub async fn authorize(
        &self,
        spec: &RequestSpec,
        strategy: &AuthStrategy,
    ) -> ApiResult<RequestSpec> {
        strategy.apply(spec, &self.auth_context()).await
    }

    /// Execute an already authorized request.
    pub async fn execute(&self, spec: &RequestSpec) -> ApiResult<Response> {
        self.http.execute(spec).await
    }

    /// Authorize and execute a request.
    #[instrument(skip(self, spec, strategy), fields(scheme = strategy.scheme()))]
    pub async fn send(&self, spec: &RequestSpec, strategy: &AuthStrategy) -> ApiResult<Response> {
        let authorized = self.authorize(spec, strategy).await?;
        self.http.execute(&authorized).await
    }

    /// Authorize, execute and decode the body as a JSON value.
    pub async fn get_json(
        &self,
        spec: &RequestSpec,
        strategy: &AuthStrategy,
    ) -> ApiResult<JsonValue> {
        let response = self.send(spec, strategy).await?;
        Ok(json::decode(&response.body)?)
    }

    /// Authorize, execute and decode the body into `T`.
    pub async fn get_typed<T: DeserializeOwned>(
        &self,
        spec: &RequestSpec,
        strategy: &AuthStrategy,
    ) -> ApiResult<T> {
        let response = self.send(spec, strategy).await?;
        Ok(json::decode_as(&response.body)?)
    }

    /// Seed the token cache with a token obtained out-of-band, typically
    /// through an interactive authorization-code consent.
    pub fn store_token(&self, strategy: &AuthStrategy, response: &TokenResponse) -> ApiResult<()> {
        let key = strategy
            .token_key()
            .ok_or_else(|| ConfigurationError::InvalidValue {
                field: "strategy".to_string(),
                reason: format!("{} does not use cached tokens", strategy.scheme()),
            })?;
        let token = Token::from_response(&key, response);
        self.tokens.insert(key, token);
        Ok(())
    }

    /// Lazily walk a paginated endpoint.
    ///
    /// Each page is requested with `cursor_param` set from the current cursor
    /// (omitted for [`Cursor::Start`]), authorized with `strategy`, decoded,
    /// and turned into a [`Page`] by `extract`.
    pub fn paginate<'a, X>(
        &'a self,
        spec: RequestSpec,
        strategy: &'a AuthStrategy,
        cursor_param: impl Into<String>,
        initial: Cursor,
        rule: impl AdvanceRule + 'static,
        extract: X,
    ) -> Paginator<PageFetcher<'a>>
    where
        X: Fn(Cursor, JsonValue) -> ApiResult<Page> + Send + Sync + 'a,
    {
        let cursor_param = cursor_param.into();
        let extract = Arc::new(extract);

        let fetch: PageFetcher<'a> = Box::new(move |cursor: Cursor| {
            let request = spec
                .clone()
                .with_optional_query(cursor_param.clone(), cursor.query_value());
            let extract = extract.clone();
            Box::pin(async move {
                debug!(cursor = %cursor, "Requesting page");
                let value = self.get_json(&request, strategy).await?;
                extract(cursor, value)
            })
        });

        Paginator::new(fetch, initial, rule)
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("http", &self.http)
            .field("secrets", &self.secrets)
            .field("tokens", &self.tokens)
            .finish()
    }
}
