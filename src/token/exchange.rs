//! Token Exchange
//!
//! Token endpoint calls: the client-credentials grant (RFC 6749 section 4.4)
//! and the refresh grant (section 6).

use base64::Engine;
use secrecy::{ExposeSecret, SecretString};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, instrument};

use crate::core::{HttpClient, HttpRequest};
use crate::error::{describe_token_endpoint_failure, ApiError, ApiResult, AuthError, TokenError};
use crate::types::{ClientAuthMethod, HttpMethod, TokenResponse};

/// Client identity presented to a token endpoint.
#[derive(Clone)]
pub struct ClientCredentials {
    pub client_id: String,
    client_secret: SecretString,
}

impl ClientCredentials {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: SecretString::new(client_secret.into()),
        }
    }
}

impl std::fmt::Debug for ClientCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .finish()
    }
}

#[derive(Clone, Copy)]
enum Grant {
    ClientCredentials,
    RefreshToken,
}

impl Grant {
    fn failure(self, reason: String) -> ApiError {
        match self {
            Grant::ClientCredentials => AuthError::TokenExchangeFailed { reason }.into(),
            Grant::RefreshToken => TokenError::RefreshFailed { reason }.into(),
        }
    }
}

/// Performs token endpoint exchanges over the shared HTTP client.
#[derive(Debug, Clone)]
pub struct TokenExchanger {
    http: HttpClient,
    auth_method: ClientAuthMethod,
}

impl TokenExchanger {
    /// Create new exchanger using the client's configured auth method.
    pub fn new(http: HttpClient) -> Self {
        let auth_method = http.config().token_auth_method;
        Self { http, auth_method }
    }

    pub fn with_auth_method(mut self, auth_method: ClientAuthMethod) -> Self {
        self.auth_method = auth_method;
        self
    }

    /// Request a token with the client-credentials grant.
    ///
    /// A rejection by the endpoint fails with `AuthError::TokenExchangeFailed`.
    #[instrument(skip(self, client), fields(client_id = %client.client_id))]
    pub async fn client_credentials(
        &self,
        token_endpoint: &str,
        client: &ClientCredentials,
        scopes: &BTreeSet<String>,
    ) -> ApiResult<TokenResponse> {
        let mut params = vec![("grant_type", "client_credentials".to_string())];
        if !scopes.is_empty() {
            params.push(("scope", join_scopes(scopes)));
        }

        self.request_token(Grant::ClientCredentials, token_endpoint, client, params)
            .await
    }

    /// Exchange a refresh token for a new access token.
    ///
    /// When the endpoint does not rotate the refresh token, the one passed in
    /// is carried over. A rejection fails with `TokenError::RefreshFailed`.
    #[instrument(skip(self, client, refresh_token), fields(client_id = %client.client_id))]
    pub async fn refresh(
        &self,
        token_endpoint: &str,
        client: &ClientCredentials,
        refresh_token: &str,
        scopes: &BTreeSet<String>,
    ) -> ApiResult<TokenResponse> {
        let mut params = vec![
            ("grant_type", "refresh_token".to_string()),
            ("refresh_token", refresh_token.to_string()),
        ];
        if !scopes.is_empty() {
            params.push(("scope", join_scopes(scopes)));
        }

        let mut response = self
            .request_token(Grant::RefreshToken, token_endpoint, client, params)
            .await?;
        if response.refresh_token.is_none() {
            response.refresh_token = Some(refresh_token.to_string());
        }
        Ok(response)
    }

    async fn request_token(
        &self,
        grant: Grant,
        token_endpoint: &str,
        client: &ClientCredentials,
        mut params: Vec<(&'static str, String)>,
    ) -> ApiResult<TokenResponse> {
        let url = url::Url::parse(token_endpoint)
            .map_err(|e| grant.failure(format!("invalid token endpoint: {}", e)))?;

        let mut headers = BTreeMap::new();
        headers.insert(
            "content-type".to_string(),
            "application/x-www-form-urlencoded".to_string(),
        );
        headers.insert("accept".to_string(), "application/json".to_string());

        match self.auth_method {
            ClientAuthMethod::ClientSecretBasic => {
                let credentials = format!(
                    "{}:{}",
                    client.client_id,
                    client.client_secret.expose_secret()
                );
                let encoded = base64::engine::general_purpose::STANDARD.encode(credentials);
                headers.insert("authorization".to_string(), format!("Basic {}", encoded));
            }
            ClientAuthMethod::ClientSecretPost => {
                params.push(("client_id", client.client_id.clone()));
                params.push((
                    "client_secret",
                    client.client_secret.expose_secret().to_string(),
                ));
            }
        }

        let body = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(params.iter().map(|(k, v)| (*k, v.as_str())))
            .finish();

        let request = HttpRequest {
            method: HttpMethod::Post,
            url,
            headers,
            body: Some(body),
            timeout: None,
        };

        let response = self.http.send(request).await?;

        if !(200..300).contains(&response.status) {
            return Err(grant.failure(describe_token_endpoint_failure(
                response.status,
                &response.text(),
            )));
        }

        let token: TokenResponse = crate::json::decode_as(&response.body).map_err(|e| {
            grant.failure(format!(
                "malformed token response at line {} column {}",
                e.line, e.column
            ))
        })?;

        debug!(expires_in = ?token.expires_in, "Token issued");
        Ok(token)
    }
}

fn join_scopes(scopes: &BTreeSet<String>) -> String {
    scopes.iter().map(String::as_str).collect::<Vec<_>>().join(" ")
}
