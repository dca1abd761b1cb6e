//! Authentication Strategies
//!
//! A closed set of schemes for decorating an outbound request with
//! credentials. Each variant is plain configuration naming the credentials it
//! needs; [`AuthStrategy::apply`] resolves them and returns a decorated copy
//! of the request, leaving the original untouched.

pub mod oauth1;

use chrono::Utc;
use std::collections::BTreeSet;
use tracing::{debug, instrument};

use crate::error::{ApiError, ApiResult, AuthError, TokenError};
use crate::secrets::SecretResolver;
use crate::token::{ClientCredentials, TokenCache, TokenExchanger};
use crate::types::{Credential, RequestSpec, Token, TokenKey};

/// Authentication scheme applied to a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthStrategy {
    /// No authentication.
    None,
    /// API key sent as a query parameter.
    QueryKeyParam {
        param_name: String,
        credential_name: String,
    },
    /// Static bearer token in the `Authorization` header.
    BearerHeader { credential_name: String },
    /// One-legged OAuth 1.0a, HMAC-SHA1 signed per request.
    OAuth1OneLegged {
        client_key: String,
        client_secret_name: String,
    },
    /// OAuth2 client-credentials grant with cached tokens.
    OAuth2ClientCredentials {
        client_key: String,
        client_secret_name: String,
        token_endpoint: String,
    },
    /// OAuth2 token obtained out-of-band through user consent, refreshed
    /// through the refresh grant.
    OAuth2AuthorizationCode {
        client_key: String,
        client_secret_name: String,
        token_endpoint: String,
        scopes: BTreeSet<String>,
    },
}

/// Collaborators a strategy draws on while applying.
#[derive(Debug, Clone, Copy)]
pub struct AuthContext<'a> {
    pub secrets: &'a SecretResolver,
    pub tokens: &'a TokenCache,
    pub exchanger: &'a TokenExchanger,
}

impl AuthStrategy {
    /// API key in the query string.
    pub fn query_key(param_name: impl Into<String>, credential_name: impl Into<String>) -> Self {
        Self::QueryKeyParam {
            param_name: param_name.into(),
            credential_name: credential_name.into(),
        }
    }

    /// Static bearer token.
    pub fn bearer(credential_name: impl Into<String>) -> Self {
        Self::BearerHeader {
            credential_name: credential_name.into(),
        }
    }

    /// One-legged OAuth1 signing.
    pub fn oauth1(client_key: impl Into<String>, client_secret_name: impl Into<String>) -> Self {
        Self::OAuth1OneLegged {
            client_key: client_key.into(),
            client_secret_name: client_secret_name.into(),
        }
    }

    /// OAuth2 client-credentials grant.
    pub fn client_credentials(
        client_key: impl Into<String>,
        client_secret_name: impl Into<String>,
        token_endpoint: impl Into<String>,
    ) -> Self {
        Self::OAuth2ClientCredentials {
            client_key: client_key.into(),
            client_secret_name: client_secret_name.into(),
            token_endpoint: token_endpoint.into(),
        }
    }

    /// OAuth2 authorization-code token for the given scopes.
    pub fn authorization_code<I, S>(
        client_key: impl Into<String>,
        client_secret_name: impl Into<String>,
        token_endpoint: impl Into<String>,
        scopes: I,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::OAuth2AuthorizationCode {
            client_key: client_key.into(),
            client_secret_name: client_secret_name.into(),
            token_endpoint: token_endpoint.into(),
            scopes: scopes.into_iter().map(Into::into).collect(),
        }
    }

    /// Short scheme name for logs.
    pub fn scheme(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::QueryKeyParam { .. } => "query_key",
            Self::BearerHeader { .. } => "bearer",
            Self::OAuth1OneLegged { .. } => "oauth1",
            Self::OAuth2ClientCredentials { .. } => "oauth2_client_credentials",
            Self::OAuth2AuthorizationCode { .. } => "oauth2_authorization_code",
        }
    }

    /// Token cache key used by the OAuth2 variants.
    pub fn token_key(&self) -> Option<TokenKey> {
        match self {
            Self::OAuth2ClientCredentials { client_key, .. } => {
                Some(TokenKey::new(client_key.clone(), Vec::<String>::new()))
            }
            Self::OAuth2AuthorizationCode {
                client_key, scopes, ..
            } => Some(TokenKey::new(client_key.clone(), scopes.iter().cloned())),
            _ => None,
        }
    }

    /// Return a copy of `spec` carrying this strategy's credentials.
    #[instrument(skip(self, spec, ctx), fields(scheme = self.scheme()))]
    pub async fn apply(&self, spec: &RequestSpec, ctx: &AuthContext<'_>) -> ApiResult<RequestSpec> {
        match self {
            Self::None => Ok(spec.clone()),

            Self::QueryKeyParam {
                param_name,
                credential_name,
            } => {
                let credential = resolve(ctx.secrets, credential_name).await?;
                Ok(spec.clone().with_query(param_name.clone(), credential.expose()))
            }

            Self::BearerHeader { credential_name } => {
                let credential = resolve(ctx.secrets, credential_name).await?;
                Ok(spec
                    .clone()
                    .with_header("authorization", format!("Bearer {}", credential.expose())))
            }

            Self::OAuth1OneLegged {
                client_key,
                client_secret_name,
            } => {
                let secret = resolve(ctx.secrets, client_secret_name).await?;
                let url = spec.url().map_err(|e| AuthError::SigningFailed {
                    reason: format!("malformed request URL: {}", e),
                })?;
                let nonce = oauth1::generate_nonce();
                let params = oauth1::SigningParams {
                    consumer_key: client_key,
                    nonce: &nonce,
                    timestamp: Utc::now().timestamp(),
                };
                let header =
                    oauth1::authorization_header(spec.method(), &url, secret.expose(), &params)?;
                Ok(spec.clone().with_header("authorization", header))
            }

            Self::OAuth2ClientCredentials {
                client_key,
                client_secret_name,
                token_endpoint,
            } => {
                let key = TokenKey::new(client_key.clone(), Vec::<String>::new());
                let token = ctx
                    .tokens
                    .get(&key, |_previous| {
                        request_client_token(ctx, &key, client_secret_name, token_endpoint)
                    })
                    .await?;
                Ok(with_bearer(spec, &token))
            }

            Self::OAuth2AuthorizationCode {
                client_key,
                client_secret_name,
                token_endpoint,
                scopes,
            } => {
                let key = TokenKey::new(client_key.clone(), scopes.iter().cloned());
                let token = ctx
                    .tokens
                    .get(&key, |previous| {
                        refresh_user_token(ctx, &key, previous, client_secret_name, token_endpoint)
                    })
                    .await?;
                Ok(with_bearer(spec, &token))
            }
        }
    }
}

async fn request_client_token(
    ctx: &AuthContext<'_>,
    key: &TokenKey,
    client_secret_name: &str,
    token_endpoint: &str,
) -> ApiResult<Token> {
    let secret = resolve(ctx.secrets, client_secret_name).await?;
    let client = ClientCredentials::new(key.client_identity.clone(), secret.expose());
    let response = ctx
        .exchanger
        .client_credentials(token_endpoint, &client, &key.scopes)
        .await?;
    Ok(Token::from_response(key, &response))
}

async fn refresh_user_token(
    ctx: &AuthContext<'_>,
    key: &TokenKey,
    previous: Option<Token>,
    client_secret_name: &str,
    token_endpoint: &str,
) -> ApiResult<Token> {
    let refresh_token = previous
        .as_ref()
        .and_then(Token::refresh_token)
        .ok_or_else(|| AuthError::NoStoredToken {
            client: key.to_string(),
        })?;

    let secret = resolve(ctx.secrets, client_secret_name).await?;
    let client = ClientCredentials::new(key.client_identity.clone(), secret.expose());
    debug!(key = %key, "Refreshing authorization-code token");

    let response = ctx
        .exchanger
        .refresh(token_endpoint, &client, refresh_token, &key.scopes)
        .await
        .map_err(|e| match e {
            ApiError::Token(_) => e,
            other => TokenError::RefreshFailed {
                reason: other.to_string(),
            }
            .into(),
        })?;
    Ok(Token::from_response(key, &response))
}

async fn resolve(secrets: &SecretResolver, name: &str) -> Result<Credential, AuthError> {
    secrets.resolve(name).await.map_err(|e| {
        debug!(error = %e, "Credential resolution failed");
        AuthError::MissingCredential {
            name: name.to_string(),
        }
    })
}

fn with_bearer(spec: &RequestSpec, token: &Token) -> RequestSpec {
    spec.clone()
        .with_header("authorization", token.authorization_header())
}
