//! Token Types
//!
//! OAuth2 bearer tokens as held by the token cache.

use chrono::{DateTime, Duration, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::collections::BTreeSet;
use std::fmt;

/// Token response from a token endpoint.
#[derive(Clone, Deserialize)]
pub struct TokenResponse {
    /// Access token.
    pub access_token: String,
    /// Token type (usually "Bearer").
    #[serde(default = "default_token_type")]
    pub token_type: String,
    /// Expires in seconds.
    #[serde(default)]
    pub expires_in: Option<u64>,
    /// Refresh token.
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Granted scopes, space separated.
    #[serde(default)]
    pub scope: Option<String>,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

impl TokenResponse {
    /// Create a bare access token response.
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            token_type: default_token_type(),
            expires_in: None,
            refresh_token: None,
            scope: None,
        }
    }

    pub fn with_expires_in(mut self, seconds: u64) -> Self {
        self.expires_in = Some(seconds);
        self
    }

    pub fn with_refresh_token(mut self, refresh_token: impl Into<String>) -> Self {
        self.refresh_token = Some(refresh_token.into());
        self
    }
}

impl fmt::Debug for TokenResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenResponse")
            .field("access_token", &"[REDACTED]")
            .field("token_type", &self.token_type)
            .field("expires_in", &self.expires_in)
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "[REDACTED]"))
            .field("scope", &self.scope)
            .finish()
    }
}

/// Cache key: one token per client identity and scope set.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TokenKey {
    pub client_identity: String,
    pub scopes: BTreeSet<String>,
}

impl TokenKey {
    pub fn new<I, S>(client_identity: impl Into<String>, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            client_identity: client_identity.into(),
            scopes: scopes.into_iter().map(Into::into).collect(),
        }
    }
}

impl fmt::Display for TokenKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.scopes.is_empty() {
            write!(f, "{}", self.client_identity)
        } else {
            let scopes: Vec<&str> = self.scopes.iter().map(String::as_str).collect();
            write!(f, "{}[{}]", self.client_identity, scopes.join(" "))
        }
    }
}

/// Bearer token owned by the token cache.
#[derive(Clone)]
pub struct Token {
    access_token: SecretString,
    refresh_token: Option<SecretString>,
    /// Expiration time; `None` never expires.
    pub expiry: Option<DateTime<Utc>>,
    /// Scopes the token was issued for.
    pub scopes: BTreeSet<String>,
    /// Client the token belongs to.
    pub client_identity: String,
}

impl Token {
    /// Create new token.
    pub fn new(
        access_token: impl Into<String>,
        expiry: Option<DateTime<Utc>>,
        scopes: BTreeSet<String>,
        client_identity: impl Into<String>,
    ) -> Self {
        Self {
            access_token: SecretString::new(access_token.into()),
            refresh_token: None,
            expiry,
            scopes,
            client_identity: client_identity.into(),
        }
    }

    /// Build a token for `key` from a token endpoint response.
    ///
    /// A missing `expires_in`, or one too large to represent as an instant,
    /// yields a non-expiring token.
    pub fn from_response(key: &TokenKey, response: &TokenResponse) -> Self {
        let expiry = response.expires_in.and_then(|secs| {
            i64::try_from(secs)
                .ok()
                .and_then(Duration::try_seconds)
                .and_then(|lifetime| Utc::now().checked_add_signed(lifetime))
        });
        let mut token = Self::new(
            response.access_token.clone(),
            expiry,
            key.scopes.clone(),
            key.client_identity.clone(),
        );
        token.refresh_token = response
            .refresh_token
            .as_ref()
            .map(|rt| SecretString::new(rt.clone()));
        token
    }

    pub fn with_refresh_token(mut self, refresh_token: impl Into<String>) -> Self {
        self.refresh_token = Some(SecretString::new(refresh_token.into()));
        self
    }

    /// Access token value.
    pub fn secret(&self) -> &str {
        self.access_token.expose_secret()
    }

    /// Refresh token value, if the issuer supplied one.
    pub fn refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_ref().map(|rt| rt.expose_secret().as_str())
    }

    /// Valid while `now + buffer < expiry`.
    pub fn is_valid(&self, buffer: Duration) -> bool {
        match self.expiry {
            Some(expiry) => Utc::now() + buffer < expiry,
            None => true,
        }
    }

    pub fn is_expired(&self) -> bool {
        !self.is_valid(Duration::zero())
    }

    /// Format as Authorization header value.
    pub fn authorization_header(&self) -> String {
        format!("Bearer {}", self.access_token.expose_secret())
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Token")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "[REDACTED]"))
            .field("expiry", &self.expiry)
            .field("scopes", &self.scopes)
            .field("client_identity", &self.client_identity)
            .finish()
    }
}
