//! Error Types
//!
//! Error hierarchy for the authenticated API client. Every failure names the
//! stage it came from (secret, auth, token, transport, http, decode,
//! pagination) and never carries a raw secret value.

use std::fmt;
use std::time::Duration;
use thiserror::Error;

use crate::types::CredentialSource;

/// Root error type.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Secret error: {0}")]
    Secret(#[from] SecretError),

    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    #[error("Token error: {0}")]
    Token(#[from] TokenError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("HTTP status {status}: {body}")]
    HttpStatus {
        status: u16,
        body: String,
        retry_after: Option<Duration>,
    },

    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("Pagination failed at cursor {cursor}: {source}")]
    Pagination {
        cursor: String,
        #[source]
        source: Box<ApiError>,
    },

    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),
}

/// Pipeline stage a failure originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Secret,
    Auth,
    Token,
    Transport,
    Http,
    Decode,
    Pagination,
    Configuration,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Secret => "secret",
            Stage::Auth => "auth",
            Stage::Token => "token",
            Stage::Transport => "transport",
            Stage::Http => "http",
            Stage::Decode => "decode",
            Stage::Pagination => "pagination",
            Stage::Configuration => "configuration",
        };
        f.write_str(name)
    }
}

impl ApiError {
    /// Build an HTTP status error.
    pub fn http_status(status: u16, body: impl Into<String>) -> Self {
        Self::HttpStatus {
            status,
            body: body.into(),
            retry_after: None,
        }
    }

    /// Stage that produced this error.
    pub fn stage(&self) -> Stage {
        match self {
            Self::Secret(_) => Stage::Secret,
            Self::Auth(_) => Stage::Auth,
            Self::Token(_) => Stage::Token,
            Self::Transport(_) => Stage::Transport,
            Self::HttpStatus { .. } => Stage::Http,
            Self::Decode(_) => Stage::Decode,
            Self::Pagination { .. } => Stage::Pagination,
            Self::Configuration(_) => Stage::Configuration,
        }
    }

    /// Stage of the innermost failure, looking through pagination wrappers.
    pub fn root_stage(&self) -> Stage {
        match self {
            Self::Pagination { source, .. } => source.root_stage(),
            other => other.stage(),
        }
    }

    /// Get error code for telemetry.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Secret(_) => "API_SECRET",
            Self::Auth(_) => "API_AUTH",
            Self::Token(_) => "API_TOKEN",
            Self::Transport(_) => "API_TRANSPORT",
            Self::HttpStatus { .. } => "API_HTTP_STATUS",
            Self::Decode(_) => "API_DECODE",
            Self::Pagination { .. } => "API_PAGINATION",
            Self::Configuration(_) => "API_CONFIG",
        }
    }

    /// HTTP status code, if a response was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::HttpStatus { status, .. } => Some(*status),
            Self::Pagination { source, .. } => source.status(),
            _ => None,
        }
    }

    /// Whether a caller-level retry policy may reasonably retry this error.
    ///
    /// The client itself never retries.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_retryable(),
            Self::HttpStatus { status, .. } => *status == 429 || (500..600).contains(status),
            Self::Pagination { source, .. } => source.is_retryable(),
            _ => false,
        }
    }

    /// Server-requested delay before retrying, if any.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::HttpStatus { retry_after, .. } => *retry_after,
            Self::Pagination { source, .. } => source.retry_after(),
            _ => None,
        }
    }
}

/// Secret resolution error.
#[derive(Error, Debug)]
pub enum SecretError {
    #[error("Secret not found: {name}")]
    NotFound { name: String },

    #[error("Secret {name} is empty in {origin}")]
    Empty {
        name: String,
        origin: CredentialSource,
    },

    #[error("Secret {name} could not be read from {origin}: {message}")]
    Unreadable {
        name: String,
        origin: CredentialSource,
        message: String,
    },
}

/// Authentication strategy error.
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Missing credential: {name}")]
    MissingCredential { name: String },

    #[error("Request signing failed: {reason}")]
    SigningFailed { reason: String },

    #[error("Token exchange failed: {reason}")]
    TokenExchangeFailed { reason: String },

    #[error("No stored token for client {client}")]
    NoStoredToken { client: String },
}

/// Token cache error.
#[derive(Error, Debug)]
pub enum TokenError {
    #[error("Token refresh failed: {reason}")]
    RefreshFailed { reason: String },
}

/// Transport failure: no usable response was received.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Request timeout after {timeout:?}")]
    Timeout { timeout: Duration },

    #[error("Connection failed: {message}")]
    ConnectionFailed { message: String },

    #[error("DNS resolution failed: {host}")]
    DnsFailure { host: String },

    #[error("Response too large: {size} bytes (limit {limit})")]
    ResponseTooLarge { size: usize, limit: usize },
}

impl TransportError {
    /// Check if error is retryable.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::ResponseTooLarge { .. })
    }
}

/// JSON decoding failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{reason} at line {line} column {column}")]
pub struct DecodeError {
    pub line: usize,
    pub column: usize,
    pub reason: String,
}

impl From<serde_json::Error> for DecodeError {
    fn from(err: serde_json::Error) -> Self {
        let reason = match err.classify() {
            serde_json::error::Category::Io => "io error",
            serde_json::error::Category::Syntax => "syntax error",
            serde_json::error::Category::Data => "unexpected data",
            serde_json::error::Category::Eof => "unexpected end of input",
        };
        Self {
            line: err.line(),
            column: err.column(),
            reason: format!("{}: {}", reason, strip_position(&err.to_string())),
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::Decode(err.into())
    }
}

// serde_json appends " at line X column Y"; position is carried separately.
fn strip_position(message: &str) -> &str {
    message
        .rfind(" at line ")
        .map(|idx| &message[..idx])
        .unwrap_or(message)
}

/// Invalid request description or client configuration.
#[derive(Error, Debug)]
pub enum ConfigurationError {
    #[error("Invalid URL {url}: {message}")]
    InvalidUrl { url: String, message: String },

    #[error("Invalid header {name}")]
    InvalidHeader { name: String },

    #[error("Missing required field: {field}")]
    MissingField { field: String },

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Failed to build HTTP client: {message}")]
    ClientBuild { message: String },
}

/// Result type for client operations.
pub type ApiResult<T> = Result<T, ApiError>;

/// OAuth2 error response from a token endpoint (RFC 6749 section 5.2).
#[derive(Debug, Clone, serde::Deserialize)]
pub struct OAuth2ErrorResponse {
    pub error: String,
    #[serde(default)]
    pub error_description: Option<String>,
}

/// Summarise a token endpoint rejection without echoing the request.
pub fn describe_token_endpoint_failure(status: u16, body: &str) -> String {
    match serde_json::from_str::<OAuth2ErrorResponse>(body) {
        Ok(response) => match response.error_description {
            Some(description) => format!("HTTP {} {}: {}", status, response.error, description),
            None => format!("HTTP {} {}", status, response.error),
        },
        Err(_) => format!("HTTP {}", status),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_is_retryable() {
        assert!(ApiError::Transport(TransportError::Timeout {
            timeout: Duration::from_secs(30)
        })
        .is_retryable());
        assert!(ApiError::http_status(429, "").is_retryable());
        assert!(ApiError::http_status(503, "").is_retryable());
        assert!(!ApiError::http_status(404, "").is_retryable());
        assert!(!ApiError::Auth(AuthError::MissingCredential {
            name: "API_KEY".to_string()
        })
        .is_retryable());
        assert!(!ApiError::Decode(DecodeError {
            line: 1,
            column: 1,
            reason: "syntax error".to_string()
        })
        .is_retryable());
    }

    #[test]
    fn test_stage_through_pagination() {
        let error = ApiError::Pagination {
            cursor: "2".to_string(),
            source: Box::new(ApiError::http_status(500, "boom")),
        };
        assert_eq!(error.stage(), Stage::Pagination);
        assert_eq!(error.root_stage(), Stage::Http);
        assert_eq!(error.status(), Some(500));
        assert!(error.is_retryable());
    }

    #[test]
    fn test_decode_error_from_serde() {
        let err = serde_json::from_str::<serde_json::Value>("{\"a\":\n tru}").unwrap_err();
        let decode: DecodeError = err.into();
        assert_eq!(decode.line, 2);
        assert!(decode.reason.starts_with("syntax error"));
        assert!(!decode.reason.contains("at line"));
    }

    #[test]
    fn test_describe_token_endpoint_failure() {
        let body = r#"{"error":"invalid_client","error_description":"Client authentication failed"}"#;
        assert_eq!(
            describe_token_endpoint_failure(401, body),
            "HTTP 401 invalid_client: Client authentication failed"
        );
        assert_eq!(describe_token_endpoint_failure(502, "<html>"), "HTTP 502");
    }
}
