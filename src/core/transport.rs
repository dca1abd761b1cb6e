//! HTTP Transport
//!
//! HTTP transport interface and implementations. A transport performs one
//! round trip and reports only transport-level failures; status codes are
//! interpreted by [`HttpClient`](super::HttpClient).

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use parking_lot::Mutex;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::time::Duration;
use url::Url;

use crate::error::{ApiError, ApiResult, ConfigurationError, TransportError};
use crate::types::{ClientConfig, HttpMethod, Response};

/// HTTP request definition.
#[derive(Clone)]
pub struct HttpRequest {
    /// HTTP method.
    pub method: HttpMethod,
    /// Request URL, query included.
    pub url: Url,
    /// Request headers, names lowercased.
    pub headers: BTreeMap<String, String>,
    /// Request body.
    pub body: Option<String>,
    /// Request timeout.
    pub timeout: Option<Duration>,
}

impl HttpRequest {
    /// Host and path only, for logs and errors. The query may carry credentials.
    pub fn redacted_target(&self) -> String {
        format!("{}{}", self.url.host_str().unwrap_or_default(), self.url.path())
    }
}

impl std::fmt::Debug for HttpRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpRequest")
            .field("method", &self.method)
            .field("target", &self.redacted_target())
            .field("headers", &self.headers.keys().collect::<Vec<_>>())
            .field("body", &self.body.as_ref().map(|_| "[REDACTED]"))
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// HTTP transport interface (for dependency injection).
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Send an HTTP request.
    async fn send(&self, request: HttpRequest) -> ApiResult<Response>;
}

/// Default reqwest-based HTTP transport.
pub struct ReqwestHttpTransport {
    client: reqwest::Client,
    default_timeout: Duration,
    max_response_size: usize,
}

impl ReqwestHttpTransport {
    /// Create transport with default settings.
    pub fn new() -> ApiResult<Self> {
        Self::from_config(&ClientConfig::default())
    }

    /// Create transport from client configuration.
    pub fn from_config(config: &ClientConfig) -> ApiResult<Self> {
        let redirect = if config.follow_redirects {
            reqwest::redirect::Policy::limited(10)
        } else {
            reqwest::redirect::Policy::none()
        };

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .user_agent(config.user_agent.clone())
            .redirect(redirect)
            .build()
            .map_err(|e| ConfigurationError::ClientBuild {
                message: e.without_url().to_string(),
            })?;

        Ok(Self {
            client,
            default_timeout: config.timeout,
            max_response_size: config.max_response_size,
        })
    }

    fn classify(&self, error: reqwest::Error, timeout: Duration, url: &Url) -> ApiError {
        let error = error.without_url();
        let transport = if error.is_timeout() {
            TransportError::Timeout { timeout }
        } else if is_dns_failure(&error) {
            TransportError::DnsFailure {
                host: url.host_str().unwrap_or_default().to_string(),
            }
        } else {
            TransportError::ConnectionFailed {
                message: error_chain(&error),
            }
        };
        ApiError::Transport(transport)
    }
}

#[async_trait]
impl HttpTransport for ReqwestHttpTransport {
    async fn send(&self, request: HttpRequest) -> ApiResult<Response> {
        let timeout = request.timeout.unwrap_or(self.default_timeout);
        let url = request.url.clone();

        let mut builder = match request.method {
            HttpMethod::Get => self.client.get(url.clone()),
            HttpMethod::Post => self.client.post(url.clone()),
        };

        builder = builder.headers(header_map(&request.headers)?);

        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let mut response = builder
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| self.classify(e, timeout, &url))?;

        let status = response.status().as_u16();

        let mut headers = HashMap::new();
        for (key, value) in response.headers() {
            if let Ok(v) = value.to_str() {
                headers.insert(key.as_str().to_ascii_lowercase(), v.to_string());
            }
        }

        if let Some(len) = response.content_length() {
            if len as usize > self.max_response_size {
                return Err(TransportError::ResponseTooLarge {
                    size: len as usize,
                    limit: self.max_response_size,
                }
                .into());
            }
        }

        let mut body = BytesMut::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| self.classify(e, timeout, &url))?
        {
            if body.len() + chunk.len() > self.max_response_size {
                return Err(TransportError::ResponseTooLarge {
                    size: body.len() + chunk.len(),
                    limit: self.max_response_size,
                }
                .into());
            }
            body.extend_from_slice(&chunk);
        }

        Ok(Response {
            status,
            headers,
            body: body.freeze(),
        })
    }
}

fn header_map(headers: &BTreeMap<String, String>) -> ApiResult<HeaderMap> {
    let mut map = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        let invalid = || ConfigurationError::InvalidHeader { name: name.clone() };
        let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|_| invalid())?;
        let header_value = HeaderValue::from_str(value).map_err(|_| invalid())?;
        map.insert(header_name, header_value);
    }
    Ok(map)
}

fn error_chain(error: &(dyn std::error::Error + 'static)) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

fn is_dns_failure(error: &(dyn std::error::Error + 'static)) -> bool {
    let chain = error_chain(error).to_ascii_lowercase();
    ["dns error", "failed to lookup address", "name or service not known", "no such host"]
        .iter()
        .any(|marker| chain.contains(marker))
}

/// Mock HTTP transport for testing.
#[derive(Default)]
pub struct MockHttpTransport {
    responses: Mutex<VecDeque<ApiResult<Response>>>,
    request_history: Mutex<Vec<HttpRequest>>,
    default_response: Mutex<Option<Response>>,
}

impl MockHttpTransport {
    /// Create new mock transport.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response; responses are returned in queue order.
    pub fn queue_response(&self, response: Response) -> &Self {
        self.responses.lock().push_back(Ok(response));
        self
    }

    /// Queue a JSON response.
    pub fn queue_json_response(&self, status: u16, body: &serde_json::Value) -> &Self {
        let response = Response::new(status, Bytes::from(body.to_string()))
            .with_header("content-type", "application/json");
        self.queue_response(response)
    }

    /// Queue a transport failure.
    pub fn queue_error(&self, error: TransportError) -> &Self {
        self.responses.lock().push_back(Err(error.into()));
        self
    }

    /// Set default response when queue is empty.
    pub fn set_default_response(&self, response: Response) -> &Self {
        *self.default_response.lock() = Some(response);
        self
    }

    /// Get request history.
    pub fn get_requests(&self) -> Vec<HttpRequest> {
        self.request_history.lock().clone()
    }

    /// Get last request.
    pub fn get_last_request(&self) -> Option<HttpRequest> {
        self.request_history.lock().last().cloned()
    }

    /// Number of requests sent.
    pub fn request_count(&self) -> usize {
        self.request_history.lock().len()
    }
}

#[async_trait]
impl HttpTransport for MockHttpTransport {
    async fn send(&self, request: HttpRequest) -> ApiResult<Response> {
        self.request_history.lock().push(request);

        let queued = self.responses.lock().pop_front();
        match queued {
            Some(result) => result,
            None => self.default_response.lock().clone().ok_or_else(|| {
                TransportError::ConnectionFailed {
                    message: "No mock response available".to_string(),
                }
                .into()
            }),
        }
    }
}
