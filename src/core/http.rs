//! HTTP Client
//!
//! Composes a [`RequestSpec`] into a transport request, performs exactly one
//! round trip and classifies the outcome. A response with status 400 or above
//! fails with [`ApiError::HttpStatus`]; anything below is a success whatever
//! its body says.

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use super::transport::{HttpRequest, HttpTransport, ReqwestHttpTransport};
use crate::error::{ApiError, ApiResult};
use crate::types::{ClientConfig, RequestSpec, Response};

/// Executes request descriptions over an injected transport.
#[derive(Clone)]
pub struct HttpClient {
    transport: Arc<dyn HttpTransport>,
    config: ClientConfig,
}

impl HttpClient {
    /// Create client backed by reqwest.
    pub fn new(config: ClientConfig) -> ApiResult<Self> {
        let transport = Arc::new(ReqwestHttpTransport::from_config(&config)?);
        Ok(Self { transport, config })
    }

    /// Create client with a custom transport.
    pub fn with_transport(config: ClientConfig, transport: Arc<dyn HttpTransport>) -> Self {
        Self { transport, config }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Execute a request description.
    pub async fn execute(&self, spec: &RequestSpec) -> ApiResult<Response> {
        let mut request = HttpRequest {
            method: spec.method(),
            url: spec.url()?,
            headers: spec.headers().clone(),
            body: None,
            timeout: None,
        };
        request
            .headers
            .entry("accept".to_string())
            .or_insert_with(|| "application/json".to_string());

        let response = self.send(request).await?;
        classify_status(response)
    }

    /// Send a prepared request without interpreting the status code.
    pub async fn send(&self, mut request: HttpRequest) -> ApiResult<Response> {
        for (name, value) in &self.config.default_headers {
            request
                .headers
                .entry(name.to_ascii_lowercase())
                .or_insert_with(|| value.clone());
        }
        request
            .headers
            .entry("user-agent".to_string())
            .or_insert_with(|| self.config.user_agent.clone());
        request.timeout.get_or_insert(self.config.timeout);

        let method = request.method.as_str();
        let target = request.redacted_target();
        debug!(method, target = %target, "Sending request");

        match self.transport.send(request).await {
            Ok(response) => {
                debug!(method, target = %target, status = response.status, "Received response");
                Ok(response)
            }
            Err(e) => {
                warn!(method, target = %target, error = %e, "Request failed");
                Err(e)
            }
        }
    }
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn classify_status(response: Response) -> ApiResult<Response> {
    if response.status < 400 {
        return Ok(response);
    }

    let retry_after = response
        .header("retry-after")
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs);

    Err(ApiError::HttpStatus {
        status: response.status,
        body: response.text(),
        retry_after,
    })
}
