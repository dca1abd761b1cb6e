//! Request execution and failure classification.

use super::*;
use api_auth::{ApiError, AuthStrategy, RequestSpec, Stage, TransportError};
use serde_json::json;
use tokio_test::{assert_err, assert_ok};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

#[tokio::test]
async fn test_not_found_is_http_status_error() {
    let server = setup_mock_server().await;
    Mock::given(method("GET"))
        .and(path("/stations/unknown"))
        .respond_with(ResponseTemplate::new(404).set_body_string(r#"{"error":"not found"}"#))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_with_secrets(test_config(), SecretResolver::isolated());
    let spec = RequestSpec::get(format!("{}/stations/unknown", server.uri()));

    let error = assert_err!(client.send(&spec, &AuthStrategy::None).await);
    match error {
        ApiError::HttpStatus { status, body, .. } => {
            assert_eq!(status, 404);
            assert_eq!(body, r#"{"error":"not found"}"#);
        }
        other => panic!("expected HttpStatus, got {:?}", other),
    }
}

#[tokio::test]
async fn test_query_key_and_json_body() {
    let server = setup_mock_server().await;
    Mock::given(method("GET"))
        .and(path("/geocode"))
        .and(query_param("q", "Leeds"))
        .and(query_param("key", "abc123"))
        .and(header("accept", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"lat": "53.7965", "lon": "-1.5478", "display_name": "Leeds"}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_with_secrets(
        test_config(),
        SecretResolver::isolated().with_override("GEOCODE_API_KEY", "abc123"),
    );
    let spec = RequestSpec::get(format!("{}/geocode", server.uri())).with_query("q", "Leeds");

    let value = assert_ok!(
        client
            .get_json(&spec, &AuthStrategy::query_key("key", "GEOCODE_API_KEY"))
            .await
    );
    assert_eq!(value[0]["display_name"], "Leeds");
}

#[tokio::test]
async fn test_bearer_header_sent() {
    let server = setup_mock_server().await;
    Mock::given(method("GET"))
        .and(path("/trends"))
        .and(header("authorization", "Bearer static-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"trends": []})))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_with_secrets(
        test_config(),
        SecretResolver::isolated().with_override("TRENDS_TOKEN", "static-token"),
    );
    let spec = RequestSpec::get(format!("{}/trends", server.uri()));

    assert_ok!(client.get_json(&spec, &AuthStrategy::bearer("TRENDS_TOKEN")).await);
}

#[tokio::test]
async fn test_server_error_not_retried() {
    let server = setup_mock_server().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503).insert_header("retry-after", "3"))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_with_secrets(test_config(), SecretResolver::isolated());
    let spec = RequestSpec::get(format!("{}/status", server.uri()));

    let error = assert_err!(client.send(&spec, &AuthStrategy::None).await);
    assert!(error.is_retryable());
    assert_eq!(error.retry_after(), Some(Duration::from_secs(3)));
}

#[tokio::test]
async fn test_timeout_is_transport_error() {
    let server = setup_mock_server().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({}))
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&server)
        .await;

    let config = api_client_config()
        .timeout(Duration::from_millis(100))
        .build()
        .unwrap();
    let client = client_with_secrets(config, SecretResolver::isolated());
    let spec = RequestSpec::get(format!("{}/slow", server.uri()));

    let error = assert_err!(client.send(&spec, &AuthStrategy::None).await);
    assert!(matches!(
        error,
        ApiError::Transport(TransportError::Timeout { .. })
    ));
    assert!(error.is_retryable());
}

#[tokio::test]
async fn test_connection_refused_is_transport_error() {
    let client = client_with_secrets(test_config(), SecretResolver::isolated());
    let spec = RequestSpec::get("http://127.0.0.1:1/unreachable").with_query("apiKey", "secret-value");

    let error = assert_err!(client.send(&spec, &AuthStrategy::None).await);
    assert_eq!(error.stage(), Stage::Transport);
    assert!(!error.to_string().contains("secret-value"));
}

#[tokio::test]
async fn test_oversized_response_rejected() {
    let server = setup_mock_server().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("x".repeat(4096)))
        .mount(&server)
        .await;

    let config = api_client_config().max_response_size(1024).build().unwrap();
    let client = client_with_secrets(config, SecretResolver::isolated());
    let spec = RequestSpec::get(format!("{}/big", server.uri()));

    let error = assert_err!(client.send(&spec, &AuthStrategy::None).await);
    assert!(matches!(
        error,
        ApiError::Transport(TransportError::ResponseTooLarge { limit: 1024, .. })
    ));
    assert!(!error.is_retryable());
}
