//! Pagination over the wire.

use super::*;
use api_auth::{
    ApiError, AuthStrategy, Cursor, EmbeddedCursor, JsonValue, Page, PageNumber, RequestSpec,
    Stage,
};
use futures::StreamExt;
use serde_json::json;
use tokio_test::{assert_err, assert_ok};
use wiremock::matchers::{method, path, query_param, query_param_is_missing};
use wiremock::{Mock, ResponseTemplate};

fn station_page(cursor: Cursor, value: JsonValue) -> Result<Page, ApiError> {
    let items = value["stations"].as_array().cloned().unwrap_or_default();
    let has_more = value["has_more"].as_bool().unwrap_or(false);
    Ok(Page::new(cursor, items, has_more))
}

#[tokio::test]
async fn test_page_number_traversal() {
    let server = setup_mock_server().await;
    Mock::given(method("GET"))
        .and(path("/stations"))
        .and(query_param_is_missing("page"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "stations": [{"id": 1}, {"id": 2}],
            "has_more": true
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/stations"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "stations": [{"id": 3}],
            "has_more": false
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_with_secrets(
        test_config(),
        SecretResolver::isolated().with_override("BIKES_API_KEY", "bk-1"),
    );
    let strategy = AuthStrategy::query_key("key", "BIKES_API_KEY");
    let items = assert_ok!(
        client
            .paginate(
                RequestSpec::get(format!("{}/stations", server.uri())),
                &strategy,
                "page",
                Cursor::Start,
                PageNumber::default(),
                station_page,
            )
            .collect_all()
            .await
    );

    let ids: Vec<i64> = items.iter().filter_map(|s| s["id"].as_i64()).collect();
    assert_eq!(ids, vec![1, 2, 3]);

    let requests = server.received_requests().await.unwrap();
    assert!(requests
        .iter()
        .all(|r| r.url.query().unwrap_or_default().contains("key=bk-1")));
}

#[tokio::test]
async fn test_embedded_cursor_stream() {
    let server = setup_mock_server().await;
    Mock::given(method("GET"))
        .and(path("/events"))
        .and(query_param_is_missing("after"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "events": ["a", "b"],
            "next": "c2"
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/events"))
        .and(query_param("after", "c2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "events": ["c"],
            "next": null
        })))
        .mount(&server)
        .await;

    let client = client_with_secrets(test_config(), SecretResolver::isolated());
    let strategy = AuthStrategy::None;
    let extract = |cursor: Cursor, value: JsonValue| {
        let items = value["events"].as_array().cloned().unwrap_or_default();
        let page = match value["next"].as_str() {
            Some(next) => Page::new(cursor, items, true).with_next_cursor(next),
            None => Page::new(cursor, items, false),
        };
        Ok::<_, ApiError>(page)
    };

    let pages: Vec<_> = client
        .paginate(
            RequestSpec::get(format!("{}/events", server.uri())),
            &strategy,
            "after",
            Cursor::Start,
            EmbeddedCursor,
            extract,
        )
        .into_stream()
        .collect()
        .await;

    assert_eq!(pages.len(), 2);
    let second = pages[1].as_ref().unwrap();
    assert_eq!(second.cursor, Cursor::Token("c2".to_string()));
    assert_eq!(second.items, vec![json!("c")]);
}

#[tokio::test]
async fn test_page_failure_ends_traversal() {
    let server = setup_mock_server().await;
    Mock::given(method("GET"))
        .and(path("/stations"))
        .and(query_param_is_missing("page"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "stations": [{"id": 1}],
            "has_more": true
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/stations"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream down"))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_with_secrets(test_config(), SecretResolver::isolated());
    let strategy = AuthStrategy::None;
    let mut pages = client.paginate(
        RequestSpec::get(format!("{}/stations", server.uri())),
        &strategy,
        "page",
        Cursor::Start,
        PageNumber::default(),
        station_page,
    );

    let first = assert_ok!(pages.next_page().await.unwrap());
    assert_eq!(first.len(), 1);

    let error = assert_err!(pages.next_page().await.unwrap());
    match &error {
        ApiError::Pagination { cursor, .. } => assert_eq!(cursor, "2"),
        other => panic!("expected pagination error, got {:?}", other),
    }
    assert_eq!(error.root_stage(), Stage::Http);
    assert_eq!(error.status(), Some(500));

    assert!(pages.next_page().await.is_none());
    assert!(pages.is_finished());
}
