//! Transport behavior: headers, retries, and failure decoding

use reqwest::Method;
use rivet_girder::client::{TOKEN_HEADER, USER_AGENT};
use rivet_girder::GirderError;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, ResponseTemplate};

use crate::common;

#[tokio::test]
async fn test_every_request_carries_token_and_user_agent() {
    let (server, client) = common::setup_girder_mock().await;

    Mock::given(method("GET"))
        .and(path("/folder/abc"))
        .and(header(TOKEN_HEADER, common::TOKEN))
        .and(header("User-Agent", USER_AGENT))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"_id": "abc", "name": "root"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let folder: serde_json::Value = client.get_json("folder/abc", &[]).await.unwrap();
    assert_eq!(folder["name"], "root");
}

#[tokio::test]
async fn test_server_errors_are_retried_until_success() {
    let (server, client) = common::setup_girder_mock().await;

    Mock::given(method("GET"))
        .and(path("/describe"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/describe"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let response = client.send(Method::GET, "describe", &[]).await.unwrap();
    assert_eq!(response.status().as_u16(), 200);
}

#[tokio::test]
async fn test_rate_limited_requests_are_retried() {
    let (server, client) = common::setup_girder_mock().await;

    Mock::given(method("POST"))
        .and(path("/item"))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/item"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"_id": "i1", "name": "a"})),
        )
        .mount(&server)
        .await;

    let item: serde_json::Value = client.post_json("item", &[("name", "a")]).await.unwrap();
    assert_eq!(item["_id"], "i1");
}

#[tokio::test]
async fn test_retries_stop_at_max_attempts() {
    let (server, client) = common::setup_girder_mock().await;

    Mock::given(method("GET"))
        .and(path("/item/x/files"))
        .respond_with(ResponseTemplate::new(500).set_body_json(serde_json::json!({
            "message": "database unavailable"
        })))
        .expect(3)
        .mount(&server)
        .await;

    let err = client
        .get_json::<serde_json::Value>("item/x/files", &[])
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(500));
    assert_eq!(err.to_string(), "database unavailable");
}

#[tokio::test]
async fn test_client_errors_are_not_retried() {
    let (server, client) = common::setup_girder_mock().await;

    Mock::given(method("POST"))
        .and(path("/folder"))
        .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
            "message": "Invalid folder name",
            "type": "validation"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let err = client
        .post_json::<serde_json::Value>("folder", &[("name", "")])
        .await
        .unwrap_err();
    match err {
        GirderError::Remote { status, message } => {
            assert_eq!(status, 400);
            assert_eq!(message, "Invalid folder name");
        }
        other => panic!("expected remote error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_undecodable_failure_body_reports_status() {
    let (server, client) = common::setup_girder_mock().await;

    Mock::given(method("GET"))
        .and(path("/folder/abc"))
        .respond_with(ResponseTemplate::new(403).set_body_string("<html>forbidden</html>"))
        .mount(&server)
        .await;

    let err = client
        .get_json::<serde_json::Value>("folder/abc", &[])
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "HTTP 403");
}

#[tokio::test]
async fn test_malformed_success_body_is_invalid_response() {
    let (server, client) = common::setup_girder_mock().await;

    Mock::given(method("GET"))
        .and(path("/item/abc/files"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let err = client
        .get_json::<Vec<serde_json::Value>>("item/abc/files", &[])
        .await
        .unwrap_err();
    assert!(matches!(err, GirderError::InvalidResponse(_)));
}

#[tokio::test]
async fn test_connection_refused_is_network_error() {
    // Nothing listens on port 9 of localhost
    let client = common::fast_client("http://127.0.0.1:9/api/v1");
    let err = client
        .get_json::<serde_json::Value>("describe", &[])
        .await
        .unwrap_err();
    assert!(matches!(err, GirderError::Network(_)));
}
