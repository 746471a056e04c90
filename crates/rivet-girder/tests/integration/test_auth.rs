//! Credential resolution, version gate, and URL normalization

use rivet_core::config::TransferConfig;
use rivet_core::domain::SyncError;
use rivet_girder::auth::{check_minimum_version, normalize_url, resolve_credential};
use rivet_girder::client::TOKEN_HEADER;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::common;

fn token_body(token: &str) -> serde_json::Value {
    serde_json::json!({
        "authToken": {"token": token, "expires": "2030-01-01T00:00:00Z"},
        "user": {"_id": "u1", "email": "alice@example.com"}
    })
}

// ============================================================================
// Version gate
// ============================================================================

#[tokio::test]
async fn test_version_2_2_9_is_rejected() {
    let (server, client) = common::setup_girder_mock().await;
    common::mount_version(&server, serde_json::json!({"release": "2.2.9"})).await;

    let err = check_minimum_version(&client).await.unwrap_err();
    assert!(matches!(err, SyncError::Version(_)));
    assert!(err.to_string().contains("2.2.9"));
}

#[tokio::test]
async fn test_version_2_3_0_release_is_accepted() {
    let (server, client) = common::setup_girder_mock().await;
    common::mount_version(&server, serde_json::json!({"release": "2.3.0"})).await;

    assert_eq!(check_minimum_version(&client).await.unwrap(), (2, 3));
}

#[tokio::test]
async fn test_api_version_used_when_release_missing() {
    let (server, client) = common::setup_girder_mock().await;
    common::mount_version(&server, serde_json::json!({"apiVersion": "2.4.0"})).await;

    assert_eq!(check_minimum_version(&client).await.unwrap(), (2, 4));
}

#[tokio::test]
async fn test_missing_version_fields_is_error() {
    let (server, client) = common::setup_girder_mock().await;
    common::mount_version(&server, serde_json::json!({"serverRoot": "/"})).await;

    let err = check_minimum_version(&client).await.unwrap_err();
    assert!(matches!(err, SyncError::Version(_)));
}

#[tokio::test]
async fn test_unparsable_version_is_error() {
    let (server, client) = common::setup_girder_mock().await;
    common::mount_version(&server, serde_json::json!({"release": "latest"})).await;

    assert!(matches!(
        check_minimum_version(&client).await,
        Err(SyncError::Version(_))
    ));
}

// ============================================================================
// Credential resolution
// ============================================================================

#[tokio::test]
async fn test_username_password_uses_basic_auth() {
    let server = MockServer::start().await;
    let mut client = common::fast_client(&server.uri());

    Mock::given(method("GET"))
        .and(path("/user/authentication"))
        .and(header("Authorization", "Basic YWxpY2U6c2VjcmV0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body(common::TOKEN)))
        .expect(1)
        .mount(&server)
        .await;

    let token = resolve_credential(&mut client, "alice:secret").await.unwrap();
    assert_eq!(token, common::TOKEN);
    assert_eq!(client.token(), Some(common::TOKEN));
}

#[tokio::test]
async fn test_failed_login_reports_server_message() {
    let server = MockServer::start().await;
    let mut client = common::fast_client(&server.uri());

    Mock::given(method("GET"))
        .and(path("/user/authentication"))
        .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
            "message": "Login failed.",
            "type": "access"
        })))
        .mount(&server)
        .await;

    let err = resolve_credential(&mut client, "alice:wrong").await.unwrap_err();
    assert_eq!(err.to_string(), "Authentication failed: Login failed.");
    assert!(client.token().is_none());
}

#[tokio::test]
async fn test_api_key_is_exchanged_for_token() {
    let server = MockServer::start().await;
    let mut client = common::fast_client(&server.uri());
    let key = "k".repeat(40);

    Mock::given(method("POST"))
        .and(path("/api_key/token"))
        .and(query_param("key", key.as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body(common::TOKEN)))
        .expect(1)
        .mount(&server)
        .await;

    let token = resolve_credential(&mut client, &key).await.unwrap();
    assert_eq!(token, common::TOKEN);
    assert_eq!(client.token(), Some(common::TOKEN));
}

#[tokio::test]
async fn test_token_is_checked_against_user_me() {
    let server = MockServer::start().await;
    let mut client = common::fast_client(&server.uri());

    Mock::given(method("GET"))
        .and(path("/user/me"))
        .and(header(TOKEN_HEADER, common::TOKEN))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"email": "alice@example.com"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let token = resolve_credential(&mut client, common::TOKEN).await.unwrap();
    assert_eq!(token, common::TOKEN);
}

#[tokio::test]
async fn test_null_user_is_rejected() {
    let server = MockServer::start().await;
    let mut client = common::fast_client(&server.uri());

    Mock::given(method("GET"))
        .and(path("/user/me"))
        .respond_with(ResponseTemplate::new(200).set_body_string("null"))
        .mount(&server)
        .await;

    let err = resolve_credential(&mut client, common::TOKEN).await.unwrap_err();
    assert!(matches!(err, SyncError::Auth(_)));
}

#[tokio::test]
async fn test_malformed_credential_makes_no_request() {
    let server = MockServer::start().await;
    let mut client = common::fast_client(&server.uri());

    Mock::given(wiremock::matchers::any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let err = resolve_credential(&mut client, "too-short").await.unwrap_err();
    assert_eq!(
        err.to_string(),
        "Authentication failed: unrecognized credential format"
    );
}

// ============================================================================
// URL normalization
// ============================================================================

fn fast_transfer() -> TransferConfig {
    TransferConfig {
        max_attempts: 2,
        retry_base_delay_ms: 1,
        retry_max_delay_ms: 5,
        ..TransferConfig::default()
    }
}

#[tokio::test]
async fn test_url_accepted_when_describe_answers() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/describe"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
        .mount(&server)
        .await;

    let url = normalize_url(&format!("{}/", server.uri()), &fast_transfer())
        .await
        .unwrap();
    assert_eq!(url, server.uri());
}

#[tokio::test]
async fn test_api_v1_appended_on_fallback() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/describe"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
        .mount(&server)
        .await;

    let url = normalize_url(&server.uri(), &fast_transfer()).await.unwrap();
    assert_eq!(url, format!("{}/api/v1", server.uri()));
}

#[tokio::test]
async fn test_unreachable_url_names_original_input() {
    let server = MockServer::start().await;
    let input = format!("{}/nowhere", server.uri());

    let err = normalize_url(&input, &fast_transfer()).await.unwrap_err();
    assert!(matches!(err, SyncError::Connectivity(_)));
    assert!(err.to_string().contains(&input));
}
