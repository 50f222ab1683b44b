/*
[INPUT]:  Mock HTTP responses
[OUTPUT]: Test results for HTTP client
[POS]:    Integration tests - import status endpoint
[UPDATE]: When HTTP endpoints change
*/

mod common;

use common::{mock_bearer_token, setup_mock_server, status_json};
use examdesk_adapter::{ClientConfig, ExamdeskClient, ExamdeskError, ImportStatus};
use std::time::Duration;
use tokio_test::assert_ok;
use wiremock::matchers::{header, header_exists, method, path};
use wiremock::{Mock, ResponseTemplate};

#[test]
fn test_client_creation() {
    let _client = assert_ok!(ExamdeskClient::new("https://exam.example.edu"));
}

#[test]
fn test_client_with_config() {
    let config = ClientConfig::default();
    let client = assert_ok!(ExamdeskClient::with_config(config, "http://127.0.0.1:8080"));
    assert_eq!(client.base_url().as_str(), "http://127.0.0.1:8080/");
}

#[tokio::test]
async fn test_fetch_import_status_processing() {
    let server = setup_mock_server().await;
    let token = mock_bearer_token();

    Mock::given(method("GET"))
        .and(path("/api/v1/imports/tasks/task-123"))
        .and(header("authorization", format!("Bearer {token}").as_str()))
        .and(header_exists("x-request-id"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(status_json("task-123", "PROCESSING")),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = assert_ok!(ExamdeskClient::new(&server.uri()));
    let status = assert_ok!(client.fetch_import_status(&token, "task-123").await);

    assert_eq!(status.task_id, "task-123");
    assert_eq!(status.status, ImportStatus::Processing);
    assert!(status.result.is_none());
}

#[tokio::test]
async fn test_fetch_import_status_success_with_result() {
    let server = setup_mock_server().await;
    let token = mock_bearer_token();

    Mock::given(method("GET"))
        .and(path("/api/v1/imports/tasks/task-123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "task_id": "task-123",
            "status": "SUCCESS",
            "result": {
                "success_count": 40,
                "failed_count": 5,
                "errors": ["row 3 invalid"],
            },
        })))
        .mount(&server)
        .await;

    let client = assert_ok!(ExamdeskClient::new(&server.uri()));
    let status = assert_ok!(client.fetch_import_status(&token, "task-123").await);

    let result = status.result.expect("terminal status carries a result");
    assert_eq!(result.success_count, 40);
    assert_eq!(result.failed_count, 5);
    assert_eq!(result.errors, vec!["row 3 invalid".to_string()]);
}

#[tokio::test]
async fn test_unauthorized_maps_to_auth_error() {
    let server = setup_mock_server().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/imports/tasks/task-1"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(serde_json::json!({"detail": "token revoked"})),
        )
        .mount(&server)
        .await;

    let client = assert_ok!(ExamdeskClient::new(&server.uri()));
    let err = client
        .fetch_import_status("revoked", "task-1")
        .await
        .unwrap_err();

    match err {
        ExamdeskError::Authentication { message } => assert_eq!(message, "token revoked"),
        other => panic!("expected authentication error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_server_error_maps_to_api_error() {
    let server = setup_mock_server().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/imports/tasks/task-1"))
        .respond_with(ResponseTemplate::new(500).set_body_string("database unavailable"))
        .mount(&server)
        .await;

    let client = assert_ok!(ExamdeskClient::new(&server.uri()));
    let err = client
        .fetch_import_status(&mock_bearer_token(), "task-1")
        .await
        .unwrap_err();

    match err {
        ExamdeskError::Api { code, message } => {
            assert_eq!(code, 500);
            assert_eq!(message, "database unavailable");
        }
        other => panic!("expected api error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_rate_limit_reads_retry_after() {
    let server = setup_mock_server().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/imports/tasks/task-1"))
        .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "12"))
        .mount(&server)
        .await;

    let client = assert_ok!(ExamdeskClient::new(&server.uri()));
    let err = client
        .fetch_import_status(&mock_bearer_token(), "task-1")
        .await
        .unwrap_err();

    assert!(matches!(err, ExamdeskError::RateLimit { retry_after: 12 }));
    assert_eq!(err.status_code(), Some(429));
}

#[tokio::test]
async fn test_malformed_body_maps_to_serialization_error() {
    let server = setup_mock_server().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/imports/tasks/task-1"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&server)
        .await;

    let client = assert_ok!(ExamdeskClient::new(&server.uri()));
    let err = client
        .fetch_import_status(&mock_bearer_token(), "task-1")
        .await
        .unwrap_err();

    assert!(matches!(err, ExamdeskError::Serialization(_)));
}

#[tokio::test]
async fn test_mismatched_task_id_is_invalid_response() {
    let server = setup_mock_server().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/imports/tasks/task-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(status_json("task-2", "PENDING")))
        .mount(&server)
        .await;

    let client = assert_ok!(ExamdeskClient::new(&server.uri()));
    let err = client
        .fetch_import_status(&mock_bearer_token(), "task-1")
        .await
        .unwrap_err();

    assert!(matches!(err, ExamdeskError::InvalidResponse(_)));
}

#[tokio::test]
async fn test_slow_server_maps_to_timeout() {
    let server = setup_mock_server().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/imports/tasks/task-1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(status_json("task-1", "PENDING"))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let config = ClientConfig {
        timeout: Duration::from_millis(200),
        connect_timeout: Duration::from_millis(200),
    };
    let client = assert_ok!(ExamdeskClient::with_config(config, &server.uri()));
    let err = client
        .fetch_import_status(&mock_bearer_token(), "task-1")
        .await
        .unwrap_err();

    assert!(matches!(err, ExamdeskError::Timeout { .. }));
}
