/*
[INPUT]:  Token store operations and mock responses
[OUTPUT]: Test results for bearer token handling
[POS]:    Integration tests - authentication
[UPDATE]: When token handling changes
*/

mod common;

use common::{mock_bearer_token, setup_mock_server, status_json};
use examdesk_adapter::{ExamdeskClient, TokenStore};
use tokio_test::assert_ok;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, ResponseTemplate};

#[tokio::test]
async fn test_token_store_creation() {
    let store = TokenStore::new();
    assert!(store.is_expired());
    assert!(store.valid_token().is_none());
}

#[tokio::test]
async fn test_token_store_feeds_requests() {
    let server = setup_mock_server().await;
    let token = mock_bearer_token();
    let store = TokenStore::with_token(token.clone(), Some(3600));

    Mock::given(method("GET"))
        .and(path("/api/v1/imports/tasks/roster-7"))
        .and(header("authorization", format!("Bearer {token}").as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(status_json("roster-7", "PENDING")))
        .expect(1)
        .mount(&server)
        .await;

    let client = assert_ok!(ExamdeskClient::new(&server.uri()));
    let bearer = store.valid_token().expect("token should be valid");
    let status = assert_ok!(client.fetch_import_status(&bearer, "roster-7").await);
    assert_eq!(status.task_id, "roster-7");
}

#[tokio::test]
async fn test_token_change_wakes_subscribers() {
    let store = TokenStore::new();
    let mut rx = store.subscribe();

    store.set_token(mock_bearer_token(), None);
    assert_ok!(rx.changed().await);
    assert_eq!(
        rx.borrow().as_ref().map(|data| data.token.clone()),
        Some(mock_bearer_token())
    );

    store.clear();
    assert_ok!(rx.changed().await);
    assert!(rx.borrow().is_none());
}
