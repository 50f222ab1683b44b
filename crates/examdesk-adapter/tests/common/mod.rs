/*
[INPUT]:  Test configuration and mock server requirements
[OUTPUT]: Shared test utilities, fixtures, and mock helpers
[POS]:    Test infrastructure - shared across all test modules
[UPDATE]: When adding new test patterns or fixtures
*/

//! Common test utilities for examdesk-adapter tests

use wiremock::MockServer;

/// Setup a mock HTTP server for testing
pub async fn setup_mock_server() -> MockServer {
    MockServer::start().await
}

/// Mock bearer token for testing
pub fn mock_bearer_token() -> String {
    "eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9.test.signature".to_string()
}

/// Status payload as served by the import endpoint
#[allow(dead_code)]
pub fn status_json(task_id: &str, status: &str) -> serde_json::Value {
    serde_json::json!({
        "task_id": task_id,
        "status": status,
    })
}
