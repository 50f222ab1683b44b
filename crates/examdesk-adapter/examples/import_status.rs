/*
[INPUT]:  API base URL, bearer token and import task id from the environment
[OUTPUT]: Current status of one import task
[POS]:    Examples - import status lookup demonstration
[UPDATE]: When the import endpoint or client API changes
*/

use examdesk_adapter::*;

/// Example: one-shot import status lookup
///
/// Usage:
///   EXAMDESK_BASE_URL=https://exam.example.edu \
///   EXAMDESK_TOKEN=... \
///   cargo run --example import_status -- task-123
#[tokio::main]
async fn main() {
    let base_url =
        std::env::var("EXAMDESK_BASE_URL").unwrap_or_else(|_| "http://localhost:8080".to_string());
    let Some(task_id) = std::env::args().nth(1) else {
        eprintln!("usage: import_status <TASK_ID>");
        return;
    };

    let tokens = TokenStore::new();
    if let Ok(token) = std::env::var("EXAMDESK_TOKEN") {
        tokens.set_token(token, None);
    }
    let Some(token) = tokens.valid_token() else {
        eprintln!("EXAMDESK_TOKEN is not set");
        return;
    };

    let client = match ExamdeskClient::new(&base_url) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to create client: {}", e);
            return;
        }
    };
    println!("✓ HTTP client created for {}", client.base_url());

    match client.fetch_import_status(&token, &task_id).await {
        Ok(status) => {
            println!("✓ Task {} is {}", status.task_id, status.status);
            if let Some(result) = status.result {
                println!("  imported: {}", result.success_count);
                println!("  failed:   {}", result.failed_count);
                for error in &result.errors {
                    println!("  - {}", error);
                }
            }
        }
        Err(e) if e.is_auth_error() => eprintln!("✗ Token rejected: {}", e),
        Err(e) => eprintln!("✗ Status check failed: {}", e),
    }
}
