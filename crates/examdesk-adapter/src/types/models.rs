/*
[INPUT]:  API schema definitions and serde requirements
[OUTPUT]: Typed Rust model structs with serialization support
[POS]:    Data layer - type definitions for API communication
[UPDATE]: When API schema changes or new types added
*/

use serde::{Deserialize, Serialize};

use super::enums::ImportStatus;

/// Outcome counters reported once an import task is terminal
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportResult {
    #[serde(default)]
    pub success_count: u64,
    #[serde(default)]
    pub failed_count: u64,
    #[serde(default)]
    pub errors: Vec<String>,
}

impl ImportResult {
    /// SUCCESS tasks may still carry rejected rows
    pub fn has_failures(&self) -> bool {
        self.failed_count > 0
    }
}

/// Status record returned by the import task endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportTaskStatus {
    pub task_id: String,
    pub status: ImportStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<ImportResult>,
}

impl ImportTaskStatus {
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_status_with_result() {
        let raw = r#"{
            "task_id": "task-123",
            "status": "SUCCESS",
            "result": {
                "success_count": 40,
                "failed_count": 5,
                "errors": ["row 3 invalid"]
            }
        }"#;

        let status: ImportTaskStatus = serde_json::from_str(raw).unwrap();
        assert_eq!(status.task_id, "task-123");
        assert!(status.is_terminal());

        let result = status.result.expect("result should be present");
        assert_eq!(result.success_count, 40);
        assert_eq!(result.failed_count, 5);
        assert_eq!(result.errors, vec!["row 3 invalid".to_string()]);
        assert!(result.has_failures());
    }

    #[test]
    fn test_pending_status_without_result() {
        let raw = r#"{"task_id": "task-9", "status": "PENDING"}"#;
        let status: ImportTaskStatus = serde_json::from_str(raw).unwrap();

        assert_eq!(status.status, ImportStatus::Pending);
        assert!(status.result.is_none());
        assert!(!status.is_terminal());
    }

    #[test]
    fn test_null_result_and_missing_counters() {
        let raw = r#"{"task_id": "t", "status": "FAILED", "result": null}"#;
        let status: ImportTaskStatus = serde_json::from_str(raw).unwrap();
        assert!(status.result.is_none());

        let raw = r#"{"task_id": "t", "status": "FAILED", "result": {"errors": ["bad header"]}}"#;
        let status: ImportTaskStatus = serde_json::from_str(raw).unwrap();
        let result = status.result.unwrap();
        assert_eq!(result.failed_count, 0);
        assert_eq!(result.success_count, 0);
        assert!(!result.has_failures());
        assert_eq!(result.errors.len(), 1);
    }

    #[test]
    fn test_serialize_skips_missing_result() {
        let status = ImportTaskStatus {
            task_id: "task-1".to_string(),
            status: ImportStatus::Processing,
            result: None,
        };
        let value = serde_json::to_value(&status).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"task_id": "task-1", "status": "PROCESSING"})
        );
    }
}
