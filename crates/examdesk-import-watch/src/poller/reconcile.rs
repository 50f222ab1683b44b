/*
[INPUT]:  ImportTaskStatus observations and fetch failures
[OUTPUT]: Side effects to emit and whether tracking ends
[POS]:    Poller domain logic - pure status classification
[UPDATE]: When status handling, messages or callback routing change
*/

use examdesk_adapter::{ImportResult, ImportStatus, ImportTaskStatus};

use crate::notify::NotificationKind;

pub const STATUS_CHECK_FAILED: &str = "Failed to check import status";
pub const IMPORT_FAILED: &str = "Import failed";
pub const DEFAULT_TASK_ERROR: &str = "Import task failed";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NotificationKind,
    pub message: String,
}

impl Notice {
    fn new(kind: NotificationKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// What one status observation asks the poller to do.
///
/// Emission order is notice, then `errors`, then `success`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Effects {
    pub terminal: bool,
    pub notice: Option<Notice>,
    pub errors: Option<Vec<String>>,
    pub success: Option<ImportResult>,
}

/// Classify a fetched status.
///
/// SUCCESS stays a success even when rows failed; the failures travel
/// through the error callback in addition to the success callback.
pub fn reconcile(status: &ImportTaskStatus) -> Effects {
    match status.status {
        ImportStatus::Pending | ImportStatus::Processing => Effects::default(),
        ImportStatus::Success => succeeded(status.result.as_ref()),
        ImportStatus::Failed => failed(status.result.as_ref()),
    }
}

/// The status request itself failed. Tracking is aborted, nothing is reported to callbacks.
pub fn transport_failure() -> Effects {
    Effects {
        terminal: true,
        notice: Some(Notice::new(NotificationKind::ErrorGeneric, STATUS_CHECK_FAILED)),
        errors: None,
        success: None,
    }
}

fn succeeded(result: Option<&ImportResult>) -> Effects {
    let Some(result) = result else {
        return Effects {
            terminal: true,
            notice: Some(Notice::new(
                NotificationKind::InfoSuccess,
                "Import completed",
            )),
            errors: None,
            success: None,
        };
    };

    if result.has_failures() {
        Effects {
            terminal: true,
            notice: Some(Notice::new(
                NotificationKind::WarningPartialFailure,
                format!(
                    "Import completed with {} failed record(s), {} imported",
                    result.failed_count, result.success_count
                ),
            )),
            errors: Some(result.errors.clone()),
            success: Some(result.clone()),
        }
    } else {
        Effects {
            terminal: true,
            notice: Some(Notice::new(
                NotificationKind::InfoSuccess,
                format!("Import completed: {} record(s) imported", result.success_count),
            )),
            errors: None,
            success: Some(result.clone()),
        }
    }
}

fn failed(result: Option<&ImportResult>) -> Effects {
    let errors = match result {
        Some(result) if !result.errors.is_empty() => result.errors.clone(),
        _ => vec![DEFAULT_TASK_ERROR.to_string()],
    };

    Effects {
        terminal: true,
        notice: Some(Notice::new(NotificationKind::ErrorGeneric, IMPORT_FAILED)),
        errors: Some(errors),
        success: None,
    }
}
