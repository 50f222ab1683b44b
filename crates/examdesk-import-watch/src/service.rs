/*
[INPUT]:  Bearer token and import task id
[OUTPUT]: ImportTaskStatus from the remote task-status API
[POS]:    Collaborator seam - remote status lookups behind a trait
[UPDATE]: When the status endpoint or client binding changes
*/

use async_trait::async_trait;
use examdesk_adapter::{ExamdeskClient, ImportTaskStatus};

/// Remote lookup of an import task's status. May fail; callers decide the policy.
#[async_trait]
pub trait TaskStatusService: Send + Sync {
    async fn fetch_status(
        &self,
        token: &str,
        task_id: &str,
    ) -> examdesk_adapter::Result<ImportTaskStatus>;
}

#[async_trait]
impl TaskStatusService for ExamdeskClient {
    async fn fetch_status(
        &self,
        token: &str,
        task_id: &str,
    ) -> examdesk_adapter::Result<ImportTaskStatus> {
        self.fetch_import_status(token, task_id).await
    }
}
