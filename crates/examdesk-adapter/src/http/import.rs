/*
[INPUT]:  Import task identifiers and bearer token
[OUTPUT]: Import task status records
[POS]:    HTTP layer - import task endpoints (require bearer auth)
[UPDATE]: When adding import endpoints or changing the status payload
*/

use crate::http::{ExamdeskClient, ExamdeskError, Result};
use crate::types::ImportTaskStatus;
use reqwest::Method;

impl ExamdeskClient {
    /// Fetch the status of a background import task
    ///
    /// GET /api/v1/imports/tasks/{task_id}
    pub async fn fetch_import_status(&self, token: &str, task_id: &str) -> Result<ImportTaskStatus> {
        let builder = self.request_with_token(
            Method::GET,
            &["api", "v1", "imports", "tasks", task_id],
            token,
        )?;
        let status: ImportTaskStatus = self.send_json(builder).await?;

        if status.task_id != task_id {
            return Err(ExamdeskError::InvalidResponse(format!(
                "status for task {} returned for request {}",
                status.task_id, task_id
            )));
        }

        tracing::debug!(task_id, status = %status.status, "import status fetched");
        Ok(status)
    }
}
