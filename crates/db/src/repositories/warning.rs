//! Out-of-band warning tasks for unattended imports.
//!
//! When an unattended source commits a voucher whose registration number
//! failed verification, a human has to resolve it later. The task sink is
//! a collaborator trait; production deployments plug in their task or
//! notification system, and a sink failure never undoes the voucher.

use async_trait::async_trait;
use thiserror::Error;

use kicho_shared::types::VoucherId;

/// A follow-up task asking a human to resolve a bad registration number.
#[derive(Debug, Clone)]
pub struct WarningTask {
    /// Tenant key.
    pub company_code: String,
    /// The registration number that failed verification.
    pub registration_no: String,
    /// Human-readable verification outcome.
    pub message: String,
    /// Voucher number of the committed voucher.
    pub voucher_no: String,
    /// Identity of the committed voucher.
    pub voucher_id: VoucherId,
    /// User the task should be routed to, when known.
    pub target_user: Option<String>,
}

/// Error returned by a warning task sink.
#[derive(Debug, Error)]
#[error("Warning task sink error: {0}")]
pub struct WarningSinkError(pub String);

/// Receives warning tasks for human follow-up.
#[async_trait]
pub trait WarningTaskSink: Send + Sync {
    /// Records a warning task.
    ///
    /// # Errors
    ///
    /// Returns an error if the task cannot be recorded; callers log and
    /// swallow it.
    async fn create_warning_task(&self, task: WarningTask) -> Result<(), WarningSinkError>;
}

/// Default sink that records warning tasks in the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingWarningTaskSink;

#[async_trait]
impl WarningTaskSink for TracingWarningTaskSink {
    async fn create_warning_task(&self, task: WarningTask) -> Result<(), WarningSinkError> {
        tracing::warn!(
            company_code = %task.company_code,
            voucher_no = %task.voucher_no,
            voucher_id = %task.voucher_id,
            registration_no = %task.registration_no,
            target_user = task.target_user.as_deref().unwrap_or("-"),
            "invoice registration needs review: {}",
            task.message
        );
        Ok(())
    }
}
