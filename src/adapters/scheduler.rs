//! Job scheduler seam
//!
//! The scheduler owns timing, retries and timeouts. The pipeline only hands
//! it a named job with a payload, and is later invoked with a
//! [`JobExecution`] describing the run.

use crate::core::export::Uploader;
use crate::domain::ids::JobId;
use crate::domain::{ExportFilter, ExportTarget, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Data carried from `schedule` to `run`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobPayload {
    /// Job record id
    pub export_id: JobId,

    /// Destination and scope
    pub target: ExportTarget,

    /// What to export
    #[serde(default)]
    pub filter: ExportFilter,

    /// Scheduling time in unix milliseconds; output files are named after it
    pub scheduled_at_millis: i64,
}

/// External scheduler accepting export jobs
#[async_trait]
pub trait JobScheduler: Send + Sync {
    /// Enqueues a job that must not start before `not_before`
    ///
    /// # Errors
    ///
    /// Returns `ExportError::Scheduler` if the job cannot be enqueued.
    async fn create_job(&self, name: &str, not_before: DateTime<Utc>, payload: JobPayload)
        -> Result<()>;
}

/// A running job as seen by the pipeline
#[async_trait]
pub trait JobExecution: Send + Sync {
    /// The payload the job was scheduled with
    fn payload(&self) -> &JobPayload;

    /// Signals liveness to the execution host
    async fn heartbeat(&self);

    /// Uploader to use instead of the default object-storage uploader
    fn uploader(&self) -> Option<Arc<dyn Uploader>> {
        None
    }
}
