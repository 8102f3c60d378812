//! Job state manager
//!
//! Applies lifecycle transitions to export job records and answers status
//! queries. Every write goes through [`JobState::can_transition_to`].

use crate::adapters::store::JobStore;
use crate::core::state::job::{ExportJob, JobState};
use crate::domain::ids::JobId;
use crate::domain::{ExportError, Result};
use chrono::Utc;
use std::sync::Arc;

/// State manager for export job records
#[derive(Clone)]
pub struct JobStateManager {
    store: Arc<dyn JobStore>,
}

impl JobStateManager {
    /// Create a new JobStateManager over a job store
    pub fn new(store: Arc<dyn JobStore>) -> Self {
        Self { store }
    }

    /// Ensures the bookkeeping collection for job records exists
    pub async fn ensure_exports_collection(&self) -> Result<()> {
        self.store.ensure_exports_collection().await
    }

    /// Creates and persists a new job in state CREATED
    pub async fn create(&self) -> Result<ExportJob> {
        let job = ExportJob::new(JobId::generate());
        self.store.create(&job).await?;
        tracing::debug!(job_id = %job.id, "Created export job");
        Ok(job)
    }

    async fn load(&self, id: JobId) -> Result<ExportJob> {
        self.store
            .get(id)
            .await?
            .ok_or_else(|| ExportError::JobNotFound(id.to_string()))
    }

    /// Moves a job to `next`
    ///
    /// Entering STARTED clears any message left by a previous failed run.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition` if the move would go backwards, and
    /// `JobNotFound` if the record does not exist.
    pub async fn transition(&self, id: JobId, next: JobState) -> Result<ExportJob> {
        let mut job = self.load(id).await?;

        if !job.state.can_transition_to(next) {
            return Err(ExportError::InvalidTransition {
                from: job.state.to_string(),
                to: next.to_string(),
            });
        }

        if next == JobState::Started {
            job.error_message = None;
        }
        job.state = next;
        job.updated_at = Utc::now();
        self.store.update(&job).await?;

        tracing::debug!(job_id = %id, state = %next, "Export job state changed");
        Ok(job)
    }

    /// Marks a job FAILED with `message`
    ///
    /// A job that already failed keeps its state and takes the newer message.
    pub async fn record_failure(&self, id: JobId, message: impl Into<String>) -> Result<ExportJob> {
        let mut job = self.load(id).await?;

        if !job.state.can_transition_to(JobState::Failed) {
            return Err(ExportError::InvalidTransition {
                from: job.state.to_string(),
                to: JobState::Failed.to_string(),
            });
        }

        job.state = JobState::Failed;
        job.error_message = Some(message.into());
        job.updated_at = Utc::now();
        self.store.update(&job).await?;

        tracing::debug!(job_id = %id, "Export job marked failed");
        Ok(job)
    }

    /// Stores a message on the job without changing its state
    pub async fn record_message(&self, id: JobId, message: impl Into<String>) -> Result<()> {
        let mut job = self.load(id).await?;
        job.error_message = Some(message.into());
        job.updated_at = Utc::now();
        self.store.update(&job).await
    }

    /// Current state of a job, `None` if unknown
    pub async fn get_state(&self, id: JobId) -> Result<Option<JobState>> {
        Ok(self.store.get(id).await?.map(|job| job.state))
    }

    /// Last error message of a job, `None` if unknown or never failed
    pub async fn get_error_message(&self, id: JobId) -> Result<Option<String>> {
        Ok(self.store.get(id).await?.and_then(|job| job.error_message))
    }
}
