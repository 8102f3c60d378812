//! Export service - the public face of the pipeline
//!
//! Schedules export jobs, runs them when the scheduler calls back, and
//! answers status queries from the persisted job record.

use crate::adapters::scheduler::{JobExecution, JobPayload, JobScheduler};
use crate::adapters::store::{EntityStore, JobStore, ManagementDirectory};
use crate::config::PipelineConfig;
use crate::core::export::coordinator::ExportCoordinator;
use crate::core::export::heartbeat::HeartbeatGovernor;
use crate::core::export::summary::RunSummary;
use crate::core::export::uploader::{S3Uploader, Uploader};
use crate::core::state::{JobState, JobStateManager};
use crate::domain::ids::JobId;
use crate::domain::{ExportError, ExportFilter, ExportTarget, Result};
use chrono::{Duration, Utc};
use std::sync::Arc;
use std::time::Instant;

/// Job name handed to the scheduler
pub const EXPORT_JOB_NAME: &str = "exportJob";

/// Schedules, runs and reports on export jobs
pub struct ExportService {
    config: PipelineConfig,
    jobs: JobStateManager,
    scheduler: Arc<dyn JobScheduler>,
    directory: Arc<dyn ManagementDirectory>,
    entity_store: Arc<dyn EntityStore>,
    uploader: Arc<dyn Uploader>,
}

impl ExportService {
    /// Create a service that uploads to S3 with each target's credentials
    pub fn new(
        config: PipelineConfig,
        job_store: Arc<dyn JobStore>,
        scheduler: Arc<dyn JobScheduler>,
        directory: Arc<dyn ManagementDirectory>,
        entity_store: Arc<dyn EntityStore>,
    ) -> Self {
        let uploader = Arc::new(S3Uploader::new(
            config.storage.clone(),
            config.upload.clone(),
        ));

        Self {
            config,
            jobs: JobStateManager::new(job_store),
            scheduler,
            directory,
            entity_store,
            uploader,
        }
    }

    /// Replace the default uploader
    pub fn with_uploader(mut self, uploader: Arc<dyn Uploader>) -> Self {
        self.uploader = uploader;
        self
    }

    /// Schedule an export of everything the target's organization owns
    ///
    /// See [`ExportService::schedule_filtered`].
    pub async fn schedule(&self, target: Option<ExportTarget>) -> Result<Option<JobId>> {
        self.schedule_filtered(target, ExportFilter::new()).await
    }

    /// Schedule an export restricted by `filter`
    ///
    /// Creates the job record, moves it to SCHEDULED and enqueues it with
    /// the scheduler after the configured grace delay.
    ///
    /// A missing or invalid target is logged and nothing is scheduled:
    /// the call returns `Ok(None)` and no job record is created.
    ///
    /// # Errors
    ///
    /// Returns an error if the job record cannot be written, or if the
    /// scheduler refuses the job (the job is marked FAILED first).
    pub async fn schedule_filtered(
        &self,
        target: Option<ExportTarget>,
        filter: ExportFilter,
    ) -> Result<Option<JobId>> {
        let target = match checked_target(target) {
            Ok(target) => target,
            Err(err) => {
                tracing::error!(error = %err, "Export not scheduled");
                return Ok(None);
            }
        };

        self.jobs.ensure_exports_collection().await?;
        let job = self.jobs.create().await?;
        self.jobs.transition(job.id, JobState::Scheduled).await?;

        let now = Utc::now();
        let grace = i64::try_from(self.config.export.schedule_grace_ms).unwrap_or(0);
        let payload = JobPayload {
            export_id: job.id,
            target,
            filter,
            scheduled_at_millis: now.timestamp_millis(),
        };

        if let Err(err) = self
            .scheduler
            .create_job(EXPORT_JOB_NAME, now + Duration::milliseconds(grace), payload)
            .await
        {
            tracing::error!(job_id = %job.id, error = %err, "Failed to enqueue export job");
            self.jobs.record_failure(job.id, err.to_string()).await?;
            return Err(err);
        }

        tracing::info!(job_id = %job.id, "Export job scheduled");
        Ok(Some(job.id))
    }

    /// Run a scheduled job
    ///
    /// The job moves to STARTED, then to FINISHED unless something marked it
    /// FAILED along the way. A job without a usable organization is marked
    /// FAILED and the run returns normally, so the scheduler does not retry
    /// it.
    ///
    /// # Errors
    ///
    /// Any error from the walk is recorded on the job (FAILED) and returned
    /// so the scheduler can apply its retry policy.
    pub async fn run(&self, execution: &dyn JobExecution) -> Result<RunSummary> {
        let start_time = Instant::now();
        let payload = execution.payload();
        let job_id = payload.export_id;

        self.jobs.transition(job_id, JobState::Started).await?;
        tracing::info!(job_id = %job_id, "Starting export job");

        let uploader = execution
            .uploader()
            .unwrap_or_else(|| Arc::clone(&self.uploader));

        let Some(organization) = payload.target.organization_id else {
            return self.fail_missing_organization(job_id, start_time).await;
        };

        let coordinator = ExportCoordinator::new(
            Arc::clone(&self.directory),
            Arc::clone(&self.entity_store),
            self.jobs.clone(),
            self.config.export.clone(),
            uploader,
        );
        let mut heartbeat =
            HeartbeatGovernor::new(execution, self.config.export.heartbeat_interval_ms);

        match coordinator
            .export_applications(organization, payload, &mut heartbeat)
            .await
        {
            Ok(summary) => {
                if self.jobs.get_state(job_id).await? != Some(JobState::Failed) {
                    self.jobs.transition(job_id, JobState::Finished).await?;
                }
                let summary = summary.with_duration(start_time.elapsed());
                summary.log_summary();
                Ok(summary)
            }
            Err(ExportError::MissingOrganization) => {
                self.fail_missing_organization(job_id, start_time).await
            }
            Err(err) => {
                tracing::error!(job_id = %job_id, error = %err, "Export job failed");
                if let Err(record_err) = self.jobs.record_failure(job_id, err.to_string()).await {
                    tracing::warn!(job_id = %job_id, error = %record_err, "Failed to record job failure");
                }
                Err(err)
            }
        }
    }

    async fn fail_missing_organization(
        &self,
        job_id: JobId,
        start_time: Instant,
    ) -> Result<RunSummary> {
        let message = ExportError::MissingOrganization.to_string();
        tracing::error!(job_id = %job_id, "{message}");
        self.jobs.record_failure(job_id, message).await?;
        Ok(RunSummary::new().with_duration(start_time.elapsed()))
    }

    /// Current state of a job, `None` if the id is unknown
    pub async fn get_state(&self, job_id: JobId) -> Result<Option<JobState>> {
        self.jobs.get_state(job_id).await
    }

    /// Last error message recorded on a job
    pub async fn get_error_message(&self, job_id: JobId) -> Result<Option<String>> {
        self.jobs.get_error_message(job_id).await
    }
}

fn checked_target(target: Option<ExportTarget>) -> Result<ExportTarget> {
    let target = target
        .ok_or_else(|| ExportError::InvalidConfig("export target is missing".to_string()))?;
    target.validate()?;
    Ok(target)
}
