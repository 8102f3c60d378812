//! Export coordinator - fans one job out over the applications of an organization
//!
//! Resolves the applications a filter selects, walks each one into a file
//! manifest and hands the manifest to the uploader. Upload failures are
//! recorded on the job and the remaining applications still run; store
//! failures abort the whole run.

use crate::adapters::scheduler::JobPayload;
use crate::adapters::store::{ApplicationInfo, EntityStore, ManagementDirectory};
use crate::config::ExportSettings;
use crate::core::export::heartbeat::HeartbeatGovernor;
use crate::core::export::summary::RunSummary;
use crate::core::export::uploader::Uploader;
use crate::core::export::walker::CollectionWalker;
use crate::core::state::JobStateManager;
use crate::domain::ids::{JobId, OrganizationId};
use crate::domain::{ExportFilter, Result};
use std::sync::Arc;

/// Name of the bookkeeping application every organization owns
pub const EXPORTS_APPLICATION: &str = "exports";

/// Destination base name of one application's files
///
/// `{application}.{job_id}.{millis}.json`, using the application's short name.
pub fn base_name(application: &str, job_id: JobId, scheduled_at_millis: i64) -> String {
    let short = application.rsplit('/').next().unwrap_or(application);
    format!("{short}.{job_id}.{scheduled_at_millis}.json")
}

/// Export coordinator
pub struct ExportCoordinator {
    directory: Arc<dyn ManagementDirectory>,
    entity_store: Arc<dyn EntityStore>,
    jobs: JobStateManager,
    settings: ExportSettings,
    uploader: Arc<dyn Uploader>,
}

impl ExportCoordinator {
    pub fn new(
        directory: Arc<dyn ManagementDirectory>,
        entity_store: Arc<dyn EntityStore>,
        jobs: JobStateManager,
        settings: ExportSettings,
        uploader: Arc<dyn Uploader>,
    ) -> Self {
        Self {
            directory,
            entity_store,
            jobs,
            settings,
            uploader,
        }
    }

    /// Exports every application of `organization` the payload's filter selects
    ///
    /// Applications are processed one after another. For each one:
    /// 1. The walker writes its collections into a file manifest
    /// 2. The uploader moves the manifest to the payload's target
    /// 3. The manifest's scratch files are deleted
    ///
    /// # Errors
    ///
    /// Returns `MissingOrganization` if the organization is unknown, and any
    /// store error raised while walking. Upload errors are not returned; they
    /// mark the job FAILED and show up in the summary.
    pub async fn export_applications(
        &self,
        organization: OrganizationId,
        payload: &JobPayload,
        heartbeat: &mut HeartbeatGovernor<'_>,
    ) -> Result<RunSummary> {
        let job_id = payload.export_id;
        let mut summary = RunSummary::new();

        let org_name = self.directory.organization_name(organization).await?;
        let applications = self
            .resolve_applications(job_id, organization, &org_name, &payload.filter, &mut summary)
            .await?;

        tracing::info!(
            job_id = %job_id,
            organization = %org_name,
            application_count = applications.len(),
            "Exporting applications"
        );

        let walker = CollectionWalker::new(&self.settings);

        for application in applications {
            tracing::info!(job_id = %job_id, application = %application.name, "Exporting application");

            let store = self.entity_store.application(application.id).await?;
            let manifest = walker
                .walk(store, job_id, &payload.target, &payload.filter, heartbeat)
                .await?;

            for skipped in manifest.skipped() {
                self.jobs.record_message(job_id, skipped.clone()).await?;
            }
            summary.collections_skipped += manifest.skipped().len();

            let base = base_name(&application.name, job_id, payload.scheduled_at_millis);
            let uploaded = self
                .uploader
                .transfer_manifest(&payload.target, &manifest, &base)
                .await;
            let entities = manifest.entity_count();

            if let Err(err) = manifest.close() {
                tracing::warn!(
                    application = %application.name,
                    error = %err,
                    "Failed to remove scratch files"
                );
            }

            match uploaded {
                Ok(files) => {
                    summary.applications_exported += 1;
                    summary.entities_exported += entities;
                    summary.files_uploaded += files;
                    tracing::info!(
                        job_id = %job_id,
                        application = %application.name,
                        entities,
                        files,
                        "Application exported"
                    );
                }
                Err(err) => {
                    tracing::error!(
                        job_id = %job_id,
                        application = %application.name,
                        error = %err,
                        "Failed to upload application export"
                    );
                    self.jobs.record_failure(job_id, err.to_string()).await?;
                    summary.add_failure(application.name, err.to_string());
                }
            }
        }

        Ok(summary)
    }

    async fn resolve_applications(
        &self,
        job_id: JobId,
        organization: OrganizationId,
        org_name: &str,
        filter: &ExportFilter,
        summary: &mut RunSummary,
    ) -> Result<Vec<ApplicationInfo>> {
        let owned = self
            .directory
            .applications_for_organization(organization)
            .await?;

        if filter.applications.is_empty() {
            let exports = format!("{org_name}/{EXPORTS_APPLICATION}");
            return Ok(owned
                .into_iter()
                .filter(|app| !app.name.eq_ignore_ascii_case(&exports))
                .collect());
        }

        let mut resolved = Vec::with_capacity(filter.applications.len());
        for requested in &filter.applications {
            let qualified = if requested.contains('/') {
                requested.clone()
            } else {
                format!("{org_name}/{requested}")
            };

            match owned.iter().find(|app| app.name.eq_ignore_ascii_case(&qualified)) {
                Some(app) => resolved.push(app.clone()),
                None => {
                    let message = format!("Application {qualified} could not be found");
                    tracing::warn!(job_id = %job_id, application = %qualified, "Application not found");
                    self.jobs.record_message(job_id, message.clone()).await?;
                    summary.add_failure(qualified, message);
                }
            }
        }

        Ok(resolved)
    }
}
