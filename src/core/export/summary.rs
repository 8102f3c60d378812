//! Export run summary
//!
//! Counters and per-application errors collected over one run.

use std::time::Duration;

/// An application that could not be exported
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplicationFailure {
    /// Application name, `org/app`
    pub application: String,

    /// Error message
    pub message: String,
}

/// Summary of one export run
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    /// Applications whose files were all uploaded
    pub applications_exported: usize,

    /// Applications skipped after an error
    pub applications_failed: usize,

    /// Entities written across all applications
    pub entities_exported: u64,

    /// Files uploaded
    pub files_uploaded: usize,

    /// Collections skipped because their query was rejected
    pub collections_skipped: usize,

    /// Duration of the run
    pub duration: Duration,

    /// Errors encountered, in order
    pub errors: Vec<ApplicationFailure>,
}

impl RunSummary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the duration
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    /// Record an application that failed
    pub fn add_failure(&mut self, application: impl Into<String>, message: impl Into<String>) {
        self.applications_failed += 1;
        self.errors.push(ApplicationFailure {
            application: application.into(),
            message: message.into(),
        });
    }

    /// True when no application failed
    pub fn is_successful(&self) -> bool {
        self.applications_failed == 0 && self.errors.is_empty()
    }

    /// Log the summary
    pub fn log_summary(&self) {
        tracing::info!(
            applications_exported = self.applications_exported,
            applications_failed = self.applications_failed,
            entities = self.entities_exported,
            files = self.files_uploaded,
            collections_skipped = self.collections_skipped,
            duration_ms = self.duration.as_millis() as u64,
            "Export completed"
        );

        for error in &self.errors {
            tracing::warn!(
                application = %error.application,
                message = %error.message,
                "Application export failed"
            );
        }
    }
}
