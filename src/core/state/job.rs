//! Export job record and lifecycle states
//!
//! The job record is the single source of truth for job status queries. A
//! run moves it forward through
//! `CREATED -> SCHEDULED -> STARTED -> FINISHED | FAILED`; a retried run
//! re-enters STARTED.

use crate::domain::ids::JobId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of an export job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobState {
    /// Record exists, nothing enqueued yet
    Created,
    /// Enqueued with the scheduler
    Scheduled,
    /// A worker picked the job up
    Started,
    /// Every application was exported
    Finished,
    /// The run failed; `error_message` says why
    Failed,
}

impl JobState {
    fn rank(self) -> u8 {
        match self {
            JobState::Created => 0,
            JobState::Scheduled => 1,
            JobState::Started => 2,
            JobState::Finished | JobState::Failed => 3,
        }
    }

    /// Whether the job has reached FINISHED or FAILED
    pub fn is_terminal(self) -> bool {
        matches!(self, JobState::Finished | JobState::Failed)
    }

    /// Whether a transition from `self` to `next` is allowed
    ///
    /// States only move forward, with two exceptions. FAILED may record
    /// another FAILED (the message changes). STARTED may be entered again
    /// from STARTED or FAILED: the scheduler retries a run that failed or
    /// was cut off by the host timeout, and the retry is a new run.
    ///
    /// # Examples
    ///
    /// ```
    /// use entity_export::core::state::JobState;
    ///
    /// assert!(JobState::Created.can_transition_to(JobState::Scheduled));
    /// assert!(!JobState::Started.can_transition_to(JobState::Scheduled));
    /// assert!(!JobState::Finished.can_transition_to(JobState::Failed));
    /// ```
    pub fn can_transition_to(self, next: JobState) -> bool {
        match (self, next) {
            (JobState::Failed, JobState::Failed | JobState::Started) => true,
            (JobState::Started, JobState::Started) => true,
            (current, _) if current.is_terminal() => false,
            (current, next) => next.rank() > current.rank(),
        }
    }

    /// Wire name of the state
    pub fn as_str(self) -> &'static str {
        match self {
            JobState::Created => "CREATED",
            JobState::Scheduled => "SCHEDULED",
            JobState::Started => "STARTED",
            JobState::Finished => "FINISHED",
            JobState::Failed => "FAILED",
        }
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Persisted export job record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportJob {
    /// Job identifier
    pub id: JobId,

    /// Current lifecycle state
    pub state: JobState,

    /// Message of the last failure, if any
    pub error_message: Option<String>,

    /// Creation time
    pub created_at: DateTime<Utc>,

    /// Time of the last state change
    pub updated_at: DateTime<Utc>,
}

impl ExportJob {
    /// Creates a new record in state CREATED
    pub fn new(id: JobId) -> Self {
        let now = Utc::now();
        Self {
            id,
            state: JobState::Created,
            error_message: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether the job failed
    pub fn is_failed(&self) -> bool {
        self.state == JobState::Failed
    }
}
