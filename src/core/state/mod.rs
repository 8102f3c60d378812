//! Export job records and their lifecycle

pub mod job;
pub mod manager;

pub use job::{ExportJob, JobState};
pub use manager::JobStateManager;
