//! Core business logic.
//!
//! # Modules
//!
//! - [`export`] - Scheduling, walking, uploading and reporting
//! - [`state`] - Export job records and their state machine
//!
//! # Export Workflow
//!
//! 1. **Schedule**: create the job record (CREATED, then SCHEDULED) and
//!    enqueue it with the scheduler
//! 2. **Start**: the scheduler calls back; the job moves to STARTED
//! 3. **Resolve**: pick the applications the filter selects
//! 4. **Walk**: write each application's entities and connections to
//!    rotated scratch files
//! 5. **Upload**: move the files to object storage, then delete them
//! 6. **Finish**: the job ends FINISHED, or FAILED with a message
//!
//! # Example
//!
//! ```rust,no_run
//! use entity_export::adapters::scheduler::JobExecution;
//! use entity_export::core::export::ExportService;
//!
//! # async fn example(service: ExportService, execution: &dyn JobExecution)
//! #     -> Result<(), Box<dyn std::error::Error>> {
//! let summary = service.run(execution).await?;
//! println!("Applications exported: {}", summary.applications_exported);
//! println!("Files uploaded: {}", summary.files_uploaded);
//! # Ok(())
//! # }
//! ```

pub mod export;
pub mod state;
