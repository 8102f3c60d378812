//! External system integrations.
//!
//! This module defines the seams between the export pipeline and the
//! systems it depends on, plus concrete adapters:
//!
//! - [`store`] - entity store, organization directory and job records
//!   (traits, cursor paging, in-memory implementations)
//! - [`scheduler`] - job scheduling and execution context
//! - [`storage`] - destination object storage (S3-compatible REST client,
//!   local filesystem)
//!
//! # Design Pattern
//!
//! Adapters follow the **Adapter Pattern** to isolate external dependencies and
//! enable testing with in-memory implementations. Every collaborator is passed
//! in explicitly; there are no process-wide client registries.
//!
//! ```rust
//! use entity_export::adapters::storage::{LocalFsStorage, ObjectStorage};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let storage = LocalFsStorage::new("/tmp/exports");
//! storage.ensure_bucket("acme").await?;
//! storage.put_object("acme", "hello.json", b"{}".to_vec()).await?;
//! # Ok(())
//! # }
//! ```

pub mod scheduler;
pub mod storage;
pub mod store;
