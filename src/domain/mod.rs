//! Domain models and types for the export pipeline.
//!
//! # Overview
//!
//! The domain layer provides:
//! - **Strongly-typed identifiers** ([`JobId`], [`OrganizationId`], [`ApplicationId`])
//! - **Domain models** ([`Entity`], [`ExportFilter`], [`ExportTarget`])
//! - **Error types** ([`ExportError`], [`StoreError`], [`StorageError`])
//! - **Result type alias** ([`Result`])
//!
//! # Error Handling
//!
//! All fallible operations return [`Result<T, ExportError>`]:
//!
//! ```rust
//! use entity_export::domain::{ExportError, Result};
//!
//! fn require_org(org: Option<&str>) -> Result<&str> {
//!     org.ok_or(ExportError::MissingOrganization)
//! }
//!
//! assert!(require_org(None).is_err());
//! ```

pub mod entity;
pub mod errors;
pub mod filter;
pub mod ids;
pub mod result;
pub mod target;

// Re-export commonly used types for convenience
pub use entity::{Entity, EntityBuilder};
pub use errors::{ExportError, StorageError, StoreError};
pub use filter::{ExportFilter, Query};
pub use ids::{ApplicationId, JobId, OrganizationId};
pub use result::Result;
pub use target::{ExportTarget, StorageInfo};
