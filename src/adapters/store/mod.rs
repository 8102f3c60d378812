//! Entity store abstraction layer
//!
//! Trait seams for the backing entity store, the organization directory and
//! job record persistence, the cursor-driven paging helpers built on them,
//! and in-memory implementations.

pub mod memory;
pub mod paging;
pub mod traits;

pub use memory::{InMemoryApplication, InMemoryDirectory, InMemoryEntityStore, InMemoryJobStore};
pub use paging::{connection_targets, paginate, search_entities};
pub use traits::{
    ApplicationInfo, ApplicationStore, EntityQuery, EntityStore, JobStore, ManagementDirectory,
    Page,
};
