//! Entity store abstraction traits
//!
//! These traits define what the export pipeline needs from the backing
//! entity store, the management directory and the job record store.

use crate::core::state::ExportJob;
use crate::domain::filter::Query;
use crate::domain::ids::{ApplicationId, JobId, OrganizationId};
use crate::domain::{Entity, Result};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::Arc;
use uuid::Uuid;

/// Search request for one collection
#[derive(Debug, Clone, PartialEq)]
pub struct EntityQuery {
    /// Collection to search
    pub collection: String,

    /// Predicate; `None` matches every entity
    pub predicate: Option<Query>,

    /// Entities per page
    pub page_size: usize,
}

impl EntityQuery {
    /// Creates a match-all query over `collection`
    pub fn new(collection: impl Into<String>, page_size: usize) -> Self {
        Self {
            collection: collection.into(),
            predicate: None,
            page_size,
        }
    }

    /// Narrows the query with a predicate
    pub fn with_predicate(mut self, predicate: Option<Query>) -> Self {
        self.predicate = predicate;
        self
    }
}

/// One page of results plus the bookmark for the next one
#[derive(Debug, Clone)]
pub struct Page<T> {
    /// Items on this page
    pub items: Vec<T>,

    /// Server-side bookmark; `None` on the last page
    pub cursor: Option<String>,
}

impl<T> Page<T> {
    /// The final page of a result set
    pub fn last(items: Vec<T>) -> Self {
        Self {
            items,
            cursor: None,
        }
    }
}

/// Application registered under an organization
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplicationInfo {
    /// Application identifier
    pub id: ApplicationId,

    /// Qualified name, `{organization}/{application}`
    pub name: String,
}

impl ApplicationInfo {
    /// Creates a new application reference
    pub fn new(id: ApplicationId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// Entry point to the per-application entity stores
#[async_trait]
pub trait EntityStore: Send + Sync {
    /// Opens the store of one application
    ///
    /// # Errors
    ///
    /// Returns `StoreError::ApplicationNotFound` if the id is unknown.
    async fn application(&self, id: ApplicationId) -> Result<Arc<dyn ApplicationStore>>;
}

/// Read access to the entities of one application
#[async_trait]
pub trait ApplicationStore: Send + Sync {
    /// Application this store belongs to
    fn application_id(&self) -> ApplicationId;

    /// Names of every collection known to the application
    async fn collection_names(&self) -> Result<Vec<String>>;

    /// Fetches one page of a collection search
    ///
    /// `cursor` is the bookmark returned with the previous page, or `None`
    /// for the first page.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::QueryRejected` if the predicate cannot run
    /// against the collection, `StoreError::ReadFailed` for read errors.
    async fn search_page(&self, query: &EntityQuery, cursor: Option<&str>)
        -> Result<Page<Entity>>;

    /// Collections the entity owns members in
    async fn collections_of(&self, entity: &Entity) -> Result<Vec<String>>;

    /// Member ids of one of the entity's collections
    async fn collection_member_ids(&self, entity: &Entity, collection: &str) -> Result<Vec<Uuid>>;

    /// Names of the entity's dictionaries
    async fn dictionaries(&self, entity: &Entity) -> Result<Vec<String>>;

    /// Contents of one dictionary
    async fn dictionary_as_map(&self, entity: &Entity, name: &str) -> Result<Map<String, Value>>;

    /// Connection types for which the entity is the source
    async fn connection_types(&self, entity: &Entity) -> Result<Vec<String>>;

    /// Fetches one page of targets of an outbound connection type
    async fn target_page(
        &self,
        entity: &Entity,
        connection_type: &str,
        page_size: usize,
        cursor: Option<&str>,
    ) -> Result<Page<Entity>>;
}

/// Organization and application lookups
#[async_trait]
pub trait ManagementDirectory: Send + Sync {
    /// Name of an organization
    ///
    /// # Errors
    ///
    /// Returns `ExportError::MissingOrganization` if the organization is unknown.
    async fn organization_name(&self, organization: OrganizationId) -> Result<String>;

    /// Every application owned by the organization
    async fn applications_for_organization(
        &self,
        organization: OrganizationId,
    ) -> Result<Vec<ApplicationInfo>>;
}

/// Persistence for export job records
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Creates the bookkeeping collection for job records if missing
    async fn ensure_exports_collection(&self) -> Result<()>;

    /// Persists a new job record
    async fn create(&self, job: &ExportJob) -> Result<()>;

    /// Overwrites an existing job record
    ///
    /// # Errors
    ///
    /// Returns `ExportError::JobNotFound` if the record does not exist.
    async fn update(&self, job: &ExportJob) -> Result<()>;

    /// Loads a job record
    async fn get(&self, id: JobId) -> Result<Option<ExportJob>>;
}
