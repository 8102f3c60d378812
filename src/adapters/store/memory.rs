//! In-memory store adapters
//!
//! Process-local implementations of [`EntityStore`], [`ManagementDirectory`]
//! and [`JobStore`]. They back local runs and tests, and record which
//! applications and collections were read so callers can assert on it.

use super::traits::{
    ApplicationInfo, ApplicationStore, EntityQuery, EntityStore, JobStore, ManagementDirectory,
    Page,
};
use crate::core::state::ExportJob;
use crate::domain::ids::{ApplicationId, JobId, OrganizationId};
use crate::domain::{Entity, ExportError, Result, StoreError};
use async_trait::async_trait;
use regex::Regex;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

/// Entities, dictionaries and connections of one application
#[derive(Debug)]
pub struct InMemoryApplication {
    id: ApplicationId,
    collections: BTreeMap<String, Vec<Entity>>,
    entities: HashMap<Uuid, Entity>,
    members: HashMap<Uuid, BTreeMap<String, Vec<Uuid>>>,
    dictionaries: HashMap<Uuid, BTreeMap<String, Map<String, Value>>>,
    connections: HashMap<Uuid, BTreeMap<String, Vec<Uuid>>>,
    rejected: HashMap<String, String>,
    unreadable: HashMap<String, String>,
    searches: Mutex<Vec<String>>,
}

impl InMemoryApplication {
    /// Creates an empty application
    pub fn new(id: ApplicationId) -> Self {
        Self {
            id,
            collections: BTreeMap::new(),
            entities: HashMap::new(),
            members: HashMap::new(),
            dictionaries: HashMap::new(),
            connections: HashMap::new(),
            rejected: HashMap::new(),
            unreadable: HashMap::new(),
            searches: Mutex::new(Vec::new()),
        }
    }

    /// Declares a collection, even if it stays empty
    pub fn add_collection(&mut self, collection: impl Into<String>) -> &mut Self {
        self.collections.entry(collection.into()).or_default();
        self
    }

    /// Adds an entity to a collection
    pub fn add_entity(&mut self, collection: impl Into<String>, entity: Entity) -> &mut Self {
        self.entities.insert(entity.uuid, entity.clone());
        self.collections
            .entry(collection.into())
            .or_default()
            .push(entity);
        self
    }

    /// Adds `child` to the `collection` owned by `parent`
    pub fn add_member(&mut self, parent: Uuid, collection: impl Into<String>, child: Uuid) -> &mut Self {
        self.members
            .entry(parent)
            .or_default()
            .entry(collection.into())
            .or_default()
            .push(child);
        self
    }

    /// Attaches a dictionary to an entity
    pub fn add_dictionary(
        &mut self,
        entity: Uuid,
        name: impl Into<String>,
        entries: Map<String, Value>,
    ) -> &mut Self {
        self.dictionaries
            .entry(entity)
            .or_default()
            .insert(name.into(), entries);
        self
    }

    /// Adds a directed connection `source -[connection_type]-> target`
    pub fn connect(&mut self, source: Uuid, connection_type: impl Into<String>, target: Uuid) -> &mut Self {
        self.connections
            .entry(source)
            .or_default()
            .entry(connection_type.into())
            .or_default()
            .push(target);
        self
    }

    /// Makes every search against `collection` fail with a rejected query
    pub fn reject_queries(&mut self, collection: impl Into<String>, message: impl Into<String>) -> &mut Self {
        self.rejected.insert(collection.into(), message.into());
        self
    }

    /// Makes every search against `collection` fail with a read error
    pub fn fail_reads(&mut self, collection: impl Into<String>, message: impl Into<String>) -> &mut Self {
        self.unreadable.insert(collection.into(), message.into());
        self
    }

    /// Collections searched so far, in order
    pub async fn searched_collections(&self) -> Vec<String> {
        self.searches.lock().await.clone()
    }

    fn entity_page(items: Vec<Entity>, page_size: usize, cursor: Option<&str>) -> Result<Page<Entity>> {
        let start = match cursor {
            None => 0,
            Some(cursor) => cursor.parse::<usize>().map_err(|_| {
                ExportError::Store(StoreError::ReadFailed(format!("invalid cursor '{cursor}'")))
            })?,
        };
        let page_size = page_size.max(1);
        let end = start.saturating_add(page_size).min(items.len());
        let next = (end < items.len()).then(|| end.to_string());
        let items = items
            .into_iter()
            .skip(start)
            .take(end.saturating_sub(start))
            .collect();

        Ok(Page {
            items,
            cursor: next,
        })
    }
}

/// Equality predicate in the form `property = 'value'`
///
/// An absent predicate, an empty one and `select *` match everything. Any
/// other text is rejected for the collection being searched.
#[derive(Debug)]
enum Predicate {
    All,
    Equals { property: String, value: String },
}

impl Predicate {
    fn parse(ql: Option<&str>, collection: &str) -> Result<Self> {
        let ql = match ql.map(str::trim) {
            None | Some("") => return Ok(Predicate::All),
            Some(ql) if ql.eq_ignore_ascii_case("select *") => return Ok(Predicate::All),
            Some(ql) => ql,
        };

        let re = Regex::new(r"^(?:select \* where )?(\w+)\s*=\s*'([^']*)'$")
            .map_err(|e| ExportError::Other(format!("invalid predicate pattern: {e}")))?;

        match re.captures(ql) {
            Some(caps) => Ok(Predicate::Equals {
                property: caps[1].to_string(),
                value: caps[2].to_string(),
            }),
            None => Err(ExportError::Store(StoreError::QueryRejected {
                collection: collection.to_string(),
                message: format!("unsupported predicate '{ql}'"),
            })),
        }
    }

    fn matches(&self, entity: &Entity) -> bool {
        match self {
            Predicate::All => true,
            Predicate::Equals { property, value } => {
                let actual = match property.as_str() {
                    "uuid" => Some(Value::String(entity.uuid.to_string())),
                    "type" => Some(Value::String(entity.entity_type.clone())),
                    other => entity.properties.get(other).cloned(),
                };
                match actual {
                    Some(Value::String(s)) => s == *value,
                    Some(other) => other.to_string() == *value,
                    None => false,
                }
            }
        }
    }
}

#[async_trait]
impl ApplicationStore for InMemoryApplication {
    fn application_id(&self) -> ApplicationId {
        self.id
    }

    async fn collection_names(&self) -> Result<Vec<String>> {
        Ok(self.collections.keys().cloned().collect())
    }

    async fn search_page(&self, query: &EntityQuery, cursor: Option<&str>) -> Result<Page<Entity>> {
        if cursor.is_none() {
            self.searches.lock().await.push(query.collection.clone());
        }

        if let Some(message) = self.rejected.get(&query.collection) {
            return Err(ExportError::Store(StoreError::QueryRejected {
                collection: query.collection.clone(),
                message: message.clone(),
            }));
        }
        if let Some(message) = self.unreadable.get(&query.collection) {
            return Err(ExportError::Store(StoreError::ReadFailed(message.clone())));
        }

        let predicate = Predicate::parse(
            query.predicate.as_ref().map(|q| q.as_str()),
            &query.collection,
        )?;

        let matching: Vec<Entity> = self
            .collections
            .get(&query.collection)
            .map(|entities| {
                entities
                    .iter()
                    .filter(|entity| predicate.matches(entity))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        Self::entity_page(matching, query.page_size, cursor)
    }

    async fn collections_of(&self, entity: &Entity) -> Result<Vec<String>> {
        Ok(self
            .members
            .get(&entity.uuid)
            .map(|collections| collections.keys().cloned().collect())
            .unwrap_or_default())
    }

    async fn collection_member_ids(&self, entity: &Entity, collection: &str) -> Result<Vec<Uuid>> {
        Ok(self
            .members
            .get(&entity.uuid)
            .and_then(|collections| collections.get(collection))
            .cloned()
            .unwrap_or_default())
    }

    async fn dictionaries(&self, entity: &Entity) -> Result<Vec<String>> {
        Ok(self
            .dictionaries
            .get(&entity.uuid)
            .map(|dictionaries| dictionaries.keys().cloned().collect())
            .unwrap_or_default())
    }

    async fn dictionary_as_map(&self, entity: &Entity, name: &str) -> Result<Map<String, Value>> {
        Ok(self
            .dictionaries
            .get(&entity.uuid)
            .and_then(|dictionaries| dictionaries.get(name))
            .cloned()
            .unwrap_or_default())
    }

    async fn connection_types(&self, entity: &Entity) -> Result<Vec<String>> {
        Ok(self
            .connections
            .get(&entity.uuid)
            .map(|types| types.keys().cloned().collect())
            .unwrap_or_default())
    }

    async fn target_page(
        &self,
        entity: &Entity,
        connection_type: &str,
        page_size: usize,
        cursor: Option<&str>,
    ) -> Result<Page<Entity>> {
        let targets: Vec<Entity> = self
            .connections
            .get(&entity.uuid)
            .and_then(|types| types.get(connection_type))
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| self.entities.get(id).cloned())
                    .collect()
            })
            .unwrap_or_default();

        Self::entity_page(targets, page_size, cursor)
    }
}

/// In-memory [`EntityStore`] over a fixed set of applications
#[derive(Default)]
pub struct InMemoryEntityStore {
    applications: HashMap<ApplicationId, Arc<InMemoryApplication>>,
    opened: Mutex<Vec<ApplicationId>>,
}

impl InMemoryEntityStore {
    /// Creates an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an application and returns a handle to it
    pub fn insert(&mut self, application: InMemoryApplication) -> Arc<InMemoryApplication> {
        let application = Arc::new(application);
        self.applications
            .insert(application.id, Arc::clone(&application));
        application
    }

    /// Applications opened so far, in order
    pub async fn opened_applications(&self) -> Vec<ApplicationId> {
        self.opened.lock().await.clone()
    }
}

#[async_trait]
impl EntityStore for InMemoryEntityStore {
    async fn application(&self, id: ApplicationId) -> Result<Arc<dyn ApplicationStore>> {
        let application = self
            .applications
            .get(&id)
            .cloned()
            .ok_or_else(|| ExportError::Store(StoreError::ApplicationNotFound(id.to_string())))?;

        self.opened.lock().await.push(id);
        Ok(application)
    }
}

/// In-memory [`ManagementDirectory`]
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    organizations: HashMap<OrganizationId, String>,
    applications: HashMap<OrganizationId, Vec<ApplicationInfo>>,
}

impl InMemoryDirectory {
    /// Creates an empty directory
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an organization
    pub fn add_organization(&mut self, id: OrganizationId, name: impl Into<String>) -> &mut Self {
        self.organizations.insert(id, name.into());
        self
    }

    /// Registers an application under an organization
    ///
    /// `name` is the short name; it is stored qualified as `{org}/{name}`.
    pub fn add_application(
        &mut self,
        organization: OrganizationId,
        id: ApplicationId,
        name: &str,
    ) -> &mut Self {
        let org_name = self
            .organizations
            .get(&organization)
            .cloned()
            .unwrap_or_else(|| organization.to_string());
        self.applications
            .entry(organization)
            .or_default()
            .push(ApplicationInfo::new(id, format!("{org_name}/{name}")));
        self
    }
}

#[async_trait]
impl ManagementDirectory for InMemoryDirectory {
    async fn organization_name(&self, organization: OrganizationId) -> Result<String> {
        self.organizations
            .get(&organization)
            .cloned()
            .ok_or(ExportError::MissingOrganization)
    }

    async fn applications_for_organization(
        &self,
        organization: OrganizationId,
    ) -> Result<Vec<ApplicationInfo>> {
        if !self.organizations.contains_key(&organization) {
            return Err(ExportError::MissingOrganization);
        }
        Ok(self
            .applications
            .get(&organization)
            .cloned()
            .unwrap_or_default())
    }
}

/// In-memory [`JobStore`]
#[derive(Debug, Default)]
pub struct InMemoryJobStore {
    jobs: RwLock<HashMap<JobId, ExportJob>>,
    exports_collection: AtomicBool,
}

impl InMemoryJobStore {
    /// Creates an empty job store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored job records
    pub async fn len(&self) -> usize {
        self.jobs.read().await.len()
    }

    /// Whether no job record exists
    pub async fn is_empty(&self) -> bool {
        self.jobs.read().await.is_empty()
    }

    /// Whether the bookkeeping collection has been created
    pub fn has_exports_collection(&self) -> bool {
        self.exports_collection.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl JobStore for InMemoryJobStore {
    async fn ensure_exports_collection(&self) -> Result<()> {
        if !self.exports_collection.swap(true, Ordering::SeqCst) {
            tracing::debug!("Created exports collection");
        }
        Ok(())
    }

    async fn create(&self, job: &ExportJob) -> Result<()> {
        self.jobs.write().await.insert(job.id, job.clone());
        Ok(())
    }

    async fn update(&self, job: &ExportJob) -> Result<()> {
        let mut jobs = self.jobs.write().await;
        match jobs.get_mut(&job.id) {
            Some(existing) => {
                *existing = job.clone();
                Ok(())
            }
            None => Err(ExportError::JobNotFound(job.id.to_string())),
        }
    }

    async fn get(&self, id: JobId) -> Result<Option<ExportJob>> {
        Ok(self.jobs.read().await.get(&id).cloned())
    }
}
