//! Collection and connection walker
//!
//! Walks the matching collections of one application and writes two streams
//! of JSON lines: entity records (with their dictionaries and, when asked for,
//! collection member ids) and outbound connections. Both streams rotate to a
//! new part every `rotation_threshold` entities, counted across all
//! collections of the walk.

use crate::adapters::store::{connection_targets, search_entities, ApplicationStore, EntityQuery};
use crate::config::ExportSettings;
use crate::core::export::heartbeat::HeartbeatGovernor;
use crate::core::export::manifest::FileManifest;
use crate::core::export::scratch::JsonLineWriter;
use crate::domain::ids::JobId;
use crate::domain::{Entity, ExportFilter, ExportTarget, Result};
use futures::TryStreamExt;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Key under which non-empty dictionaries are embedded in an entity record
pub const DICTIONARIES_KEY: &str = "dictionaries";

struct PartWriters {
    entities: JsonLineWriter,
    connections: JsonLineWriter,
}

impl PartWriters {
    async fn open(paths: (PathBuf, PathBuf)) -> Result<Self> {
        Ok(Self {
            entities: JsonLineWriter::create(paths.0).await?,
            connections: JsonLineWriter::create(paths.1).await?,
        })
    }

    async fn finish(self) -> Result<()> {
        self.entities.finish().await?;
        self.connections.finish().await?;
        Ok(())
    }
}

/// Walks one application into a [`FileManifest`]
pub struct CollectionWalker<'a> {
    settings: &'a ExportSettings,
}

impl<'a> CollectionWalker<'a> {
    /// Creates a walker using the page size, rotation threshold and scratch
    /// location from `settings`
    pub fn new(settings: &'a ExportSettings) -> Self {
        Self { settings }
    }

    /// Exports every matching collection of the application behind `store`
    ///
    /// A collection whose query the store rejects is skipped and noted in the
    /// manifest. Any other store error aborts the walk; the scratch files
    /// written so far are deleted before the error is returned.
    pub async fn walk(
        &self,
        store: Arc<dyn ApplicationStore>,
        job_id: JobId,
        target: &ExportTarget,
        filter: &ExportFilter,
        heartbeat: &mut HeartbeatGovernor<'_>,
    ) -> Result<FileManifest> {
        let parent = self.settings.scratch_dir.as_deref().map(Path::new);
        let mut manifest = FileManifest::create(job_id, parent)?;

        match self
            .walk_into(&store, target, filter, heartbeat, &mut manifest)
            .await
        {
            Ok(()) => {
                tracing::debug!(
                    application = %store.application_id(),
                    entities = manifest.entity_count(),
                    parts = manifest.entity_files().len(),
                    "Application walk complete"
                );
                Ok(manifest)
            }
            Err(err) => {
                if let Err(close_err) = manifest.close() {
                    tracing::warn!(error = %close_err, "Failed to remove scratch files");
                }
                Err(err)
            }
        }
    }

    async fn walk_into(
        &self,
        store: &Arc<dyn ApplicationStore>,
        target: &ExportTarget,
        filter: &ExportFilter,
        heartbeat: &mut HeartbeatGovernor<'_>,
        manifest: &mut FileManifest,
    ) -> Result<()> {
        let mut writers = PartWriters::open(manifest.next_part()).await?;

        for collection in self.collections(store, target, filter).await? {
            tracing::debug!(collection = %collection, "Exporting collection");

            // Member ids are embedded for the hinted collection, or for the
            // walked one when the filter names collections explicitly
            let member_collection = if filter.collections.is_empty() {
                target.collection_name.clone()
            } else {
                Some(collection.clone())
            };

            let query = EntityQuery::new(collection.clone(), self.settings.page_size)
                .with_predicate(filter.query.clone());
            let mut entities = search_entities(Arc::clone(store), query);

            loop {
                let entity = match entities.try_next().await {
                    Ok(Some(entity)) => entity,
                    Ok(None) => break,
                    Err(err) if err.is_collection_local() => {
                        tracing::warn!(
                            collection = %collection,
                            error = %err,
                            "Skipping collection"
                        );
                        manifest.record_skipped(err.to_string());
                        break;
                    }
                    Err(err) => return Err(err),
                };

                heartbeat.tick().await;

                let record = self
                    .entity_record(store, &entity, member_collection.as_deref())
                    .await?;
                writers.entities.write_value(&record).await?;

                if let Some(line) = self.connection_record(store, &entity, filter).await? {
                    writers.connections.write_value(&line).await?;
                }

                let count = manifest.record_entity();
                // A zero threshold disables rotation.
                if count.checked_rem(self.settings.rotation_threshold) == Some(0) {
                    writers.finish().await?;
                    writers = PartWriters::open(manifest.next_part()).await?;
                    tracing::debug!(
                        entities = count,
                        part = manifest.entity_files().len(),
                        "Rotated export files"
                    );
                }
            }
        }

        writers.finish().await
    }

    async fn collections(
        &self,
        store: &Arc<dyn ApplicationStore>,
        target: &ExportTarget,
        filter: &ExportFilter,
    ) -> Result<Vec<String>> {
        if !filter.collections.is_empty() {
            return Ok(filter.collections.iter().cloned().collect());
        }

        let names = store.collection_names().await?;
        Ok(match target.collection_name.as_deref() {
            Some(hint) => names
                .into_iter()
                .filter(|name| name.eq_ignore_ascii_case(hint))
                .collect(),
            None => names,
        })
    }

    async fn entity_record(
        &self,
        store: &Arc<dyn ApplicationStore>,
        entity: &Entity,
        member_collection: Option<&str>,
    ) -> Result<Value> {
        let mut record = entity.to_record();

        if let Some(name) = member_collection {
            let owned = store.collections_of(entity).await?;
            if let Some(owned_name) = owned.iter().find(|c| c.eq_ignore_ascii_case(name)) {
                let ids = store
                    .collection_member_ids(entity, owned_name)
                    .await?
                    .into_iter()
                    .map(|id| Value::String(id.to_string()))
                    .collect();
                insert_export_field(&mut record, entity, owned_name, Value::Array(ids));
            }
        }

        let mut dictionaries = Map::new();
        for name in store.dictionaries(entity).await? {
            let entries = store.dictionary_as_map(entity, &name).await?;
            if !entries.is_empty() {
                dictionaries.insert(name, Value::Object(entries));
            }
        }
        if !dictionaries.is_empty() {
            insert_export_field(&mut record, entity, DICTIONARIES_KEY, Value::Object(dictionaries));
        }

        Ok(Value::Object(record))
    }

    async fn connection_record(
        &self,
        store: &Arc<dyn ApplicationStore>,
        entity: &Entity,
        filter: &ExportFilter,
    ) -> Result<Option<Value>> {
        let mut by_type = Map::new();

        for connection_type in store.connection_types(entity).await? {
            if !filter.includes_connection_type(&connection_type) {
                continue;
            }

            let targets: Vec<Value> = connection_targets(
                Arc::clone(store),
                entity.clone(),
                connection_type.clone(),
                self.settings.page_size,
            )
            .map_ok(|target| Value::String(target.uuid.to_string()))
            .try_collect()
            .await?;

            if !targets.is_empty() {
                by_type.insert(connection_type, Value::Array(targets));
            }
        }

        if by_type.is_empty() {
            return Ok(None);
        }

        let mut line = Map::new();
        line.insert(entity.uuid.to_string(), Value::Object(by_type));
        Ok(Some(Value::Object(line)))
    }
}

/// Adds an exported field to the entity record, warning when it replaces a
/// property of the same name
fn insert_export_field(record: &mut Map<String, Value>, entity: &Entity, key: &str, value: Value) {
    if record.insert(key.to_string(), value).is_some() {
        tracing::warn!(
            entity = %entity.uuid,
            field = key,
            "Entity property replaced by exported field"
        );
    }
}
