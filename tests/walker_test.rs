//! Integration tests for the collection walker
//!
//! These tests walk in-memory applications and read the produced scratch
//! files back, checking rotation, connections, dictionaries and members.

use async_trait::async_trait;
use entity_export::adapters::scheduler::{JobExecution, JobPayload};
use entity_export::adapters::store::{ApplicationStore, InMemoryApplication};
use entity_export::config::{secret_string, ExportSettings};
use entity_export::core::export::scratch::read_json_lines;
use entity_export::core::export::{CollectionWalker, FileManifest, HeartbeatGovernor};
use entity_export::domain::{
    ApplicationId, Entity, ExportError, ExportFilter, ExportTarget, JobId, StorageInfo, StoreError,
};
use serde_json::{json, Map, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;
use test_case::test_case;
use uuid::Uuid;

struct CountingExecution {
    payload: JobPayload,
    heartbeats: AtomicUsize,
}

impl CountingExecution {
    fn new() -> Self {
        Self {
            payload: JobPayload {
                export_id: JobId::generate(),
                target: target(None),
                filter: ExportFilter::new(),
                scheduled_at_millis: 0,
            },
            heartbeats: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl JobExecution for CountingExecution {
    fn payload(&self) -> &JobPayload {
        &self.payload
    }

    async fn heartbeat(&self) {
        self.heartbeats.fetch_add(1, Ordering::SeqCst);
    }
}

fn target(collection_name: Option<&str>) -> ExportTarget {
    ExportTarget {
        organization_id: None,
        collection_name: collection_name.map(str::to_string),
        storage: StorageInfo {
            bucket_location: "exports".to_string(),
            s3_access_id: secret_string("access".to_string()),
            s3_key: secret_string("secret".to_string()),
        },
    }
}

fn user(n: usize) -> Entity {
    Entity::builder()
        .entity_type("user")
        .property("username", json!(format!("user{n}")))
        .build()
        .unwrap()
}

fn app_with_users(count: usize) -> (InMemoryApplication, Vec<Entity>) {
    let mut app = InMemoryApplication::new(ApplicationId::generate());
    app.add_collection("users");
    let users: Vec<Entity> = (0..count).map(user).collect();
    for entity in &users {
        app.add_entity("users", entity.clone());
    }
    (app, users)
}

async fn walk(
    app: InMemoryApplication,
    target: &ExportTarget,
    filter: &ExportFilter,
) -> entity_export::domain::Result<FileManifest> {
    let settings = ExportSettings::default();
    walk_with(&settings, app, target, filter).await
}

async fn walk_with(
    settings: &ExportSettings,
    app: InMemoryApplication,
    target: &ExportTarget,
    filter: &ExportFilter,
) -> entity_export::domain::Result<FileManifest> {
    let execution = CountingExecution::new();
    let mut heartbeat = HeartbeatGovernor::new(&execution, settings.heartbeat_interval_ms);
    let store: Arc<dyn ApplicationStore> = Arc::new(app);
    CollectionWalker::new(settings)
        .walk(store, JobId::generate(), target, filter, &mut heartbeat)
        .await
}

async fn lines(manifest: &FileManifest) -> (Vec<Vec<Value>>, Vec<Vec<Value>>) {
    let mut entities = Vec::new();
    for path in manifest.entity_files() {
        entities.push(read_json_lines(path).await.unwrap());
    }
    let mut connections = Vec::new();
    for path in manifest.connection_files() {
        connections.push(read_json_lines(path).await.unwrap());
    }
    (entities, connections)
}

#[tokio::test]
async fn test_1100_entities_split_at_1000() {
    let (mut app, users) = app_with_users(1100);
    let hub = users[0].uuid;
    for entity in &users {
        app.connect(entity.uuid, "follows", hub);
    }

    let manifest = walk(app, &target(None), &ExportFilter::new()).await.unwrap();
    let (entities, connections) = lines(&manifest).await;

    assert_eq!(manifest.entity_count(), 1100);
    assert_eq!(entities.len(), 2);
    assert_eq!(entities[0].len(), 1000);
    assert_eq!(entities[1].len(), 100);
    assert_eq!(connections[0].len(), 1000);
    assert_eq!(connections[1].len(), 100);

    manifest.close().unwrap();
}

#[test_case(0, 25 ; "zero interval beats once per entity")]
#[test_case(3_600_000, 0 ; "long interval never beats")]
#[tokio::test]
async fn test_heartbeat_checked_per_entity(interval_ms: u64, expected: usize) {
    let (app, _) = app_with_users(25);
    let execution = CountingExecution::new();
    let mut heartbeat = HeartbeatGovernor::new(&execution, interval_ms);
    let store: Arc<dyn ApplicationStore> = Arc::new(app);
    let settings = ExportSettings::default();

    let manifest = CollectionWalker::new(&settings)
        .walk(store, JobId::generate(), &target(None), &ExportFilter::new(), &mut heartbeat)
        .await
        .unwrap();

    assert_eq!(manifest.entity_count(), 25);
    assert_eq!(execution.heartbeats.load(Ordering::SeqCst), expected);
    assert_eq!(heartbeat.beats() as usize, expected);

    manifest.close().unwrap();
}

#[test_case(0, 1 ; "empty collection keeps one part")]
#[test_case(999, 1 ; "just below threshold")]
#[test_case(1000, 2 ; "exact multiple opens an empty part")]
#[test_case(2500, 3 ; "two rotations")]
#[tokio::test]
async fn test_rotation_count(count: usize, expected_parts: usize) {
    let (app, _) = app_with_users(count);

    let manifest = walk(app, &target(None), &ExportFilter::new()).await.unwrap();
    let (entities, _) = lines(&manifest).await;

    assert_eq!(manifest.entity_files().len(), expected_parts);
    assert_eq!(manifest.connection_files().len(), expected_parts);
    for part in &entities[..entities.len() - 1] {
        assert_eq!(part.len(), 1000);
    }
    assert_eq!(entities.iter().map(Vec::len).sum::<usize>(), count);

    manifest.close().unwrap();
}

#[tokio::test]
async fn test_counter_spans_collections() {
    let mut settings = ExportSettings::default();
    settings.rotation_threshold = 10;

    let mut app = InMemoryApplication::new(ApplicationId::generate());
    for n in 0..6 {
        app.add_entity("pets", user(n));
    }
    for n in 0..6 {
        app.add_entity("users", user(n));
    }

    let manifest = walk_with(&settings, app, &target(None), &ExportFilter::new())
        .await
        .unwrap();
    let (entities, _) = lines(&manifest).await;

    assert_eq!(entities.len(), 2);
    assert_eq!(entities[0].len(), 10);
    assert_eq!(entities[1].len(), 2);

    manifest.close().unwrap();
}

#[tokio::test]
async fn test_zero_threshold_never_rotates() {
    let mut settings = ExportSettings::default();
    settings.rotation_threshold = 0;
    let (app, _) = app_with_users(30);

    let manifest = walk_with(&settings, app, &target(None), &ExportFilter::new())
        .await
        .unwrap();
    let (entities, _) = lines(&manifest).await;

    assert_eq!(entities.len(), 1);
    assert_eq!(entities[0].len(), 30);

    manifest.close().unwrap();
}

#[tokio::test]
async fn test_uuid_survives_round_trip() {
    let (app, users) = app_with_users(25);

    let manifest = walk(app, &target(None), &ExportFilter::new()).await.unwrap();
    let (entities, _) = lines(&manifest).await;

    for (record, entity) in entities[0].iter().zip(&users) {
        assert_eq!(record["uuid"], json!(entity.uuid.to_string()));
        assert_eq!(record["type"], "user");
        assert_eq!(record["username"], entity.properties["username"]);
    }

    manifest.close().unwrap();
}

#[tokio::test]
async fn test_connection_type_filter() {
    let (mut app, users) = app_with_users(3);
    app.connect(users[0].uuid, "likes", users[1].uuid)
        .connect(users[0].uuid, "owns", users[2].uuid)
        .connect(users[1].uuid, "owns", users[2].uuid);

    let filter = ExportFilter::new().with_connection_type("likes");
    let manifest = walk(app, &target(None), &filter).await.unwrap();
    let (_, connections) = lines(&manifest).await;

    assert_eq!(connections[0].len(), 1);
    let line = &connections[0][0];
    let by_type = line[users[0].uuid.to_string()].as_object().unwrap();
    assert_eq!(by_type.len(), 1);
    assert_eq!(by_type["likes"], json!([users[1].uuid.to_string()]));

    manifest.close().unwrap();
}

#[tokio::test]
async fn test_wildcard_connection_filter_keeps_every_type() {
    let (mut app, users) = app_with_users(3);
    app.connect(users[0].uuid, "likes", users[1].uuid)
        .connect(users[0].uuid, "owns", users[2].uuid);

    let manifest = walk(app, &target(None), &ExportFilter::new()).await.unwrap();
    let (_, connections) = lines(&manifest).await;

    let by_type = connections[0][0][users[0].uuid.to_string()]
        .as_object()
        .unwrap()
        .clone();
    assert_eq!(by_type.len(), 2);

    manifest.close().unwrap();
}

#[tokio::test]
async fn test_unresolvable_targets_are_omitted() {
    let (mut app, users) = app_with_users(1);
    app.connect(users[0].uuid, "likes", Uuid::new_v4());

    let manifest = walk(app, &target(None), &ExportFilter::new()).await.unwrap();
    let (_, connections) = lines(&manifest).await;

    assert!(connections[0].is_empty());

    manifest.close().unwrap();
}

#[tokio::test]
async fn test_empty_dictionaries_are_not_written() {
    let (mut app, users) = app_with_users(2);
    let mut prefs = Map::new();
    prefs.insert("theme".to_string(), json!("dark"));
    app.add_dictionary(users[0].uuid, "prefs", prefs)
        .add_dictionary(users[0].uuid, "empty", Map::new())
        .add_dictionary(users[1].uuid, "empty", Map::new());

    let manifest = walk(app, &target(None), &ExportFilter::new()).await.unwrap();
    let (entities, _) = lines(&manifest).await;

    let first = &entities[0][0];
    assert_eq!(first["dictionaries"], json!({"prefs": {"theme": "dark"}}));
    assert!(entities[0][1].get("dictionaries").is_none());

    manifest.close().unwrap();
}

#[tokio::test]
async fn test_dictionaries_replace_property_of_same_name() {
    let mut app = InMemoryApplication::new(ApplicationId::generate());
    let entity = Entity::builder()
        .entity_type("user")
        .property("username", json!("clash"))
        .property("dictionaries", json!("stale"))
        .build()
        .unwrap();
    let uuid = entity.uuid;
    app.add_entity("users", entity);
    let mut prefs = Map::new();
    prefs.insert("theme".to_string(), json!("dark"));
    app.add_dictionary(uuid, "prefs", prefs);

    let manifest = walk(app, &target(None), &ExportFilter::new()).await.unwrap();
    let (entities, _) = lines(&manifest).await;

    let record = &entities[0][0];
    assert_eq!(record["dictionaries"], json!({"prefs": {"theme": "dark"}}));
    assert_eq!(record["username"], json!("clash"));

    manifest.close().unwrap();
}

#[tokio::test]
async fn test_members_embedded_for_hinted_collection() {
    let mut app = InMemoryApplication::new(ApplicationId::generate());
    let group = Entity::builder().entity_type("group").build().unwrap();
    let member = user(1);
    app.add_entity("groups", group.clone())
        .add_entity("users", member.clone())
        .add_member(group.uuid, "groups", member.uuid);

    let manifest = walk(app, &target(Some("Groups")), &ExportFilter::new())
        .await
        .unwrap();
    let (entities, _) = lines(&manifest).await;

    assert_eq!(entities[0].len(), 1);
    assert_eq!(entities[0][0]["groups"], json!([member.uuid.to_string()]));

    manifest.close().unwrap();
}

#[tokio::test]
async fn test_rejected_collection_is_skipped() {
    let (mut app, _) = app_with_users(5);
    app.add_entity("pets", user(99))
        .reject_queries("pets", "no index on pets");

    let manifest = walk(app, &target(None), &ExportFilter::new()).await.unwrap();

    assert_eq!(manifest.entity_count(), 5);
    assert_eq!(manifest.skipped().len(), 1);
    assert!(manifest.skipped()[0].contains("pets"));

    manifest.close().unwrap();
}

#[tokio::test]
async fn test_read_failure_aborts_and_cleans_up() {
    let scratch = TempDir::new().unwrap();
    let mut settings = ExportSettings::default();
    settings.scratch_dir = Some(scratch.path().to_string_lossy().to_string());

    let (mut app, _) = app_with_users(5);
    app.fail_reads("users", "disk on fire");

    let err = walk_with(&settings, app, &target(None), &ExportFilter::new())
        .await
        .unwrap_err();

    assert!(matches!(err, ExportError::Store(StoreError::ReadFailed(_))));
    assert_eq!(std::fs::read_dir(scratch.path()).unwrap().count(), 0);
}
