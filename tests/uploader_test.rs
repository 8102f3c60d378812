//! Integration tests for the chunked uploader
//!
//! A recording object store captures every call so the tests can check when
//! the uploader uses a single PUT, how it numbers parts, and that it always
//! aborts a multipart session it cannot finish.

use async_trait::async_trait;
use entity_export::adapters::storage::{
    BucketStatus, CompletedPart, MultipartSession, ObjectStorage, StorageResult,
};
use entity_export::config::{secret_string, UploadConfig, MIB};
use entity_export::core::export::scratch::JsonLineWriter;
use entity_export::core::export::{ChunkedUploader, FileManifest, Uploader};
use entity_export::domain::{ExportError, ExportTarget, JobId, StorageError, StorageInfo};
use serde_json::json;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

#[derive(Debug, Clone, PartialEq)]
enum Call {
    EnsureBucket(String),
    Put { key: String, len: usize },
    Initiate(String),
    Part { number: u32, len: usize, is_last: bool },
    Complete { parts: usize },
    Abort(String),
}

#[derive(Default)]
struct RecordingStorage {
    calls: Mutex<Vec<Call>>,
    fail_part: Option<u32>,
    bucket_error: Option<fn() -> StorageError>,
}

impl RecordingStorage {
    fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl ObjectStorage for RecordingStorage {
    async fn ensure_bucket(&self, bucket: &str) -> StorageResult<BucketStatus> {
        self.record(Call::EnsureBucket(bucket.to_string()));
        match self.bucket_error {
            Some(error) => Err(error()),
            None => Ok(BucketStatus::AlreadyOwned),
        }
    }

    async fn put_object(&self, _bucket: &str, key: &str, body: Vec<u8>) -> StorageResult<()> {
        self.record(Call::Put {
            key: key.to_string(),
            len: body.len(),
        });
        Ok(())
    }

    async fn initiate_multipart(&self, bucket: &str, key: &str) -> StorageResult<MultipartSession> {
        self.record(Call::Initiate(key.to_string()));
        Ok(MultipartSession {
            bucket: bucket.to_string(),
            key: key.to_string(),
            upload_id: "upload-1".to_string(),
        })
    }

    async fn upload_part(
        &self,
        _session: &MultipartSession,
        part_number: u32,
        body: Vec<u8>,
        is_last: bool,
    ) -> StorageResult<CompletedPart> {
        if self.fail_part == Some(part_number) {
            return Err(StorageError::RequestFailed {
                status: 500,
                message: "part rejected".to_string(),
            });
        }
        self.record(Call::Part {
            number: part_number,
            len: body.len(),
            is_last,
        });
        Ok(CompletedPart {
            part_number,
            etag: format!("etag-{part_number}"),
        })
    }

    async fn complete_multipart(
        &self,
        _session: &MultipartSession,
        parts: &[CompletedPart],
    ) -> StorageResult<()> {
        self.record(Call::Complete { parts: parts.len() });
        Ok(())
    }

    async fn abort_multipart(&self, session: &MultipartSession) -> StorageResult<()> {
        self.record(Call::Abort(session.upload_id.clone()));
        Ok(())
    }
}

fn file_of(dir: &TempDir, name: &str, len: u64) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, vec![b'x'; len as usize]).unwrap();
    path
}

fn uploader(storage: Arc<RecordingStorage>, max: u64) -> ChunkedUploader {
    ChunkedUploader::new(
        storage,
        &UploadConfig {
            part_size_bytes: 5 * MIB,
            max_size_bytes: max,
        },
    )
}

fn target() -> ExportTarget {
    ExportTarget {
        organization_id: None,
        collection_name: None,
        storage: StorageInfo {
            bucket_location: "exports".to_string(),
            s3_access_id: secret_string("access".to_string()),
            s3_key: secret_string("secret".to_string()),
        },
    }
}

#[tokio::test]
async fn test_3_mib_file_uses_single_put() {
    let dir = TempDir::new().unwrap();
    let path = file_of(&dir, "small.json", 3 * MIB);
    let storage = Arc::new(RecordingStorage::default());

    let written = uploader(Arc::clone(&storage), 50 * MIB)
        .transfer("exports", &path, "small.json")
        .await
        .unwrap();

    assert_eq!(written, 3 * MIB);
    assert_eq!(
        storage.calls(),
        vec![Call::Put {
            key: "small.json".to_string(),
            len: (3 * MIB) as usize
        }]
    );
}

#[tokio::test]
async fn test_12_mib_file_uses_three_parts() {
    let dir = TempDir::new().unwrap();
    let path = file_of(&dir, "big.json", 12 * MIB);
    let storage = Arc::new(RecordingStorage::default());

    let written = uploader(Arc::clone(&storage), 50 * MIB)
        .transfer("exports", &path, "big.json")
        .await
        .unwrap();

    assert_eq!(written, 12 * MIB);
    assert_eq!(
        storage.calls(),
        vec![
            Call::Initiate("big.json".to_string()),
            Call::Part {
                number: 1,
                len: (5 * MIB) as usize,
                is_last: false
            },
            Call::Part {
                number: 2,
                len: (5 * MIB) as usize,
                is_last: false
            },
            Call::Part {
                number: 3,
                len: (2 * MIB) as usize,
                is_last: true
            },
            Call::Complete { parts: 3 },
        ]
    );
}

#[tokio::test]
async fn test_file_of_exactly_one_part_is_multipart() {
    let dir = TempDir::new().unwrap();
    let path = file_of(&dir, "edge.json", 5 * MIB);
    let storage = Arc::new(RecordingStorage::default());

    uploader(Arc::clone(&storage), 50 * MIB)
        .transfer("exports", &path, "edge.json")
        .await
        .unwrap();

    let calls = storage.calls();
    assert_eq!(calls[0], Call::Initiate("edge.json".to_string()));
    assert_eq!(
        calls[1],
        Call::Part {
            number: 1,
            len: (5 * MIB) as usize,
            is_last: true
        }
    );
    assert_eq!(calls[2], Call::Complete { parts: 1 });
}

#[tokio::test]
async fn test_oversized_file_aborts_session() {
    let dir = TempDir::new().unwrap();
    let path = file_of(&dir, "huge.json", 12 * MIB);
    let storage = Arc::new(RecordingStorage::default());

    let err = uploader(Arc::clone(&storage), 10 * MIB)
        .transfer("exports", &path, "huge.json")
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ExportError::OversizedFile { written, limit, .. } if written == 12 * MIB && limit == 10 * MIB
    ));
    let calls = storage.calls();
    assert_eq!(calls.iter().filter(|c| matches!(c, Call::Part { .. })).count(), 2);
    assert_eq!(calls.last(), Some(&Call::Abort("upload-1".to_string())));
    assert!(!calls.iter().any(|c| matches!(c, Call::Complete { .. })));
}

#[tokio::test]
async fn test_failed_part_aborts_session() {
    let dir = TempDir::new().unwrap();
    let path = file_of(&dir, "flaky.json", 12 * MIB);
    let storage = Arc::new(RecordingStorage {
        fail_part: Some(2),
        ..Default::default()
    });

    let err = uploader(Arc::clone(&storage), 50 * MIB)
        .transfer("exports", &path, "flaky.json")
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ExportError::Upload(StorageError::RequestFailed { status: 500, .. })
    ));
    assert_eq!(storage.calls().last(), Some(&Call::Abort("upload-1".to_string())));
}

async fn manifest_with_parts(parts: usize) -> FileManifest {
    let mut manifest = FileManifest::create(JobId::generate(), None).unwrap();
    for _ in 0..parts {
        let (entities, connections) = manifest.next_part();
        let mut writer = JsonLineWriter::create(entities).await.unwrap();
        writer.write_value(&json!({"uuid": "a"})).await.unwrap();
        writer.finish().await.unwrap();
        JsonLineWriter::create(connections)
            .await
            .unwrap()
            .finish()
            .await
            .unwrap();
    }
    manifest
}

#[tokio::test]
async fn test_manifest_keys_entities_first() {
    let manifest = manifest_with_parts(2).await;
    let storage = Arc::new(RecordingStorage::default());

    let uploaded = uploader(Arc::clone(&storage), 50 * MIB)
        .transfer_manifest(&target(), &manifest, "app.job.1.json")
        .await
        .unwrap();

    assert_eq!(uploaded, 4);
    let keys: Vec<String> = storage
        .calls()
        .into_iter()
        .filter_map(|call| match call {
            Call::Put { key, .. } => Some(key),
            _ => None,
        })
        .collect();
    assert_eq!(
        keys,
        vec![
            "entities1app.job.1.json",
            "entities2app.job.1.json",
            "connections1app.job.1.json",
            "connections2app.job.1.json",
        ]
    );
    assert_eq!(storage.calls()[0], Call::EnsureBucket("exports".to_string()));

    manifest.close().unwrap();
}

#[tokio::test]
async fn test_bucket_access_denied_stops_transfer() {
    let manifest = manifest_with_parts(1).await;
    let storage = Arc::new(RecordingStorage {
        bucket_error: Some(|| StorageError::AccessDenied("nope".to_string())),
        ..Default::default()
    });

    let err = uploader(Arc::clone(&storage), 50 * MIB)
        .transfer_manifest(&target(), &manifest, "app.json")
        .await
        .unwrap_err();

    assert!(matches!(err, ExportError::Upload(StorageError::AccessDenied(_))));
    assert_eq!(storage.calls().len(), 1);

    manifest.close().unwrap();
}

#[tokio::test]
async fn test_other_bucket_errors_are_not_fatal() {
    let manifest = manifest_with_parts(1).await;
    let storage = Arc::new(RecordingStorage {
        bucket_error: Some(|| StorageError::RequestFailed {
            status: 409,
            message: "BucketAlreadyExists".to_string(),
        }),
        ..Default::default()
    });

    let uploaded = uploader(Arc::clone(&storage), 50 * MIB)
        .transfer_manifest(&target(), &manifest, "app.json")
        .await
        .unwrap();

    assert_eq!(uploaded, 2);

    manifest.close().unwrap();
}
