//! Local filesystem object storage
//!
//! Buckets are directories under a root; keys are file paths inside them.
//! Multipart parts are staged under `{root}/.multipart/{upload_id}` and
//! concatenated in part order on completion.

use super::{BucketStatus, CompletedPart, MultipartSession, ObjectStorage, StorageResult};
use crate::domain::StorageError;
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

const STAGING_DIR: &str = ".multipart";

/// Object storage rooted at a local directory
#[derive(Debug, Clone)]
pub struct LocalFsStorage {
    root: PathBuf,
}

impl LocalFsStorage {
    /// Creates a store rooted at `root`; the directory is created lazily
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Path an object is stored at
    pub fn object_path(&self, bucket: &str, key: &str) -> StorageResult<PathBuf> {
        Ok(self.bucket_path(bucket)?.join(relative(key)?))
    }

    fn bucket_path(&self, bucket: &str) -> StorageResult<PathBuf> {
        if bucket.is_empty() || bucket == STAGING_DIR {
            return Err(StorageError::RequestFailed {
                status: 400,
                message: format!("invalid bucket name '{bucket}'"),
            });
        }
        Ok(self.root.join(relative(bucket)?))
    }

    fn staging_path(&self, session: &MultipartSession) -> PathBuf {
        self.root.join(STAGING_DIR).join(&session.upload_id)
    }
}

/// Rejects absolute paths and `..` so objects stay under the root
fn relative(name: &str) -> StorageResult<&Path> {
    let path = Path::new(name);
    let escapes = path
        .components()
        .any(|c| !matches!(c, Component::Normal(_)));
    if escapes {
        return Err(StorageError::RequestFailed {
            status: 400,
            message: format!("invalid object name '{name}'"),
        });
    }
    Ok(path)
}

fn io_error(context: &str, err: std::io::Error) -> StorageError {
    StorageError::Io(format!("{context}: {err}"))
}

async fn write_file(path: &Path, body: &[u8]) -> StorageResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .await
            .map_err(|e| io_error("create directory", e))?;
    }
    fs::write(path, body)
        .await
        .map_err(|e| io_error("write object", e))
}

#[async_trait]
impl ObjectStorage for LocalFsStorage {
    async fn ensure_bucket(&self, bucket: &str) -> StorageResult<BucketStatus> {
        let path = self.bucket_path(bucket)?;
        if fs::metadata(&path).await.is_ok() {
            return Ok(BucketStatus::AlreadyOwned);
        }
        fs::create_dir_all(&path)
            .await
            .map_err(|e| io_error("create bucket", e))?;
        Ok(BucketStatus::Created)
    }

    async fn put_object(&self, bucket: &str, key: &str, body: Vec<u8>) -> StorageResult<()> {
        write_file(&self.object_path(bucket, key)?, &body).await
    }

    async fn initiate_multipart(&self, bucket: &str, key: &str) -> StorageResult<MultipartSession> {
        // Validate names up front
        self.object_path(bucket, key)?;

        let session = MultipartSession {
            bucket: bucket.to_string(),
            key: key.to_string(),
            upload_id: Uuid::new_v4().to_string(),
        };
        fs::create_dir_all(self.staging_path(&session))
            .await
            .map_err(|e| io_error("create staging directory", e))?;
        Ok(session)
    }

    async fn upload_part(
        &self,
        session: &MultipartSession,
        part_number: u32,
        body: Vec<u8>,
        _is_last: bool,
    ) -> StorageResult<CompletedPart> {
        let staging = self.staging_path(session);
        if fs::metadata(&staging).await.is_err() {
            return Err(StorageError::RequestFailed {
                status: 404,
                message: format!("no such upload '{}'", session.upload_id),
            });
        }

        let etag = format!("\"{}\"", hex::encode(Sha256::digest(&body)));
        write_file(&staging.join(format!("{part_number:05}")), &body).await?;
        Ok(CompletedPart { part_number, etag })
    }

    async fn complete_multipart(
        &self,
        session: &MultipartSession,
        parts: &[CompletedPart],
    ) -> StorageResult<()> {
        let staging = self.staging_path(session);
        let destination = self.object_path(&session.bucket, &session.key)?;
        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| io_error("create directory", e))?;
        }

        let mut ordered = parts.to_vec();
        ordered.sort_by_key(|part| part.part_number);

        let mut out = fs::File::create(&destination)
            .await
            .map_err(|e| io_error("create object", e))?;
        for part in &ordered {
            let bytes = fs::read(staging.join(format!("{:05}", part.part_number)))
                .await
                .map_err(|e| io_error("read part", e))?;
            out.write_all(&bytes)
                .await
                .map_err(|e| io_error("write object", e))?;
        }
        out.flush().await.map_err(|e| io_error("flush object", e))?;

        fs::remove_dir_all(&staging)
            .await
            .map_err(|e| io_error("remove staging directory", e))
    }

    async fn abort_multipart(&self, session: &MultipartSession) -> StorageResult<()> {
        let staging = self.staging_path(session);
        match fs::remove_dir_all(&staging).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_error("remove staging directory", e)),
        }
    }
}
