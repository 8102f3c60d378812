//! Chunked uploader
//!
//! Moves the files of a [`FileManifest`] into object storage. Files smaller
//! than one part go up in a single PUT; anything larger is streamed as a
//! multipart upload and aborted on any failure, including the file growing
//! past the configured ceiling.

use crate::adapters::storage::{
    BucketStatus, CompletedPart, MultipartSession, ObjectStorage, S3Client,
};
use crate::config::{S3Config, UploadConfig};
use crate::core::export::manifest::FileManifest;
use crate::domain::{ExportError, ExportTarget, Result, StorageError};
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};

/// Moves a finished manifest to the export destination
#[async_trait]
pub trait Uploader: Send + Sync {
    /// Uploads every file of `manifest`, entity files first
    ///
    /// Destination keys are `entities{i}{base_name}` and
    /// `connections{i}{base_name}` with `i` counting parts from 1. Returns the
    /// number of files uploaded.
    async fn transfer_manifest(
        &self,
        target: &ExportTarget,
        manifest: &FileManifest,
        base_name: &str,
    ) -> Result<usize>;
}

/// Uploader driving any [`ObjectStorage`]
pub struct ChunkedUploader {
    storage: Arc<dyn ObjectStorage>,
    part_size: u64,
    max_size: u64,
}

impl ChunkedUploader {
    pub fn new(storage: Arc<dyn ObjectStorage>, config: &UploadConfig) -> Self {
        Self {
            storage,
            part_size: config.part_size_bytes,
            max_size: config.max_size_bytes,
        }
    }

    async fn ensure_bucket(&self, bucket: &str) -> Result<()> {
        match self.storage.ensure_bucket(bucket).await {
            Ok(BucketStatus::Created) => {
                tracing::info!(bucket = %bucket, "Created export bucket");
                Ok(())
            }
            Ok(BucketStatus::AlreadyOwned) => {
                tracing::debug!(bucket = %bucket, "Export bucket already exists");
                Ok(())
            }
            Err(err @ StorageError::AccessDenied(_)) => Err(err.into()),
            Err(err) => {
                // The bucket may still be usable; the uploads will tell
                tracing::warn!(bucket = %bucket, error = %err, "Could not ensure export bucket");
                Ok(())
            }
        }
    }

    /// Uploads one file, returning the number of bytes sent
    ///
    /// # Errors
    ///
    /// Returns `OversizedFile` if the file is larger than the configured
    /// ceiling; an open multipart session is aborted first.
    pub async fn transfer(&self, bucket: &str, path: &Path, key: &str) -> Result<u64> {
        let file = File::open(path).await?;
        let capacity = usize::try_from(self.part_size).unwrap_or(usize::MAX);
        let mut reader = BufReader::with_capacity(capacity, file);

        let first = self.read_part(&mut reader).await?;
        if (first.len() as u64) < self.part_size {
            let size = first.len() as u64;
            self.check_ceiling(key, size)?;
            self.storage.put_object(bucket, key, first).await?;
            tracing::debug!(key = %key, bytes = size, "Uploaded file in a single request");
            return Ok(size);
        }

        let session = self.storage.initiate_multipart(bucket, key).await?;
        match self.upload_parts(&session, first, &mut reader).await {
            Ok(size) => {
                tracing::debug!(key = %key, bytes = size, "Completed multipart upload");
                Ok(size)
            }
            Err(err) => {
                if let Err(abort_err) = self.storage.abort_multipart(&session).await {
                    tracing::warn!(
                        key = %key,
                        upload_id = %session.upload_id,
                        error = %abort_err,
                        "Failed to abort multipart upload"
                    );
                }
                Err(err)
            }
        }
    }

    async fn upload_parts(
        &self,
        session: &MultipartSession,
        first: Vec<u8>,
        reader: &mut BufReader<File>,
    ) -> Result<u64> {
        let mut parts: Vec<CompletedPart> = Vec::new();
        let mut written: u64 = 0;
        let mut chunk = first;
        let mut part_number: u32 = 1;

        loop {
            let is_last = reader.fill_buf().await?.is_empty();
            let total = written + chunk.len() as u64;
            self.check_ceiling(&session.key, total)?;

            let part = self
                .storage
                .upload_part(session, part_number, chunk, is_last)
                .await?;
            parts.push(part);
            written = total;

            if is_last {
                break;
            }
            chunk = self.read_part(reader).await?;
            part_number += 1;
        }

        self.storage.complete_multipart(session, &parts).await?;
        Ok(written)
    }

    async fn read_part(&self, reader: &mut BufReader<File>) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        reader.take(self.part_size).read_to_end(&mut buf).await?;
        Ok(buf)
    }

    fn check_ceiling(&self, key: &str, written: u64) -> Result<()> {
        if written > self.max_size {
            return Err(ExportError::OversizedFile {
                key: key.to_string(),
                written,
                limit: self.max_size,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl Uploader for ChunkedUploader {
    async fn transfer_manifest(
        &self,
        target: &ExportTarget,
        manifest: &FileManifest,
        base_name: &str,
    ) -> Result<usize> {
        let bucket = target.storage.bucket_location.as_str();
        self.ensure_bucket(bucket).await?;

        let entity_keys = manifest
            .entity_files()
            .iter()
            .enumerate()
            .map(|(i, path)| (path, format!("entities{}{base_name}", i + 1)));
        let connection_keys = manifest
            .connection_files()
            .iter()
            .enumerate()
            .map(|(i, path)| (path, format!("connections{}{base_name}", i + 1)));

        let mut uploaded = 0;
        for (path, key) in entity_keys.chain(connection_keys) {
            let bytes = self.transfer(bucket, path, &key).await?;
            tracing::info!(bucket = %bucket, key = %key, bytes, "Uploaded export file");
            uploaded += 1;
        }

        Ok(uploaded)
    }
}

/// Uploader writing to S3 with the credentials carried by each target
pub struct S3Uploader {
    storage: S3Config,
    upload: UploadConfig,
}

impl S3Uploader {
    pub fn new(storage: S3Config, upload: UploadConfig) -> Self {
        Self { storage, upload }
    }
}

#[async_trait]
impl Uploader for S3Uploader {
    async fn transfer_manifest(
        &self,
        target: &ExportTarget,
        manifest: &FileManifest,
        base_name: &str,
    ) -> Result<usize> {
        let client = S3Client::new(
            &self.storage,
            target.storage.s3_access_id.clone(),
            target.storage.s3_key.clone(),
        )?;

        ChunkedUploader::new(Arc::new(client), &self.upload)
            .transfer_manifest(target, manifest, base_name)
            .await
    }
}
