//! Object storage abstraction layer
//!
//! Exported files end up in an object store reachable through the
//! [`ObjectStorage`] trait: a bucket-ensure call, single-shot PUT, and the
//! multipart session protocol (initiate, upload part, complete, abort).
//!
//! Two implementations are provided:
//! - [`S3Client`] - S3-compatible services through the AWS SDK
//! - [`LocalFsStorage`] - a directory tree on the local filesystem

pub mod local;
pub mod s3;

pub use local::LocalFsStorage;
pub use s3::S3Client;

use crate::domain::StorageError;
use async_trait::async_trait;

/// Result alias for object storage calls
pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Outcome of ensuring a bucket exists
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BucketStatus {
    /// The bucket was created by this call
    Created,
    /// The bucket already existed and belongs to the caller
    AlreadyOwned,
}

/// An open multipart upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultipartSession {
    /// Destination bucket
    pub bucket: String,

    /// Destination key
    pub key: String,

    /// Server-assigned upload id
    pub upload_id: String,
}

/// A part accepted by the storage service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedPart {
    /// 1-based part number
    pub part_number: u32,

    /// Entity tag returned for the part
    pub etag: String,
}

/// Destination object storage
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Creates the bucket if it does not exist
    ///
    /// # Errors
    ///
    /// Returns `StorageError::AccessDenied` if the credentials may not use
    /// the bucket; other errors are reported as-is.
    async fn ensure_bucket(&self, bucket: &str) -> StorageResult<BucketStatus>;

    /// Stores `body` under `key` in one request
    async fn put_object(&self, bucket: &str, key: &str, body: Vec<u8>) -> StorageResult<()>;

    /// Opens a multipart upload session
    async fn initiate_multipart(&self, bucket: &str, key: &str) -> StorageResult<MultipartSession>;

    /// Uploads one numbered part
    ///
    /// `is_last` marks the final part, which may be smaller than the others.
    async fn upload_part(
        &self,
        session: &MultipartSession,
        part_number: u32,
        body: Vec<u8>,
        is_last: bool,
    ) -> StorageResult<CompletedPart>;

    /// Stitches the uploaded parts into the final object
    async fn complete_multipart(
        &self,
        session: &MultipartSession,
        parts: &[CompletedPart],
    ) -> StorageResult<()>;

    /// Discards a session and every part uploaded to it
    async fn abort_multipart(&self, session: &MultipartSession) -> StorageResult<()>;
}
