//! S3-compatible object storage client
//!
//! Wraps the AWS SDK client with path-style addressing
//! (`{endpoint}/{bucket}/{key}`) so MinIO and other S3-compatible services
//! work alongside AWS. The SDK signs requests; retries are disabled and
//! failures surface to the uploader, which aborts open sessions.

use super::{BucketStatus, CompletedPart, MultipartSession, ObjectStorage, StorageResult};
use crate::config::{S3Config, SecretString};
use crate::domain::StorageError;
use async_trait::async_trait;
use aws_sdk_s3::config::http::HttpResponse;
use aws_sdk_s3::config::retry::RetryConfig;
use aws_sdk_s3::config::timeout::TimeoutConfig;
use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region, RequestChecksumCalculation};
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_s3::operation::create_bucket::CreateBucketError;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{
    BucketLocationConstraint, CompletedMultipartUpload, CompletedPart as S3CompletedPart,
    CreateBucketConfiguration,
};
use aws_sdk_s3::Client;
use secrecy::ExposeSecret;
use std::time::Duration;

/// Region that takes no location constraint on bucket creation
const DEFAULT_REGION: &str = "us-east-1";

/// S3 client bound to one set of credentials
pub struct S3Client {
    client: Client,
    region: String,
}

impl S3Client {
    /// Create a new S3 client for one set of credentials
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoint is not an http(s) URL.
    pub fn new(
        config: &S3Config,
        access_key: SecretString,
        secret_key: SecretString,
    ) -> StorageResult<Self> {
        if !config.endpoint.starts_with("http://") && !config.endpoint.starts_with("https://") {
            return Err(StorageError::ConnectionFailed(format!(
                "Invalid endpoint '{}'",
                config.endpoint
            )));
        }

        let access_key_id: &str = access_key.expose_secret().as_ref();
        let secret_access_key: &str = secret_key.expose_secret().as_ref();
        let credentials = Credentials::new(
            access_key_id,
            secret_access_key,
            None,
            None,
            "entity-export",
        );

        let timeouts = TimeoutConfig::builder()
            .connect_timeout(Duration::from_secs(30))
            .operation_timeout(Duration::from_secs(config.timeout_seconds))
            .build();

        let sdk_config = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .endpoint_url(&config.endpoint)
            .region(Region::new(config.region.clone()))
            .credentials_provider(credentials)
            .force_path_style(true)
            .retry_config(RetryConfig::disabled())
            .timeout_config(timeouts)
            .request_checksum_calculation(RequestChecksumCalculation::WhenRequired)
            .build();

        Ok(Self {
            client: Client::from_conf(sdk_config),
            region: config.region.clone(),
        })
    }

    fn bucket_configuration(&self) -> Option<CreateBucketConfiguration> {
        if self.region == DEFAULT_REGION {
            return None;
        }
        Some(
            CreateBucketConfiguration::builder()
                .location_constraint(BucketLocationConstraint::from(self.region.as_str()))
                .build(),
        )
    }
}

/// Maps an SDK failure onto [`StorageError`]
///
/// A 403 status or an `AccessDenied` code becomes `AccessDenied`; other
/// service errors keep their HTTP status and message.
fn storage_error<E>(err: SdkError<E, HttpResponse>) -> StorageError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
{
    match err {
        SdkError::ServiceError(context) => {
            let status = context.raw().status().as_u16();
            let source = context.err();
            let message = source
                .message()
                .or_else(|| source.code())
                .map(str::to_string)
                .unwrap_or_else(|| format!("HTTP {status}"));

            if status == 403 || source.code() == Some("AccessDenied") {
                return StorageError::AccessDenied(message);
            }
            StorageError::RequestFailed { status, message }
        }
        response @ SdkError::ResponseError(_) => {
            StorageError::InvalidResponse(DisplayErrorContext(&response).to_string())
        }
        other => StorageError::ConnectionFailed(DisplayErrorContext(&other).to_string()),
    }
}

#[async_trait]
impl ObjectStorage for S3Client {
    async fn ensure_bucket(&self, bucket: &str) -> StorageResult<BucketStatus> {
        let result = self
            .client
            .create_bucket()
            .bucket(bucket)
            .set_create_bucket_configuration(self.bucket_configuration())
            .send()
            .await;

        match result {
            Ok(_) => Ok(BucketStatus::Created),
            Err(err) if matches!(
                err.as_service_error(),
                Some(CreateBucketError::BucketAlreadyOwnedByYou(_))
            ) =>
            {
                Ok(BucketStatus::AlreadyOwned)
            }
            Err(err) => Err(storage_error(err)),
        }
    }

    async fn put_object(&self, bucket: &str, key: &str, body: Vec<u8>) -> StorageResult<()> {
        let length = i64::try_from(body.len())
            .map_err(|_| StorageError::Io(format!("Object {key} is too large for one request")))?;

        tracing::trace!(bucket, key, bytes = length, "Putting object");

        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .content_length(length)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(storage_error)?;
        Ok(())
    }

    async fn initiate_multipart(&self, bucket: &str, key: &str) -> StorageResult<MultipartSession> {
        let output = self
            .client
            .create_multipart_upload()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(storage_error)?;

        let upload_id = output.upload_id().ok_or_else(|| {
            StorageError::InvalidResponse("CreateMultipartUpload response has no upload id".to_string())
        })?;

        Ok(MultipartSession {
            bucket: bucket.to_string(),
            key: key.to_string(),
            upload_id: upload_id.to_string(),
        })
    }

    async fn upload_part(
        &self,
        session: &MultipartSession,
        part_number: u32,
        body: Vec<u8>,
        _is_last: bool,
    ) -> StorageResult<CompletedPart> {
        let number = i32::try_from(part_number)
            .map_err(|_| StorageError::Io(format!("Part number {part_number} out of range")))?;

        let output = self
            .client
            .upload_part()
            .bucket(&session.bucket)
            .key(&session.key)
            .upload_id(&session.upload_id)
            .part_number(number)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(storage_error)?;

        let etag = output.e_tag().ok_or_else(|| {
            StorageError::InvalidResponse(format!("Part {part_number} response has no ETag"))
        })?;

        Ok(CompletedPart {
            part_number,
            etag: etag.to_string(),
        })
    }

    async fn complete_multipart(
        &self,
        session: &MultipartSession,
        parts: &[CompletedPart],
    ) -> StorageResult<()> {
        let mut upload = CompletedMultipartUpload::builder();
        for part in parts {
            let number = i32::try_from(part.part_number).map_err(|_| {
                StorageError::Io(format!("Part number {} out of range", part.part_number))
            })?;
            upload = upload.parts(
                S3CompletedPart::builder()
                    .part_number(number)
                    .e_tag(&part.etag)
                    .build(),
            );
        }

        self.client
            .complete_multipart_upload()
            .bucket(&session.bucket)
            .key(&session.key)
            .upload_id(&session.upload_id)
            .multipart_upload(upload.build())
            .send()
            .await
            .map_err(storage_error)?;
        Ok(())
    }

    async fn abort_multipart(&self, session: &MultipartSession) -> StorageResult<()> {
        self.client
            .abort_multipart_upload()
            .bucket(&session.bucket)
            .key(&session.key)
            .upload_id(&session.upload_id)
            .send()
            .await
            .map_err(storage_error)?;
        Ok(())
    }
}
