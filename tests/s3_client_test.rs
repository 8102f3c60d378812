//! HTTP-level tests for the S3 client against a mock server
//!
//! The SDK client is pointed at the mock with path-style addressing, so
//! each operation is matched by method, path and query.

use entity_export::adapters::storage::{
    BucketStatus, CompletedPart, MultipartSession, ObjectStorage, S3Client,
};
use entity_export::config::{secret_string, S3Config};
use entity_export::domain::StorageError;
use mockito::{Matcher, Server};

fn client(server: &Server) -> S3Client {
    let config = S3Config {
        endpoint: server.url(),
        region: "us-east-1".to_string(),
        timeout_seconds: 5,
    };
    S3Client::new(
        &config,
        secret_string("AKIDEXAMPLE".to_string()),
        secret_string("secret".to_string()),
    )
    .unwrap()
}

#[tokio::test]
async fn test_ensure_bucket_created_with_signed_request() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("PUT", "/exports")
        .match_header(
            "authorization",
            Matcher::Regex(r"^AWS4-HMAC-SHA256 Credential=AKIDEXAMPLE/\d{8}/us-east-1/s3/aws4_request".to_string()),
        )
        .match_header("x-amz-content-sha256", Matcher::Any)
        .with_status(200)
        .create_async()
        .await;

    let status = client(&server).ensure_bucket("exports").await.unwrap();

    assert_eq!(status, BucketStatus::Created);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_ensure_bucket_already_owned() {
    let mut server = Server::new_async().await;
    server
        .mock("PUT", "/exports")
        .with_status(409)
        .with_body("<Error><Code>BucketAlreadyOwnedByYou</Code><Message>yours</Message></Error>")
        .create_async()
        .await;

    let status = client(&server).ensure_bucket("exports").await.unwrap();
    assert_eq!(status, BucketStatus::AlreadyOwned);
}

#[tokio::test]
async fn test_ensure_bucket_taken_by_someone_else() {
    let mut server = Server::new_async().await;
    server
        .mock("PUT", "/exports")
        .with_status(409)
        .with_body("<Error><Code>BucketAlreadyExists</Code></Error>")
        .create_async()
        .await;

    let err = client(&server).ensure_bucket("exports").await.unwrap_err();
    assert!(matches!(err, StorageError::RequestFailed { status: 409, .. }));
}

#[tokio::test]
async fn test_ensure_bucket_access_denied() {
    let mut server = Server::new_async().await;
    server
        .mock("PUT", "/exports")
        .with_status(403)
        .with_body("<Error><Code>AccessDenied</Code><Message>Access Denied</Message></Error>")
        .create_async()
        .await;

    let err = client(&server).ensure_bucket("exports").await.unwrap_err();
    assert!(matches!(err, StorageError::AccessDenied(ref m) if m == "Access Denied"));
}

#[tokio::test]
async fn test_put_object_server_error() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("PUT", "/exports/entities1app.json")
        .match_body("{}")
        .with_status(500)
        .with_body("<Error><Code>InternalError</Code><Message>try again</Message></Error>")
        .create_async()
        .await;

    let err = client(&server)
        .put_object("exports", "entities1app.json", b"{}".to_vec())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        StorageError::RequestFailed { status: 500, ref message } if message == "try again"
    ));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_multipart_round_trip() {
    let mut server = Server::new_async().await;
    let initiate = server
        .mock("POST", "/exports/big.json")
        .match_query(Matcher::Regex("uploads".to_string()))
        .with_status(200)
        .with_body(
            "<InitiateMultipartUploadResult><Bucket>exports</Bucket><Key>big.json</Key>\
             <UploadId>upload-42</UploadId></InitiateMultipartUploadResult>",
        )
        .create_async()
        .await;
    let part = server
        .mock("PUT", "/exports/big.json")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("partNumber".to_string(), "1".to_string()),
            Matcher::UrlEncoded("uploadId".to_string(), "upload-42".to_string()),
        ]))
        .with_status(200)
        .with_header("ETag", "\"etag-1\"")
        .create_async()
        .await;
    let complete = server
        .mock("POST", "/exports/big.json")
        .match_query(Matcher::UrlEncoded("uploadId".to_string(), "upload-42".to_string()))
        .match_body(Matcher::AllOf(vec![
            Matcher::Regex("<PartNumber>1</PartNumber>".to_string()),
            Matcher::Regex("etag-1".to_string()),
        ]))
        .with_status(200)
        .with_body("<CompleteMultipartUploadResult></CompleteMultipartUploadResult>")
        .create_async()
        .await;

    let client = client(&server);
    let session = client.initiate_multipart("exports", "big.json").await.unwrap();
    assert_eq!(session.upload_id, "upload-42");

    let uploaded = client
        .upload_part(&session, 1, vec![0u8; 16], true)
        .await
        .unwrap();
    assert_eq!(
        uploaded,
        CompletedPart {
            part_number: 1,
            etag: "\"etag-1\"".to_string()
        }
    );

    client.complete_multipart(&session, &[uploaded]).await.unwrap();

    initiate.assert_async().await;
    part.assert_async().await;
    complete.assert_async().await;
}

#[tokio::test]
async fn test_complete_error_inside_ok_response() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/exports/big.json")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body("<Error><Code>InternalError</Code><Message>stitching failed</Message></Error>")
        .create_async()
        .await;

    let session = MultipartSession {
        bucket: "exports".to_string(),
        key: "big.json".to_string(),
        upload_id: "upload-42".to_string(),
    };
    let err = client(&server)
        .complete_multipart(&session, &[])
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        StorageError::RequestFailed { ref message, .. } if message == "stitching failed"
    ));
}

#[tokio::test]
async fn test_abort_sends_delete() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("DELETE", "/exports/big.json")
        .match_query(Matcher::UrlEncoded("uploadId".to_string(), "upload-42".to_string()))
        .with_status(204)
        .create_async()
        .await;

    let session = MultipartSession {
        bucket: "exports".to_string(),
        key: "big.json".to_string(),
        upload_id: "upload-42".to_string(),
    };
    client(&server).abort_multipart(&session).await.unwrap();

    mock.assert_async().await;
}
