//! Export pipeline
//!
//! - [`service`] - scheduling, running and status queries
//! - [`coordinator`] - per-application fan-out
//! - [`walker`] - collection and connection walking with file rotation
//! - [`uploader`] - single-shot and multipart transfer to object storage
//! - [`heartbeat`] - liveness rate limiting
//! - [`manifest`], [`scratch`] - scratch files of one walk
//! - [`summary`] - run reporting

pub mod coordinator;
pub mod heartbeat;
pub mod manifest;
pub mod scratch;
pub mod service;
pub mod summary;
pub mod uploader;
pub mod walker;

pub use coordinator::ExportCoordinator;
pub use heartbeat::HeartbeatGovernor;
pub use manifest::FileManifest;
pub use service::ExportService;
pub use summary::{ApplicationFailure, RunSummary};
pub use uploader::{ChunkedUploader, S3Uploader, Uploader};
pub use walker::CollectionWalker;
