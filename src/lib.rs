// Entity Export - multi-tenant entity store export pipeline
// Copyright (c) 2025 Entity Export Contributors
// Licensed under the MIT License

//! # Entity Export
//!
//! Exports the entities of a multi-tenant entity store to object storage.
//!
//! ## Overview
//!
//! For each application an organization owns, the pipeline:
//! - **Walks** the matching collections page by page
//! - **Writes** entities, their dictionaries, collection members and outbound
//!   connections as UTF-16LE JSON lines, rotating files every 1000 entities
//! - **Uploads** the files with a single PUT or a multipart upload
//! - **Tracks** the job as CREATED, SCHEDULED, STARTED, then FINISHED or FAILED
//!
//! ## Architecture
//!
//! - [`core`] - Business logic (export pipeline, job state)
//! - [`adapters`] - Entity store, scheduler and object storage seams
//! - [`domain`] - Identifiers, entities, filters, targets and errors
//! - [`config`] - Configuration management
//! - [`logging`] - Structured logging
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use entity_export::adapters::scheduler::JobScheduler;
//! use entity_export::adapters::store::{InMemoryDirectory, InMemoryEntityStore, InMemoryJobStore};
//! use entity_export::config::load_config;
//! use entity_export::core::export::ExportService;
//! use entity_export::domain::ExportTarget;
//! use std::sync::Arc;
//!
//! # async fn example(
//! #     scheduler: Arc<dyn JobScheduler>,
//! #     target: ExportTarget,
//! # ) -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("entity-export.toml")?;
//! let service = ExportService::new(
//!     config,
//!     Arc::new(InMemoryJobStore::new()),
//!     scheduler,
//!     Arc::new(InMemoryDirectory::new()),
//!     Arc::new(InMemoryEntityStore::new()),
//! );
//!
//! if let Some(job_id) = service.schedule(Some(target)).await? {
//!     println!("Scheduled {job_id}: {:?}", service.get_state(job_id).await?);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! Every fallible call returns [`domain::Result`], whose error type is
//! [`domain::ExportError`].

pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod logging;
