//! File manifest
//!
//! The set of scratch files one application walk produced. The files live in
//! a private temporary directory owned by the manifest; [`FileManifest::close`]
//! removes it once the files have been uploaded, whatever the outcome.

use crate::domain::ids::JobId;
use crate::domain::Result;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Ordered entity and connection files of one application walk
#[derive(Debug)]
pub struct FileManifest {
    job_id: JobId,
    scratch: TempDir,
    entity_files: Vec<PathBuf>,
    connection_files: Vec<PathBuf>,
    entity_count: u64,
    skipped: Vec<String>,
}

impl FileManifest {
    /// Creates an empty manifest with a fresh scratch directory
    ///
    /// The directory is created under `parent`, or the system temp directory.
    pub fn create(job_id: JobId, parent: Option<&Path>) -> Result<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("entity-export-");
        let scratch = match parent {
            Some(parent) => builder.tempdir_in(parent)?,
            None => builder.tempdir()?,
        };

        Ok(Self {
            job_id,
            scratch,
            entity_files: Vec::new(),
            connection_files: Vec::new(),
            entity_count: 0,
            skipped: Vec::new(),
        })
    }

    /// Registers the next entity/connection file pair and returns their paths
    pub fn next_part(&mut self) -> (PathBuf, PathBuf) {
        let part = self.entity_files.len() + 1;
        let entity = self
            .scratch
            .path()
            .join(format!("{}-tempEntityExportPart{part}.json", self.job_id));
        let connection = self
            .scratch
            .path()
            .join(format!("{}-tempConnectionExportPart{part}.json", self.job_id));

        self.entity_files.push(entity.clone());
        self.connection_files.push(connection.clone());
        (entity, connection)
    }

    /// Entity files in part order
    pub fn entity_files(&self) -> &[PathBuf] {
        &self.entity_files
    }

    /// Connection files in part order
    pub fn connection_files(&self) -> &[PathBuf] {
        &self.connection_files
    }

    /// Total number of files
    pub fn file_count(&self) -> usize {
        self.entity_files.len() + self.connection_files.len()
    }

    /// Entities written across all parts
    pub fn entity_count(&self) -> u64 {
        self.entity_count
    }

    pub(crate) fn record_entity(&mut self) -> u64 {
        self.entity_count += 1;
        self.entity_count
    }

    /// Collections skipped because the store rejected their query
    pub fn skipped(&self) -> &[String] {
        &self.skipped
    }

    pub(crate) fn record_skipped(&mut self, message: String) {
        self.skipped.push(message);
    }

    /// Scratch directory holding the files
    pub fn scratch_dir(&self) -> &Path {
        self.scratch.path()
    }

    /// Deletes the scratch directory and every file in it
    pub fn close(self) -> Result<()> {
        self.scratch.close()?;
        Ok(())
    }
}
