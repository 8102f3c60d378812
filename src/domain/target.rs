//! Export target
//!
//! The destination bag handed to a job: which organization to export, where
//! to put the files, and the optional legacy single-collection hint.

use crate::config::SecretString;
use crate::domain::errors::ExportError;
use crate::domain::ids::OrganizationId;
use crate::domain::Result;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};

/// Object storage destination and credentials
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageInfo {
    /// Bucket receiving the exported files
    pub bucket_location: String,

    /// Access key id
    pub s3_access_id: SecretString,

    /// Secret access key
    pub s3_key: SecretString,
}

/// Destination and scope of one export job
///
/// Passed through to the uploader unmodified.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportTarget {
    /// Organization owning the applications; a run without it fails
    #[serde(default)]
    pub organization_id: Option<OrganizationId>,

    /// Legacy single-collection hint
    #[serde(default)]
    pub collection_name: Option<String>,

    /// Where the files go
    pub storage: StorageInfo,
}

impl ExportTarget {
    /// Checks the fields a job cannot be scheduled without
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if the bucket or the credentials are empty
    pub fn validate(&self) -> Result<()> {
        if self.storage.bucket_location.trim().is_empty() {
            return Err(ExportError::InvalidConfig(
                "storage.bucket_location cannot be empty".to_string(),
            ));
        }
        if self.storage.s3_access_id.expose_secret().is_empty()
            || self.storage.s3_key.expose_secret().is_empty()
        {
            return Err(ExportError::InvalidConfig(
                "storage credentials cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}
