//! Export filter model
//!
//! Describes what to export. Every set is a wildcard when empty.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Query predicate applied to every collection search
///
/// The predicate text is passed through to the entity store untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Query(String);

impl Query {
    /// Creates a predicate from query-language text
    pub fn new(ql: impl Into<String>) -> Self {
        Self(ql.into())
    }

    /// The raw predicate text
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What an export job should include
///
/// # Examples
///
/// ```
/// use entity_export::domain::filter::ExportFilter;
///
/// let filter = ExportFilter::new()
///     .with_application("acme/shop")
///     .with_connection_type("likes");
///
/// assert!(filter.includes_connection_type("likes"));
/// assert!(!filter.includes_connection_type("owns"));
/// assert!(filter.collections.is_empty());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportFilter {
    /// Application names to export (empty = every application of the organization)
    #[serde(default)]
    pub applications: BTreeSet<String>,

    /// Collection names to export (empty = every collection)
    #[serde(default)]
    pub collections: BTreeSet<String>,

    /// Connection types to record (empty = every connection type)
    #[serde(default)]
    pub connection_types: BTreeSet<String>,

    /// Optional predicate (absent = match all)
    #[serde(default)]
    pub query: Option<Query>,
}

impl ExportFilter {
    /// Creates a wildcard filter
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an application name
    pub fn with_application(mut self, name: impl Into<String>) -> Self {
        self.applications.insert(name.into());
        self
    }

    /// Adds a collection name
    pub fn with_collection(mut self, name: impl Into<String>) -> Self {
        self.collections.insert(name.into());
        self
    }

    /// Adds a connection type
    pub fn with_connection_type(mut self, name: impl Into<String>) -> Self {
        self.connection_types.insert(name.into());
        self
    }

    /// Sets the query predicate
    pub fn with_query(mut self, query: Query) -> Self {
        self.query = Some(query);
        self
    }

    /// Whether a connection type should be written
    pub fn includes_connection_type(&self, connection_type: &str) -> bool {
        self.connection_types.is_empty() || self.connection_types.contains(connection_type)
    }
}
