//! Canonical and remote record models
//!
//! This module defines the normalized representation of a GitHub item, the
//! handle of its Notion counterpart, and the outcome of one sync.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

use super::property::Properties;
use crate::error::SyncError;

/// Kind of GitHub entity being mirrored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// Issue
    Issue,
    /// Pull request
    PullRequest,
    /// Discussion
    Discussion,
    /// Classic project, project card or project (v2) item
    Project,
}

impl EntityKind {
    /// Stable lowercase name used in logs and metrics
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Issue => "issue",
            EntityKind::PullRequest => "pull_request",
            EntityKind::Discussion => "discussion",
            EntityKind::Project => "project",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalized, entity-agnostic view of a GitHub item
///
/// `external_id` is never empty and is the only key used to match the item
/// against existing Notion pages.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CanonicalRecord {
    external_id: String,
    title: String,
    url: String,
    status: String,
    metadata: BTreeMap<String, Value>,
}

impl CanonicalRecord {
    /// Create a record, rejecting blank identifiers
    pub fn new(
        external_id: impl Into<String>,
        title: impl Into<String>,
        url: impl Into<String>,
        status: impl Into<String>,
    ) -> Result<Self, SyncError> {
        let external_id = external_id.into();
        if external_id.trim().is_empty() {
            return Err(SyncError::MissingIdentifier("record".to_string()));
        }
        Ok(Self {
            external_id,
            title: title.into(),
            url: url.into(),
            status: status.into(),
            metadata: BTreeMap::new(),
        })
    }

    /// Attach free-form metadata
    pub fn with_metadata(mut self, metadata: BTreeMap<String, Value>) -> Self {
        self.metadata = metadata;
        self
    }

    /// Stable identifier from GitHub
    pub fn external_id(&self) -> &str {
        &self.external_id
    }

    /// Display title
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Link back to the GitHub item
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Item state
    pub fn status(&self) -> &str {
        &self.status
    }

    /// Free-form metadata, ordered by key
    pub fn metadata(&self) -> &BTreeMap<String, Value> {
        &self.metadata
    }
}

/// A canonical record plus the kind-specific properties and back-reference target
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedItem {
    /// Entity kind the item was extracted as
    pub kind: EntityKind,
    /// Common fields
    pub record: CanonicalRecord,
    /// Kind-specific properties (labels, assignees, dates, ...)
    pub extras: Properties,
    /// Comments endpoint for the back-reference, when the kind supports one
    pub comments_url: Option<String>,
}

/// Handle of an existing Notion page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteRecord {
    /// Notion page id
    pub remote_id: String,
    /// GitHub identifier the page mirrors
    pub external_id: String,
}

/// Whether an upsert created or updated the page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpsertAction {
    /// No page matched; a new one was created
    Created,
    /// An existing page was updated in place
    Updated,
}

/// Result of one synchronizer invocation
#[derive(Debug, Clone, PartialEq)]
pub struct SyncOutcome {
    /// Entity kind handled
    pub kind: EntityKind,
    /// Whether the page was written
    pub succeeded: bool,
    /// Notion page id on success
    pub remote_id: Option<String>,
    /// Create or update, on success
    pub action: Option<UpsertAction>,
    /// Failure or skip reason
    pub error: Option<SyncError>,
}

impl SyncOutcome {
    /// Successful upsert
    pub fn success(kind: EntityKind, remote_id: impl Into<String>, action: UpsertAction) -> Self {
        Self {
            kind,
            succeeded: true,
            remote_id: Some(remote_id.into()),
            action: Some(action),
            error: None,
        }
    }

    /// Failed or skipped invocation
    pub fn failure(kind: EntityKind, error: SyncError) -> Self {
        Self {
            kind,
            succeeded: false,
            remote_id: None,
            action: None,
            error: Some(error),
        }
    }

    /// True when the item was skipped for missing data
    pub fn is_skipped(&self) -> bool {
        self.error.as_ref().is_some_and(SyncError::is_skip)
    }

    /// True when this outcome should fail the dispatch
    pub fn is_fatal(&self) -> bool {
        !self.succeeded && !self.is_skipped()
    }

    /// Label for logs and metrics
    pub fn label(&self) -> &'static str {
        match (&self.action, self.is_skipped(), self.succeeded) {
            (Some(UpsertAction::Created), _, true) => "created",
            (Some(UpsertAction::Updated), _, true) => "updated",
            (_, true, _) => "skipped",
            _ => "failed",
        }
    }
}
