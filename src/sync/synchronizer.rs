//! Per-entity synchronizers
//!
//! Each variant runs the same upsert protocol for its entity kind:
//! normalize the payload, look the item up by external id, update the
//! matching page or create a new one, then make sure the GitHub item links
//! back to the page. The lookup decides between update and create, so
//! replaying an event converges on a single page.

use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::config::CollectionConfig;
use crate::error::SyncError;
use crate::github::{normalize, BackReferenceNotifier, CommentStatus};
use crate::models::{EntityKind, NormalizedItem, RemoteRecord, SyncOutcome, UpsertAction};
use crate::notion::RemoteStore;

/// Synchronizer variant, one per entity kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Synchronizer {
    /// Issues and issue comments
    Issue,
    /// Pull requests and reviews
    PullRequest,
    /// Discussions
    Discussion,
    /// Classic projects, cards and project items
    Project,
}

impl Synchronizer {
    /// Handler name used in logs
    pub fn name(&self) -> &'static str {
        match self {
            Synchronizer::Issue => "IssueSync",
            Synchronizer::PullRequest => "PullRequestSync",
            Synchronizer::Discussion => "DiscussionSync",
            Synchronizer::Project => "ProjectSync",
        }
    }

    /// Entity kind this synchronizer extracts
    pub fn kind(&self) -> EntityKind {
        match self {
            Synchronizer::Issue => EntityKind::Issue,
            Synchronizer::PullRequest => EntityKind::PullRequest,
            Synchronizer::Discussion => EntityKind::Discussion,
            Synchronizer::Project => EntityKind::Project,
        }
    }

    /// Environment variable naming this synchronizer's database
    pub fn collection_env(&self) -> &'static str {
        match self {
            Synchronizer::Issue => "NOTION_ISSUES_DB_ID",
            Synchronizer::PullRequest => "NOTION_PRS_DB_ID",
            Synchronizer::Discussion => "NOTION_DISCUSSIONS_DB_ID",
            Synchronizer::Project => "NOTION_PROJECTS_DB_ID",
        }
    }

    /// Target database id, if configured
    pub fn collection<'a>(&self, collections: &'a CollectionConfig) -> Option<&'a str> {
        let id = match self {
            Synchronizer::Issue => &collections.issues,
            Synchronizer::PullRequest => &collections.pull_requests,
            Synchronizer::Discussion => &collections.discussions,
            Synchronizer::Project => &collections.projects,
        };
        id.as_deref().filter(|id| !id.trim().is_empty())
    }

    /// Run one sync of `payload` into `collection_id`
    ///
    /// Never returns an error: every failure is folded into the outcome.
    /// The back-reference comment is best effort and cannot turn a
    /// successful upsert into a failure.
    pub async fn sync(
        &self,
        payload: &Value,
        collection_id: &str,
        store: &dyn RemoteStore,
        notifier: &dyn BackReferenceNotifier,
    ) -> SyncOutcome {
        let kind = self.kind();

        let item = match normalize(kind, payload) {
            Ok(item) => item,
            Err(e) => {
                warn!(handler = self.name(), entity = %kind, error = %e, "Skipping event");
                return SyncOutcome::failure(kind, e);
            }
        };
        let external_id = item.record.external_id().to_string();

        let (remote, action) = match upsert(&item, collection_id, store).await {
            Ok(result) => result,
            Err(e) => {
                error!(
                    handler = self.name(),
                    entity = %kind,
                    external_id = %external_id,
                    error_kind = e.kind(),
                    error = %e,
                    "Failed to sync item to Notion"
                );
                return SyncOutcome::failure(kind, e);
            }
        };

        info!(
            handler = self.name(),
            entity = %kind,
            external_id = %external_id,
            remote_id = %remote.remote_id,
            action = ?action,
            "Synced item to Notion"
        );

        if let Some(comments_url) = item.comments_url.as_deref() {
            ensure_back_reference(notifier, comments_url, &remote.remote_id).await;
        }

        SyncOutcome::success(kind, remote.remote_id, action)
    }
}

async fn upsert(
    item: &NormalizedItem,
    collection_id: &str,
    store: &dyn RemoteStore,
) -> Result<(RemoteRecord, UpsertAction), SyncError> {
    match store
        .find_by_external_id(collection_id, item.record.external_id())
        .await?
    {
        Some(existing) => {
            let remote = store.update_record(&existing.remote_id, item).await?;
            Ok((remote, UpsertAction::Updated))
        }
        None => {
            let remote = store.create_record(collection_id, item).await?;
            Ok((remote, UpsertAction::Created))
        }
    }
}

async fn ensure_back_reference(
    notifier: &dyn BackReferenceNotifier,
    comments_url: &str,
    remote_id: &str,
) {
    match notifier.ensure_comment(comments_url, remote_id).await {
        Ok(CommentStatus::Posted) => {
            debug!(remote_id = remote_id, "Back-reference comment posted")
        }
        Ok(CommentStatus::AlreadyPresent) | Ok(CommentStatus::Disabled) => {}
        Err(e) => warn!(
            comments_url = comments_url,
            remote_id = remote_id,
            error = %e,
            "Failed to ensure GitHub back-reference comment"
        ),
    }
}
