//! Event dispatch
//!
//! Maps a GitHub event name to the synchronizers that handle it through a
//! static routing table, runs them and folds their outcomes into a single
//! success flag. When no event name is supplied it is inferred from the
//! top-level keys of the payload.

use futures_util::future::join_all;
use serde_json::Value;
use std::sync::Arc;
use tracing::{error, info, warn};

use super::synchronizer::Synchronizer;
use crate::config::CollectionConfig;
use crate::error::SyncError;
use crate::github::BackReferenceNotifier;
use crate::models::SyncOutcome;
use crate::notion::RemoteStore;
use crate::otel::Metrics;

/// Event name to synchronizers, in execution order
pub static ROUTES: &[(&str, &[Synchronizer])] = &[
    ("issues", &[Synchronizer::Issue]),
    ("issue_comment", &[Synchronizer::Issue]),
    ("pull_request", &[Synchronizer::PullRequest]),
    ("pull_request_target", &[Synchronizer::PullRequest]),
    ("pull_request_review", &[Synchronizer::PullRequest]),
    ("pull_request_review_comment", &[Synchronizer::PullRequest]),
    ("project", &[Synchronizer::Project]),
    ("project_card", &[Synchronizer::Project]),
    ("project_column", &[Synchronizer::Project]),
    ("project_item", &[Synchronizer::Project]),
    ("discussion", &[Synchronizer::Discussion]),
    ("discussion_comment", &[Synchronizer::Discussion]),
];

/// Payload key probed for inference, and the event name it implies.
/// The first key present wins.
pub static INFERENCE_ORDER: &[(&str, &str)] = &[
    ("pull_request", "pull_request"),
    ("issue", "issues"),
    ("discussion", "discussion"),
    ("project_item", "project_item"),
    ("project_card", "project_card"),
    ("project", "project"),
];

/// Synchronizers registered for `event_kind`; empty for unknown kinds
pub fn resolve(event_kind: &str) -> &'static [Synchronizer] {
    ROUTES
        .iter()
        .find(|(kind, _)| *kind == event_kind)
        .map(|(_, handlers)| *handlers)
        .unwrap_or(&[])
}

/// Infer the event name from the payload's top-level keys
pub fn infer_event_kind(payload: &Value) -> Option<&'static str> {
    let obj = payload.as_object()?;
    INFERENCE_ORDER
        .iter()
        .find(|(key, _)| obj.contains_key(*key))
        .map(|(_, kind)| *kind)
}

/// Routes events to synchronizers
pub struct Dispatcher {
    store: Arc<dyn RemoteStore>,
    notifier: Arc<dyn BackReferenceNotifier>,
    collections: CollectionConfig,
    metrics: Option<Arc<Metrics>>,
}

impl Dispatcher {
    /// Create a dispatcher over a store, a notifier and the database ids
    pub fn new(
        store: Arc<dyn RemoteStore>,
        notifier: Arc<dyn BackReferenceNotifier>,
        collections: CollectionConfig,
    ) -> Self {
        Self {
            store,
            notifier,
            collections,
            metrics: None,
        }
    }

    /// Record sync outcomes into shared metrics
    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Dispatch one event and report overall success
    ///
    /// Fails before any request is made when the payload is not an object
    /// or its kind cannot be inferred. Unknown event names succeed without
    /// doing anything. Otherwise the result is true only when no handler
    /// ended in a fatal failure; skipped items do not count as failures.
    pub async fn dispatch(
        &self,
        event_kind: Option<&str>,
        payload: &Value,
    ) -> Result<bool, SyncError> {
        let outcomes = self.dispatch_outcomes(event_kind, payload).await?;
        Ok(outcomes.iter().all(|outcome| !outcome.is_fatal()))
    }

    /// Dispatch one event and return every handler outcome
    pub async fn dispatch_outcomes(
        &self,
        event_kind: Option<&str>,
        payload: &Value,
    ) -> Result<Vec<SyncOutcome>, SyncError> {
        if !payload.is_object() {
            return Err(SyncError::MalformedPayload(
                "event payload must be a JSON object".to_string(),
            ));
        }

        let event_kind = match event_kind.filter(|kind| !kind.is_empty()) {
            Some(kind) => kind,
            None => infer_event_kind(payload).ok_or_else(|| {
                error!("Unable to infer GitHub event type from payload");
                SyncError::MalformedPayload(
                    "unable to infer event type: no known root key in payload".to_string(),
                )
            })?,
        };

        let handlers = resolve(event_kind);
        if handlers.is_empty() {
            info!(event_kind = event_kind, "No handler registered for event");
            return Ok(Vec::new());
        }

        let runs = handlers
            .iter()
            .map(|handler| self.run_handler(*handler, payload));
        let outcomes = join_all(runs).await;

        for outcome in &outcomes {
            if let Some(metrics) = &self.metrics {
                metrics.record_outcome(outcome.kind.as_str(), outcome.label());
            }
        }

        let failed = outcomes.iter().filter(|o| o.is_fatal()).count();
        info!(
            event_kind = event_kind,
            handlers = outcomes.len(),
            failed = failed,
            "Dispatch finished"
        );
        Ok(outcomes)
    }

    async fn run_handler(&self, handler: Synchronizer, payload: &Value) -> SyncOutcome {
        let Some(collection_id) = handler.collection(&self.collections) else {
            let err = SyncError::ConfigurationIncomplete(vec![handler.collection_env().to_string()]);
            warn!(handler = handler.name(), error = %err, "Handler has no target database");
            return SyncOutcome::failure(handler.kind(), err);
        };

        handler
            .sync(
                payload,
                collection_id,
                self.store.as_ref(),
                self.notifier.as_ref(),
            )
            .await
    }
}
