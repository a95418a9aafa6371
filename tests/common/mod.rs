//! Common test utilities and helpers for integration tests

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use wiremock::MockServer;

use notion_sync::config::{CollectionConfig, GitHubConfig, NotionConfig, RetryConfig};
use notion_sync::error::SyncError;
use notion_sync::github::{BackReferenceNotifier, CommentStatus, GitHubNotifier};
use notion_sync::models::{NormalizedItem, RemoteRecord};
use notion_sync::notion::{NotionClient, RemoteStore};

/// Database ids used by every test
pub fn test_collections() -> CollectionConfig {
    CollectionConfig {
        issues: Some("db-issues".to_string()),
        pull_requests: Some("db-prs".to_string()),
        projects: Some("db-projects".to_string()),
        discussions: Some("db-discussions".to_string()),
    }
}

/// Retry settings with no sleeping between attempts
pub fn fast_retry(max_attempts: u32) -> RetryConfig {
    RetryConfig {
        max_attempts,
        backoff_factor_secs: 0.0,
        timeout_secs: 5,
        jitter: false,
    }
}

/// Notion client pointed at the mock server's `/v1/` prefix
pub fn create_test_notion_client(server: &MockServer, max_attempts: u32) -> NotionClient {
    let notion = NotionConfig {
        token: Some("secret_test".to_string()),
        base_url: format!("{}/v1/", server.uri()),
        ..NotionConfig::default()
    };
    NotionClient::with_client(Client::new(), &notion, &fast_retry(max_attempts))
}

/// GitHub notifier with a test token
pub fn create_test_notifier(token: Option<&str>) -> GitHubNotifier {
    let config = GitHubConfig {
        token: token.map(str::to_string),
        ..GitHubConfig::default()
    };
    GitHubNotifier::with_client(Client::new(), config.token, config.user_agent)
}

/// The issue event used in end-to-end scenarios, with comments on `base`
pub fn issue_event(base: &str) -> Value {
    serde_json::json!({
        "action": "opened",
        "issue": {
            "node_id": "I_1",
            "title": "Demo",
            "html_url": "https://x/1",
            "state": "open",
            "assignees": [],
            "labels": [{"name": "bug"}],
            "comments_url": format!("{}/repos/o/r/issues/1/comments", base)
        }
    })
}

/// Remote store that keeps pages in memory across calls
#[derive(Default)]
pub struct InMemoryStore {
    pages: Mutex<HashMap<(String, String), String>>,
    next_id: Mutex<u32>,
    pub creates: Mutex<u32>,
    pub updates: Mutex<u32>,
}

impl InMemoryStore {
    /// Number of pages stored in `collection_id`
    pub fn page_count(&self, collection_id: &str) -> usize {
        self.pages
            .lock()
            .unwrap()
            .keys()
            .filter(|(collection, _)| collection == collection_id)
            .count()
    }

    pub fn create_count(&self) -> u32 {
        *self.creates.lock().unwrap()
    }

    pub fn update_count(&self) -> u32 {
        *self.updates.lock().unwrap()
    }
}

#[async_trait]
impl RemoteStore for InMemoryStore {
    async fn find_by_external_id(
        &self,
        collection_id: &str,
        external_id: &str,
    ) -> Result<Option<RemoteRecord>, SyncError> {
        let pages = self.pages.lock().unwrap();
        Ok(pages
            .get(&(collection_id.to_string(), external_id.to_string()))
            .map(|remote_id| RemoteRecord {
                remote_id: remote_id.clone(),
                external_id: external_id.to_string(),
            }))
    }

    async fn create_record(
        &self,
        collection_id: &str,
        item: &NormalizedItem,
    ) -> Result<RemoteRecord, SyncError> {
        let remote_id = {
            let mut next = self.next_id.lock().unwrap();
            *next += 1;
            format!("page-{}", *next)
        };
        let external_id = item.record.external_id().to_string();
        self.pages.lock().unwrap().insert(
            (collection_id.to_string(), external_id.clone()),
            remote_id.clone(),
        );
        *self.creates.lock().unwrap() += 1;
        Ok(RemoteRecord {
            remote_id,
            external_id,
        })
    }

    async fn update_record(
        &self,
        remote_id: &str,
        item: &NormalizedItem,
    ) -> Result<RemoteRecord, SyncError> {
        *self.updates.lock().unwrap() += 1;
        Ok(RemoteRecord {
            remote_id: remote_id.to_string(),
            external_id: item.record.external_id().to_string(),
        })
    }
}

/// Notifier that remembers which pages it has linked
#[derive(Default)]
pub struct RecordingNotifier {
    pub linked: Mutex<Vec<(String, String)>>,
    pub posts: Mutex<u32>,
}

#[async_trait]
impl BackReferenceNotifier for RecordingNotifier {
    async fn ensure_comment(
        &self,
        comments_url: &str,
        remote_id: &str,
    ) -> Result<CommentStatus, SyncError> {
        let mut linked = self.linked.lock().unwrap();
        let entry = (comments_url.to_string(), remote_id.to_string());
        if linked.contains(&entry) {
            return Ok(CommentStatus::AlreadyPresent);
        }
        linked.push(entry);
        *self.posts.lock().unwrap() += 1;
        Ok(CommentStatus::Posted)
    }
}
