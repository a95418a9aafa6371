//! Back-reference comments on GitHub items
//!
//! After a page is written, the synchronizer asks a [`BackReferenceNotifier`]
//! to make sure the GitHub item links to it. The comment is only posted when
//! no existing comment already mentions the Notion page id, so re-running the
//! same event never posts twice.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, LINK, USER_AGENT};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, info};

use crate::config::GitHubConfig;
use crate::error::SyncError;

const COMMENTS_PER_PAGE: &str = "100";

/// Upper bound on comment pages read before giving up
const MAX_COMMENT_PAGES: u32 = 100;

/// What `ensure_comment` ended up doing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentStatus {
    /// No GitHub token configured; nothing was requested
    Disabled,
    /// An existing comment already references the page
    AlreadyPresent,
    /// A new comment was published
    Posted,
}

/// Capability to link a GitHub item back to its Notion page
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BackReferenceNotifier: Send + Sync {
    /// Make sure a comment on `comments_url` references `remote_id`
    async fn ensure_comment(
        &self,
        comments_url: &str,
        remote_id: &str,
    ) -> Result<CommentStatus, SyncError>;
}

#[derive(Debug, Deserialize)]
struct IssueComment {
    #[serde(default)]
    body: Option<String>,
}

/// Body of the back-reference comment for a Notion page
pub fn comment_body(remote_id: &str) -> String {
    format!(
        "Automated sync: this GitHub item is linked to Notion page `{}`.\n\nNotion Page ID: {}",
        remote_id, remote_id
    )
}

/// GitHub REST implementation of [`BackReferenceNotifier`]
#[derive(Debug, Clone)]
pub struct GitHubNotifier {
    client: Client,
    token: Option<String>,
    user_agent: String,
}

impl GitHubNotifier {
    /// Create a notifier from configuration
    pub fn new(config: &GitHubConfig) -> Result<Self, SyncError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| SyncError::NetworkFailure {
                url: String::new(),
                cause: format!("Failed to create HTTP client: {}", e),
            })?;
        Ok(Self::with_client(
            client,
            config.token.clone(),
            config.user_agent.clone(),
        ))
    }

    /// Create a notifier with a custom reqwest Client
    pub fn with_client(client: Client, token: Option<String>, user_agent: String) -> Self {
        Self {
            client,
            token: token.filter(|t| !t.is_empty()),
            user_agent,
        }
    }

    /// Whether a token is configured
    pub fn is_enabled(&self) -> bool {
        self.token.is_some()
    }

    fn headers(&self, token: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Ok(value) = HeaderValue::from_str(&format!("token {}", token)) {
            headers.insert(AUTHORIZATION, value);
        }
        headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github+json"));
        if let Ok(value) = HeaderValue::from_str(&self.user_agent) {
            headers.insert(USER_AGENT, value);
        }
        headers
    }

    /// Fetch every comment, following `Link: rel="next"` across pages
    async fn list_comments(
        &self,
        comments_url: &str,
        token: &str,
    ) -> Result<Vec<IssueComment>, SyncError> {
        let mut comments = Vec::new();
        let mut request = self
            .client
            .get(comments_url)
            .query(&[("per_page", COMMENTS_PER_PAGE)]);

        for page in 1..=MAX_COMMENT_PAGES {
            let response = request
                .headers(self.headers(token))
                .send()
                .await
                .map_err(|e| network_failure(comments_url, e))?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(SyncError::RequestFailed {
                    status: status.as_u16(),
                    body,
                });
            }

            let next = next_link(response.headers());
            let batch = response.json::<Vec<IssueComment>>().await.map_err(|e| {
                SyncError::MalformedPayload(format!("Invalid comments response: {}", e))
            })?;
            debug!(page = page, count = batch.len(), "Fetched GitHub comments page");
            comments.extend(batch);

            match next {
                Some(url) => request = self.client.get(url),
                None => return Ok(comments),
            }
        }

        Err(SyncError::MalformedPayload(format!(
            "comment listing for {} exceeded {} pages",
            comments_url, MAX_COMMENT_PAGES
        )))
    }
}

/// Target of the `rel="next"` entry in a `Link` header, if any
fn next_link(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(LINK)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .find_map(|entry| {
            let mut parts = entry.split(';');
            let target = parts.next()?.trim();
            let is_next = parts.any(|param| {
                matches!(
                    param.trim().replace(' ', "").as_str(),
                    "rel=\"next\"" | "rel=next"
                )
            });
            if !is_next {
                return None;
            }
            target
                .strip_prefix('<')
                .and_then(|t| t.strip_suffix('>'))
                .map(str::to_string)
        })
}

#[async_trait]
impl BackReferenceNotifier for GitHubNotifier {
    async fn ensure_comment(
        &self,
        comments_url: &str,
        remote_id: &str,
    ) -> Result<CommentStatus, SyncError> {
        let Some(token) = self.token.as_deref() else {
            info!("Skipping GitHub comment because token is unavailable");
            return Ok(CommentStatus::Disabled);
        };

        let comments = self.list_comments(comments_url, token).await?;
        let already_linked = comments
            .iter()
            .filter_map(|c| c.body.as_deref())
            .any(|body| body.contains(remote_id));
        if already_linked {
            debug!(
                remote_id = remote_id,
                "GitHub comment already references Notion page"
            );
            return Ok(CommentStatus::AlreadyPresent);
        }

        let response = self
            .client
            .post(comments_url)
            .headers(self.headers(token))
            .json(&json!({ "body": comment_body(remote_id) }))
            .send()
            .await
            .map_err(|e| network_failure(comments_url, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SyncError::RequestFailed {
                status: status.as_u16(),
                body,
            });
        }

        info!(
            comments_url = comments_url,
            remote_id = remote_id,
            "Published GitHub comment linking to Notion page"
        );
        Ok(CommentStatus::Posted)
    }
}

fn network_failure(url: &str, err: reqwest::Error) -> SyncError {
    SyncError::NetworkFailure {
        url: url.to_string(),
        cause: err.to_string(),
    }
}
