//! Resilient Notion API client
//!
//! Every call goes through [`NotionClient::execute`], which attaches the
//! authentication and version headers, classifies each attempt and retries
//! transient failures through the [`RetryManager`].

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Method};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use super::request::{PageRequest, RequestBuilder};
use super::retry::RetryManager;
use crate::config::{NotionConfig, RetryConfig};
use crate::error::{AttemptError, SyncError};
use crate::models::{NormalizedItem, RemoteRecord};
use crate::otel::Metrics;

/// Statuses worth another attempt
pub const RETRYABLE_STATUSES: [u16; 5] = [429, 500, 502, 503, 504];

/// Create-or-update capability keyed by external identifier
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Find the page mirroring `external_id`; no match is `Ok(None)`
    async fn find_by_external_id(
        &self,
        collection_id: &str,
        external_id: &str,
    ) -> Result<Option<RemoteRecord>, SyncError>;

    /// Create a page for `item` in `collection_id`
    async fn create_record(
        &self,
        collection_id: &str,
        item: &NormalizedItem,
    ) -> Result<RemoteRecord, SyncError>;

    /// Overwrite the properties of page `remote_id` with `item`
    async fn update_record(
        &self,
        remote_id: &str,
        item: &NormalizedItem,
    ) -> Result<RemoteRecord, SyncError>;
}

/// Notion REST client with bounded retries
#[derive(Clone)]
pub struct NotionClient {
    client: Client,
    base_url: String,
    headers: HeaderMap,
    timeout: Duration,
    retry: RetryManager,
    builder: RequestBuilder,
    metrics: Option<Arc<Metrics>>,
}

impl NotionClient {
    /// Create a client from configuration
    pub fn new(notion: &NotionConfig, retry: &RetryConfig) -> Result<Self, SyncError> {
        let client = Client::builder()
            .timeout(retry.request_timeout())
            .build()
            .map_err(|e| SyncError::NetworkFailure {
                url: notion.base_url.clone(),
                cause: format!("Failed to create HTTP client: {}", e),
            })?;
        Ok(Self::with_client(client, notion, retry))
    }

    /// Create a client with a custom reqwest Client
    pub fn with_client(client: Client, notion: &NotionConfig, retry: &RetryConfig) -> Self {
        let mut headers = HeaderMap::new();
        if let Some(token) = notion.token.as_deref() {
            if let Ok(value) = HeaderValue::from_str(&format!("Bearer {}", token)) {
                headers.insert(AUTHORIZATION, value);
            }
        }
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Ok(value) = HeaderValue::from_str(&notion.api_version) {
            headers.insert("Notion-Version", value);
        }

        Self {
            client,
            base_url: notion.base_url.trim_end_matches('/').to_string(),
            headers,
            timeout: retry.request_timeout(),
            retry: RetryManager::new(retry),
            builder: RequestBuilder::new(notion.id_property.clone()),
            metrics: None,
        }
    }

    /// Record attempts and durations into shared metrics
    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Execute one logical request with retries
    ///
    /// Returns the parsed JSON body of the first 2xx response, or an empty
    /// object when that body is not JSON.
    pub async fn execute(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Value, SyncError> {
        self.execute_with_status(method, path, body)
            .await
            .map(|(_, value)| value)
    }

    /// Like [`NotionClient::execute`], also returning the 2xx status
    async fn execute_with_status(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<(u16, Value), SyncError> {
        let url = self.url(path);
        let started = Instant::now();

        let result = self
            .retry
            .execute(|attempt| self.attempt(&method, &url, body, attempt))
            .await;

        if let Some(metrics) = &self.metrics {
            metrics.record_request_duration(method.as_str(), started.elapsed().as_secs_f64());
        }

        result.map_err(|e| {
            let err = e.into_terminal(self.retry.max_attempts(), &url);
            error!(
                method = %method,
                url = %url,
                error_kind = err.kind(),
                error = %err,
                "Notion request failed"
            );
            err
        })
    }

    async fn attempt(
        &self,
        method: &Method,
        url: &str,
        body: Option<&Value>,
        attempt: u32,
    ) -> Result<(u16, Value), AttemptError> {
        let mut request = self
            .client
            .request(method.clone(), url)
            .headers(self.headers.clone())
            .timeout(self.timeout);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                warn!(
                    attempt = attempt,
                    method = %method,
                    url = url,
                    error = %e,
                    "Notion request attempt failed at transport level"
                );
                self.record_attempt(method, None, attempt, true);
                return Err(AttemptError::Transport(e.to_string()));
            }
        };

        let status = response.status().as_u16();
        if response.status().is_success() {
            info!(
                attempt = attempt,
                method = %method,
                status = status,
                url = url,
                "Notion request attempt succeeded"
            );
            self.record_attempt(method, Some(status), attempt, false);
            let text = response.text().await.unwrap_or_default();
            let value = serde_json::from_str(&text).unwrap_or_else(|_| json!({}));
            return Ok((status, value));
        }

        if RETRYABLE_STATUSES.contains(&status) {
            warn!(
                attempt = attempt,
                method = %method,
                status = status,
                url = url,
                "Notion request attempt returned retryable status"
            );
            self.record_attempt(method, Some(status), attempt, true);
            return Err(AttemptError::Transient(status));
        }

        let body = response.text().await.unwrap_or_default();
        warn!(
            attempt = attempt,
            method = %method,
            status = status,
            url = url,
            body = %body,
            "Notion request attempt failed"
        );
        self.record_attempt(method, Some(status), attempt, false);
        Err(AttemptError::Fatal { status, body })
    }

    fn record_attempt(&self, method: &Method, status: Option<u16>, attempt: u32, retryable: bool) {
        if let Some(metrics) = &self.metrics {
            metrics.record_attempt(method.as_str(), status);
            if retryable && attempt < self.retry.max_attempts() {
                metrics.record_retry(method.as_str());
            }
        }
    }

    /// Create a page from a built request
    pub async fn create_page(&self, request: &PageRequest) -> Result<RemoteRecord, SyncError> {
        let (status, response) = self
            .execute_with_status(Method::POST, "pages", Some(&request.create_body()))
            .await?;
        // The write may have happened, but without an id it cannot be linked
        let remote_id = page_id(&response).ok_or_else(|| {
            missing_page_id(status, "create response did not include a page id", &response)
        })?;
        Ok(RemoteRecord {
            remote_id,
            external_id: request.external_id.clone(),
        })
    }

    /// Update page `remote_id` from a built request
    pub async fn update_page(
        &self,
        remote_id: &str,
        request: &PageRequest,
    ) -> Result<RemoteRecord, SyncError> {
        self.execute(
            Method::PATCH,
            &format!("pages/{}", remote_id),
            Some(&request.update_body()),
        )
        .await?;
        Ok(RemoteRecord {
            remote_id: remote_id.to_string(),
            external_id: request.external_id.clone(),
        })
    }
}

impl std::fmt::Debug for NotionClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotionClient")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .field("retry", &self.retry)
            .field("builder", &self.builder)
            .finish_non_exhaustive()
    }
}

fn page_id(page: &Value) -> Option<String> {
    page.get("id")
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
}

fn missing_page_id(status: u16, reason: &str, response: &Value) -> SyncError {
    error!(status = status, response = %response, "{}", reason);
    SyncError::RequestFailed {
        status,
        body: format!("{}: {}", reason, response),
    }
}

#[async_trait]
impl RemoteStore for NotionClient {
    async fn find_by_external_id(
        &self,
        collection_id: &str,
        external_id: &str,
    ) -> Result<Option<RemoteRecord>, SyncError> {
        let filter = self.builder.lookup_filter(external_id);
        let (status, response) = self
            .execute_with_status(
                Method::POST,
                &format!("databases/{}/query", collection_id),
                Some(&filter),
            )
            .await?;

        let first = response
            .get("results")
            .and_then(Value::as_array)
            .and_then(|results| results.first());
        let found = match first {
            None => None,
            Some(page) => {
                let remote_id = page_id(page).ok_or_else(|| {
                    missing_page_id(status, "query result did not include a page id", &response)
                })?;
                Some(RemoteRecord {
                    remote_id,
                    external_id: external_id.to_string(),
                })
            }
        };

        debug!(
            collection_id = collection_id,
            external_id = external_id,
            found = found.is_some(),
            "Looked up Notion page"
        );
        Ok(found)
    }

    async fn create_record(
        &self,
        collection_id: &str,
        item: &NormalizedItem,
    ) -> Result<RemoteRecord, SyncError> {
        let request = self.builder.build_item(item, collection_id);
        self.create_page(&request).await
    }

    async fn update_record(
        &self,
        remote_id: &str,
        item: &NormalizedItem,
    ) -> Result<RemoteRecord, SyncError> {
        // Updates never move a page, so the parent is irrelevant here
        let request = self.builder.build_item(item, "");
        self.update_page(remote_id, &request).await
    }
}
