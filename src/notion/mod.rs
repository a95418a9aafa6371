//! Notion side of the bridge
//!
//! - [`request`]: pure construction of page bodies and lookup filters
//! - [`retry`]: attempt-counted exponential backoff
//! - [`client`]: the resilient HTTP client and the [`RemoteStore`] seam

pub mod client;
pub mod request;
pub mod retry;

pub use client::{NotionClient, RemoteStore, RETRYABLE_STATUSES};
pub use request::{build_page_request, PageRequest, RequestBuilder, DEFAULT_ID_PROPERTY};
pub use retry::{JitterStrategy, NoJitter, RandomJitter, RetryManager};

#[cfg(test)]
pub use client::MockRemoteStore;
