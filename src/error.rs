//! Error types for notion-sync
//!
//! This module defines the error taxonomy shared by the payload normalizer,
//! the Notion client, the synchronizers and the dispatcher.
//! All error types use `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Synchronization errors surfaced by the core
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SyncError {
    /// The payload carries neither a node id nor a numeric id
    #[error("Missing identifier in {0} payload")]
    MissingIdentifier(String),

    /// Root key absent or payload of the wrong shape
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    /// Required credential or collection id absent
    #[error("Sync configuration is incomplete: missing {}", .0.join(", "))]
    ConfigurationIncomplete(Vec<String>),

    /// Every attempt ended with a retryable status
    #[error("Exceeded maximum retries ({attempts}) for {url}, last status {last_status}")]
    RetryExhausted {
        /// Number of attempts performed
        attempts: u32,
        /// Status of the final attempt
        last_status: u16,
        /// Target URL
        url: String,
    },

    /// Transport-level failure on the final attempt
    #[error("Request to {url} failed due to network error: {cause}")]
    NetworkFailure {
        /// Target URL
        url: String,
        /// Underlying transport error
        cause: String,
    },

    /// Non-retryable HTTP failure
    #[error("Request failed with status {status}: {body}")]
    RequestFailed {
        /// HTTP status code
        status: u16,
        /// Response body, kept for diagnostics
        body: String,
    },
}

impl SyncError {
    /// Returns true when the error means "nothing to sync" rather than a
    /// failed write. The dispatcher does not fail the batch for these.
    pub fn is_skip(&self) -> bool {
        matches!(
            self,
            SyncError::MissingIdentifier(_) | SyncError::MalformedPayload(_)
        )
    }

    /// Short machine-readable name of the error kind, used in logs and metrics
    pub fn kind(&self) -> &'static str {
        match self {
            SyncError::MissingIdentifier(_) => "missing_identifier",
            SyncError::MalformedPayload(_) => "malformed_payload",
            SyncError::ConfigurationIncomplete(_) => "configuration_incomplete",
            SyncError::RetryExhausted { .. } => "retry_exhausted",
            SyncError::NetworkFailure { .. } => "network_failure",
            SyncError::RequestFailed { .. } => "request_failed",
        }
    }
}

/// Outcome of a single HTTP attempt that did not succeed
#[derive(Debug, Error, Clone, PartialEq)]
pub enum AttemptError {
    /// Rate limiting or server-side unavailability
    #[error("Transient status {0}")]
    Transient(u16),

    /// Connection reset, refused, timed out
    #[error("Transport error: {0}")]
    Transport(String),

    /// Any other non-2xx response
    #[error("Fatal status {status}: {body}")]
    Fatal {
        /// HTTP status code
        status: u16,
        /// Response body
        body: String,
    },
}

impl AttemptError {
    /// Convert the last attempt error into the terminal error reported to callers
    pub fn into_terminal(self, attempts: u32, url: &str) -> SyncError {
        match self {
            AttemptError::Transient(status) => SyncError::RetryExhausted {
                attempts,
                last_status: status,
                url: url.to_string(),
            },
            AttemptError::Transport(cause) => SyncError::NetworkFailure {
                url: url.to_string(),
                cause,
            },
            AttemptError::Fatal { status, body } => SyncError::RequestFailed { status, body },
        }
    }
}

/// OpenTelemetry-related errors
#[derive(Debug, Error, Clone, PartialEq)]
pub enum OtelError {
    /// Failed to initialize tracer
    #[error("Failed to initialize tracer: {0}")]
    TracerInit(String),

    /// Failed to initialize meter
    #[error("Failed to initialize meter: {0}")]
    MeterInit(String),

    /// Failed to shutdown
    #[error("Failed to shutdown: {0}")]
    Shutdown(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Application-level error type
///
/// Aggregates the domain-specific error types for the binary.
#[derive(Debug, Error)]
pub enum AppError {
    /// Sync error
    #[error("Sync error: {0}")]
    Sync(#[from] SyncError),

    /// Configuration loading error
    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    /// Telemetry error
    #[error("Telemetry error: {0}")]
    Otel(#[from] OtelError),

    /// Event file could not be read
    #[error("Failed to read event payload: {0}")]
    EventRead(#[from] std::io::Error),
}

/// Trait for determining if an error is retryable
pub trait RetryableError {
    /// Returns true if the error is retryable
    fn is_retryable(&self) -> bool;
}

impl RetryableError for AttemptError {
    fn is_retryable(&self) -> bool {
        match self {
            AttemptError::Transient(_) => true,
            AttemptError::Transport(_) => true,
            AttemptError::Fatal { .. } => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Test 1: Error message formatting
    #[test]
    fn test_sync_error_messages() {
        assert_eq!(
            SyncError::MissingIdentifier("issue".to_string()).to_string(),
            "Missing identifier in issue payload"
        );
        assert_eq!(
            SyncError::MalformedPayload("missing 'issue' key".to_string()).to_string(),
            "Malformed payload: missing 'issue' key"
        );
        assert_eq!(
            SyncError::ConfigurationIncomplete(vec![
                "NOTION_ISSUES_DB_ID".to_string(),
                "NOTION_TOKEN".to_string()
            ])
            .to_string(),
            "Sync configuration is incomplete: missing NOTION_ISSUES_DB_ID, NOTION_TOKEN"
        );
        assert_eq!(
            SyncError::RequestFailed {
                status: 400,
                body: "validation_error".to_string()
            }
            .to_string(),
            "Request failed with status 400: validation_error"
        );
    }

    // Test 2: Attempt errors convert into the matching terminal error
    #[test]
    fn test_attempt_error_into_terminal() {
        let url = "https://api.notion.com/v1/pages";

        assert_eq!(
            AttemptError::Transient(503).into_terminal(3, url),
            SyncError::RetryExhausted {
                attempts: 3,
                last_status: 503,
                url: url.to_string()
            }
        );
        assert_eq!(
            AttemptError::Transport("connection reset".to_string()).into_terminal(3, url),
            SyncError::NetworkFailure {
                url: url.to_string(),
                cause: "connection reset".to_string()
            }
        );
        assert_eq!(
            AttemptError::Fatal {
                status: 404,
                body: "not found".to_string()
            }
            .into_terminal(1, url),
            SyncError::RequestFailed {
                status: 404,
                body: "not found".to_string()
            }
        );
    }

    // Test 3: RetryableError trait for AttemptError
    #[test]
    fn test_attempt_error_retryable() {
        assert!(AttemptError::Transient(429).is_retryable());
        assert!(AttemptError::Transient(504).is_retryable());
        assert!(AttemptError::Transport("timed out".to_string()).is_retryable());

        assert!(!AttemptError::Fatal {
            status: 401,
            body: String::new()
        }
        .is_retryable());
    }

    // Test 4: Skip classification
    #[test]
    fn test_skip_errors() {
        assert!(SyncError::MissingIdentifier("issue".to_string()).is_skip());
        assert!(SyncError::MalformedPayload("x".to_string()).is_skip());

        assert!(!SyncError::ConfigurationIncomplete(vec![]).is_skip());
        assert!(!SyncError::RequestFailed {
            status: 400,
            body: String::new()
        }
        .is_skip());
        assert!(!SyncError::NetworkFailure {
            url: String::new(),
            cause: String::new()
        }
        .is_skip());
    }

    // Test 5: Kind names are stable
    #[test]
    fn test_sync_error_kind() {
        assert_eq!(
            SyncError::RetryExhausted {
                attempts: 5,
                last_status: 429,
                url: String::new()
            }
            .kind(),
            "retry_exhausted"
        );
        assert_eq!(
            SyncError::MissingIdentifier(String::new()).kind(),
            "missing_identifier"
        );
    }

    // Test 6: AppError display includes source error
    #[test]
    fn test_app_error_display() {
        let app_err: AppError = SyncError::MalformedPayload("not an object".to_string()).into();
        assert_eq!(
            app_err.to_string(),
            "Sync error: Malformed payload: not an object"
        );

        let app_err: AppError = OtelError::Config("endpoint".to_string()).into();
        assert_eq!(
            app_err.to_string(),
            "Telemetry error: Configuration error: endpoint"
        );
    }

    // Test 7: OtelError all variants
    #[test]
    fn test_otel_error_messages() {
        assert_eq!(
            OtelError::TracerInit("connection failed".to_string()).to_string(),
            "Failed to initialize tracer: connection failed"
        );
        assert_eq!(
            OtelError::MeterInit("invalid config".to_string()).to_string(),
            "Failed to initialize meter: invalid config"
        );
        assert_eq!(
            OtelError::Shutdown("timeout".to_string()).to_string(),
            "Failed to shutdown: timeout"
        );
    }
}
