//! Loading the event document GitHub Actions writes to `GITHUB_EVENT_PATH`

use serde_json::Value;
use std::path::Path;
use tracing::{debug, error};

use crate::error::{AppError, SyncError};

/// Read and parse the event payload at `path`
pub fn load_event<P: AsRef<Path>>(path: P) -> Result<Value, AppError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| {
        error!(path = %path.display(), error = %e, "Event payload file could not be read");
        AppError::EventRead(e)
    })?;

    let payload: Value = serde_json::from_str(&content).map_err(|e| {
        error!(error = %e, "Failed to parse event payload");
        SyncError::MalformedPayload(format!("event payload is not valid JSON: {}", e))
    })?;

    if let Some(obj) = payload.as_object() {
        let keys: Vec<&str> = obj.keys().map(String::as_str).collect();
        debug!(keys = ?keys, "Loaded GitHub event payload");
    }
    Ok(payload)
}
