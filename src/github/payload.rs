//! GitHub event payload normalization
//!
//! Turns the raw webhook document into a [`NormalizedItem`]: the canonical
//! record every entity shares plus the kind-specific Notion properties.
//! Collections are deduplicated and sorted and free text is truncated here,
//! so the same event always produces the same request body.

use chrono::DateTime;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::error::SyncError;
use crate::models::property::{sorted_unique, truncate_text, MAX_TEXT_LENGTH};
use crate::models::{CanonicalRecord, EntityKind, NormalizedItem, Properties, PropertyValue};

/// Title used when the item has none
pub const DEFAULT_TITLE: &str = "(no title)";

/// Title used for project entries without name, note or content
pub const DEFAULT_PROJECT_TITLE: &str = "(project item)";

/// Status used when the item carries no state
pub const DEFAULT_STATUS: &str = "unknown";

const PROJECT_ROOT_KEYS: [&str; 3] = ["project", "project_card", "project_item"];

/// Extract the item of the given kind from a raw GitHub event
///
/// # Errors
///
/// - [`SyncError::MalformedPayload`] when the event is not an object or the
///   root key for `kind` is absent, empty or not an object
/// - [`SyncError::MissingIdentifier`] when the item has neither `node_id` nor `id`
pub fn normalize(kind: EntityKind, event: &Value) -> Result<NormalizedItem, SyncError> {
    let event_obj = event
        .as_object()
        .ok_or_else(|| SyncError::MalformedPayload("event payload is not an object".to_string()))?;
    let item = root_item(kind, event_obj)?;
    let external_id = external_id(kind, item)?;

    let metadata = metadata(item, event_obj);
    let (record, extras, comments_url) = match kind {
        EntityKind::Issue => {
            let record = base_record(&external_id, item, text(item, "title"), metadata)?;
            let mut extras = people_and_labels(item);
            extras.insert("Closed".to_string(), date(item, "closed_at"));
            insert_common_dates(&mut extras, item);
            (record, extras, text(item, "comments_url"))
        }
        EntityKind::PullRequest => {
            let record = base_record(&external_id, item, text(item, "title"), metadata)?;
            let mut extras = people_and_labels(item);
            extras.insert(
                "Draft".to_string(),
                PropertyValue::Checkbox(item.get("draft").and_then(Value::as_bool).unwrap_or(false)),
            );
            extras.insert("Merged".to_string(), date(item, "merged_at"));
            insert_common_dates(&mut extras, item);
            let comments_url = text(item, "issue_url").map(|url| format!("{}/comments", url));
            (record, extras, comments_url)
        }
        EntityKind::Discussion => {
            let record = base_record(&external_id, item, text(item, "title"), metadata)?;
            let mut extras = Properties::new();
            let category = item
                .get("category")
                .and_then(Value::as_object)
                .and_then(|c| text(c, "name"));
            extras.insert(
                "Category".to_string(),
                PropertyValue::select(category.as_deref()),
            );
            let author = item
                .get("user")
                .and_then(Value::as_object)
                .and_then(|u| text(u, "login"));
            extras.insert(
                "Author".to_string(),
                PropertyValue::multi_select(author.into_iter()),
            );
            insert_common_dates(&mut extras, item);
            (record, extras, text(item, "comments_url"))
        }
        EntityKind::Project => {
            let title = first_text(item, &["name", "note", "content_url"])
                .unwrap_or_else(|| DEFAULT_PROJECT_TITLE.to_string());
            let url = first_text(item, &["html_url", "url"]).unwrap_or_default();
            let status = first_text(item, &["state", "column_name"])
                .unwrap_or_else(|| DEFAULT_STATUS.to_string());
            let record = CanonicalRecord::new(
                &external_id,
                truncate_text(&title, MAX_TEXT_LENGTH),
                url,
                status,
            )?
            .with_metadata(metadata);
            let mut extras = Properties::new();
            insert_common_dates(&mut extras, item);
            (record, extras, None)
        }
    };

    Ok(NormalizedItem {
        kind,
        record,
        extras,
        comments_url,
    })
}

/// Parse a flat, pre-normalized payload into a [`CanonicalRecord`]
///
/// The payload carries `id`, `title`, `html_url` and `status` at the top level
/// and an optional `github_metadata` object.
pub fn parse_flat_payload(raw: &Value) -> Result<CanonicalRecord, SyncError> {
    let obj = raw
        .as_object()
        .ok_or_else(|| SyncError::MalformedPayload("payload is not an object".to_string()))?;

    let missing: Vec<&str> = ["id", "title", "html_url", "status"]
        .into_iter()
        .filter(|key| !obj.contains_key(*key))
        .collect();
    if !missing.is_empty() {
        return Err(SyncError::MalformedPayload(format!(
            "payload is missing required fields: {}",
            missing.join(", ")
        )));
    }

    let id = text(obj, "id").ok_or_else(|| SyncError::MissingIdentifier("flat".to_string()))?;
    let metadata = obj
        .get("github_metadata")
        .and_then(Value::as_object)
        .map(|m| m.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
        .unwrap_or_default();

    Ok(CanonicalRecord::new(
        id,
        text(obj, "title").unwrap_or_default(),
        text(obj, "html_url").unwrap_or_default(),
        text(obj, "status").unwrap_or_default(),
    )?
    .with_metadata(metadata))
}

fn root_item<'a>(
    kind: EntityKind,
    event: &'a Map<String, Value>,
) -> Result<&'a Map<String, Value>, SyncError> {
    let (keys, label): (&[&str], String) = match kind {
        EntityKind::Issue => (&["issue"], "'issue'".to_string()),
        EntityKind::PullRequest => (&["pull_request"], "'pull_request'".to_string()),
        EntityKind::Discussion => (&["discussion"], "'discussion'".to_string()),
        EntityKind::Project => (
            &PROJECT_ROOT_KEYS,
            "'project'/'project_card'/'project_item'".to_string(),
        ),
    };

    keys.iter()
        .filter_map(|key| event.get(*key))
        .filter_map(Value::as_object)
        .find(|obj| !obj.is_empty())
        .ok_or_else(|| SyncError::MalformedPayload(format!("{} payload missing {}", kind, label)))
}

fn external_id(kind: EntityKind, item: &Map<String, Value>) -> Result<String, SyncError> {
    text(item, "node_id")
        .or_else(|| text(item, "id"))
        .ok_or_else(|| SyncError::MissingIdentifier(kind.to_string()))
}

fn base_record(
    external_id: &str,
    item: &Map<String, Value>,
    title: Option<String>,
    metadata: BTreeMap<String, Value>,
) -> Result<CanonicalRecord, SyncError> {
    let title = title.unwrap_or_else(|| DEFAULT_TITLE.to_string());
    Ok(CanonicalRecord::new(
        external_id,
        truncate_text(&title, MAX_TEXT_LENGTH),
        text(item, "html_url").unwrap_or_default(),
        text(item, "state").unwrap_or_else(|| DEFAULT_STATUS.to_string()),
    )?
    .with_metadata(metadata))
}

fn people_and_labels(item: &Map<String, Value>) -> Properties {
    let mut extras = Properties::new();
    extras.insert(
        "Assignees".to_string(),
        PropertyValue::MultiSelect(names_in(item, "assignees", "login")),
    );
    extras.insert(
        "Labels".to_string(),
        PropertyValue::MultiSelect(names_in(item, "labels", "name")),
    );
    extras
}

fn insert_common_dates(extras: &mut Properties, item: &Map<String, Value>) {
    extras.insert("Updated".to_string(), date(item, "updated_at"));
    extras.insert("Created".to_string(), date(item, "created_at"));
}

fn metadata(item: &Map<String, Value>, event: &Map<String, Value>) -> BTreeMap<String, Value> {
    let mut metadata = BTreeMap::new();
    if let Some(number) = item.get("number").filter(|n| n.is_number()) {
        metadata.insert("number".to_string(), number.clone());
    }
    if let Some(repo) = event
        .get("repository")
        .and_then(Value::as_object)
        .and_then(|r| text(r, "full_name"))
    {
        metadata.insert("repository".to_string(), Value::String(repo));
    }
    if let Some(sender) = event
        .get("sender")
        .and_then(Value::as_object)
        .and_then(|s| text(s, "login"))
    {
        metadata.insert("sender".to_string(), Value::String(sender));
    }
    metadata
}

/// Names under `field` of each object in the array at `key`
fn names_in(item: &Map<String, Value>, key: &str, field: &str) -> Vec<String> {
    let names = item
        .get(key)
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(Value::as_object)
        .filter_map(|obj| text(obj, field));
    sorted_unique(names)
}

fn date(item: &Map<String, Value>, key: &str) -> PropertyValue {
    let start = text(item, key).filter(|raw| DateTime::parse_from_rfc3339(raw).is_ok());
    PropertyValue::Date(start)
}

fn first_text(item: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| text(item, key))
}

/// Non-empty scalar at `key`, coerced to a string
fn text(obj: &Map<String, Value>, key: &str) -> Option<String> {
    match obj.get(key)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
