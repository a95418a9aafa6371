//! Notion property shapes
//!
//! Each property kind the databases use is an explicit variant with a single
//! serialization function, so request bodies are checked at compile time
//! instead of relying on nested map conventions.

use serde::{Serialize, Serializer};
use serde_json::{json, Value};
use std::collections::{BTreeMap, BTreeSet};

/// Maximum length, in characters, of any free-text value sent to Notion
pub const MAX_TEXT_LENGTH: usize = 2000;

/// Marker appended to truncated text
pub const ELLIPSIS: char = '\u{2026}';

/// Truncate `content` to at most `limit` characters.
///
/// Longer input keeps its first `limit - 1` characters followed by a single
/// ellipsis, so the output is exactly `limit` characters long. Truncating an
/// already truncated value returns it unchanged.
pub fn truncate_text(content: &str, limit: usize) -> String {
    if content.chars().count() <= limit {
        return content.to_string();
    }
    let mut truncated: String = content.chars().take(limit.saturating_sub(1)).collect();
    truncated.push(ELLIPSIS);
    truncated
}

/// Deduplicate, drop empty entries and sort a collection of names
pub fn sorted_unique<I, S>(values: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    values
        .into_iter()
        .filter(|v| !v.as_ref().is_empty())
        .map(|v| v.as_ref().to_string())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// A single Notion property value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyValue {
    /// Page title
    Title(String),
    /// Rich text block
    RichText(String),
    /// Single select; `None` clears the value
    Select(Option<String>),
    /// Multi select, always sorted and deduplicated
    MultiSelect(Vec<String>),
    /// URL; `None` clears the value
    Url(Option<String>),
    /// Date start; `None` clears the value
    Date(Option<String>),
    /// Checkbox
    Checkbox(bool),
}

impl PropertyValue {
    /// Title property, truncated to [`MAX_TEXT_LENGTH`]
    pub fn title(content: &str) -> Self {
        PropertyValue::Title(truncate_text(content, MAX_TEXT_LENGTH))
    }

    /// Rich text property, truncated to [`MAX_TEXT_LENGTH`]
    pub fn rich_text(content: &str) -> Self {
        PropertyValue::RichText(truncate_text(content, MAX_TEXT_LENGTH))
    }

    /// Select property; empty names clear the value
    pub fn select(name: Option<&str>) -> Self {
        PropertyValue::Select(name.filter(|n| !n.is_empty()).map(str::to_string))
    }

    /// Multi-select property from any collection of names
    pub fn multi_select<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        PropertyValue::MultiSelect(sorted_unique(names))
    }

    /// URL property; empty URLs clear the value
    pub fn url(url: &str) -> Self {
        PropertyValue::Url(Some(url).filter(|u| !u.is_empty()).map(str::to_string))
    }

    /// Render the property in the Notion wire shape
    pub fn to_json(&self) -> Value {
        match self {
            PropertyValue::Title(content) => json!({
                "title": [{"type": "text", "text": {"content": content}}]
            }),
            PropertyValue::RichText(content) => json!({
                "rich_text": [{"type": "text", "text": {"content": content}}]
            }),
            PropertyValue::Select(Some(name)) => json!({"select": {"name": name}}),
            PropertyValue::Select(None) => json!({"select": null}),
            PropertyValue::MultiSelect(names) => json!({
                "multi_select": names.iter().map(|n| json!({"name": n})).collect::<Vec<_>>()
            }),
            PropertyValue::Url(url) => json!({"url": url}),
            PropertyValue::Date(Some(start)) => json!({"date": {"start": start}}),
            PropertyValue::Date(None) => json!({"date": null}),
            PropertyValue::Checkbox(checked) => json!({"checkbox": checked}),
        }
    }
}

impl Serialize for PropertyValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

/// Named properties of one page, ordered by name
pub type Properties = BTreeMap<String, PropertyValue>;
