//! Notion page request bodies
//!
//! Pure functions from a canonical record (plus kind-specific properties) to
//! the JSON bodies of the create, update and lookup calls. No I/O happens
//! here; the same input always yields byte-identical output.

use serde_json::{json, Value};

use crate::models::{
    truncate_text, CanonicalRecord, NormalizedItem, Properties, PropertyValue, MAX_TEXT_LENGTH,
};

/// Default name of the property holding the GitHub identifier
pub const DEFAULT_ID_PROPERTY: &str = "GitHub ID";

/// Property names shared by every entity kind
pub const TITLE_PROPERTY: &str = "Title";
/// URL property
pub const URL_PROPERTY: &str = "URL";
/// Status property
pub const STATUS_PROPERTY: &str = "Status";
/// Serialized metadata property
pub const METADATA_PROPERTY: &str = "GitHub Metadata";

/// A fully built page write, ready to be sent as create or update
#[derive(Debug, Clone, PartialEq)]
pub struct PageRequest {
    /// Target database
    pub collection_id: String,
    /// GitHub identifier the page mirrors
    pub external_id: String,
    /// Page properties, ordered by name
    pub properties: Properties,
}

impl PageRequest {
    /// Body of `POST pages`
    pub fn create_body(&self) -> Value {
        json!({
            "parent": {"database_id": self.collection_id},
            "properties": self.properties,
        })
    }

    /// Body of `PATCH pages/{id}`
    pub fn update_body(&self) -> Value {
        json!({ "properties": self.properties })
    }
}

/// Builds page requests and lookup filters for one id property name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestBuilder {
    id_property: String,
}

impl Default for RequestBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_ID_PROPERTY)
    }
}

impl RequestBuilder {
    /// Create a builder keyed on `id_property`
    pub fn new(id_property: impl Into<String>) -> Self {
        Self {
            id_property: id_property.into(),
        }
    }

    /// Name of the identifier property
    pub fn id_property(&self) -> &str {
        &self.id_property
    }

    /// Properties every page carries, derived from the canonical record
    pub fn record_properties(&self, record: &CanonicalRecord) -> Properties {
        let mut properties = Properties::new();
        properties.insert(TITLE_PROPERTY.to_string(), PropertyValue::title(record.title()));
        properties.insert(
            self.id_property.clone(),
            PropertyValue::rich_text(record.external_id()),
        );
        properties.insert(URL_PROPERTY.to_string(), PropertyValue::url(record.url()));
        properties.insert(
            STATUS_PROPERTY.to_string(),
            PropertyValue::select(Some(record.status())),
        );

        if !record.metadata().is_empty() {
            // BTreeMap keys and serde_json objects both serialize sorted
            let encoded = serde_json::to_string(record.metadata()).unwrap_or_default();
            properties.insert(
                METADATA_PROPERTY.to_string(),
                PropertyValue::RichText(truncate_text(&encoded, MAX_TEXT_LENGTH)),
            );
        }
        properties
    }

    /// Build the request for a bare canonical record
    pub fn build(&self, record: &CanonicalRecord, collection_id: &str) -> PageRequest {
        PageRequest {
            collection_id: collection_id.to_string(),
            external_id: record.external_id().to_string(),
            properties: self.record_properties(record),
        }
    }

    /// Build the request for a normalized item, kind-specific properties included
    ///
    /// Common properties win over extras with the same name.
    pub fn build_item(&self, item: &NormalizedItem, collection_id: &str) -> PageRequest {
        let mut properties = item.extras.clone();
        properties.extend(self.record_properties(&item.record));
        PageRequest {
            collection_id: collection_id.to_string(),
            external_id: item.record.external_id().to_string(),
            properties,
        }
    }

    /// Body of `POST databases/{id}/query` matching one external id
    pub fn lookup_filter(&self, external_id: &str) -> Value {
        json!({
            "filter": {
                "property": self.id_property,
                "rich_text": {"equals": external_id},
            }
        })
    }
}

/// Build a page request with the default id property
pub fn build_page_request(record: &CanonicalRecord, collection_id: &str) -> PageRequest {
    RequestBuilder::default().build(record, collection_id)
}
