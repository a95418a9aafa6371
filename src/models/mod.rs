//! Domain models for notion-sync
//!
//! This module contains the record types and Notion property shapes shared by
//! the normalizer, the request builder and the synchronizers.

pub mod property;
pub mod record;

// Re-export commonly used types
pub use property::{truncate_text, Properties, PropertyValue, MAX_TEXT_LENGTH};
pub use record::{
    CanonicalRecord, EntityKind, NormalizedItem, RemoteRecord, SyncOutcome, UpsertAction,
};
