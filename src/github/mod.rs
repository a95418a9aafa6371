//! GitHub side of the bridge
//!
//! - [`payload`]: normalization of raw webhook payloads
//! - [`notifier`]: idempotent back-reference comments
//! - [`event`]: loading the event document from disk

pub mod event;
pub mod notifier;
pub mod payload;

pub use event::load_event;
pub use notifier::{BackReferenceNotifier, CommentStatus, GitHubNotifier};
pub use payload::{normalize, parse_flat_payload};
