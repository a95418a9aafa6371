//! Event synchronization
//!
//! # Components
//!
//! - [`synchronizer`]: per-entity upsert protocol with back-reference comments
//! - [`dispatcher`]: static routing of event names to synchronizers
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use notion_sync::config::Config;
//! use notion_sync::github::GitHubNotifier;
//! use notion_sync::notion::NotionClient;
//! use notion_sync::sync::Dispatcher;
//!
//! let config = Config::from_env()?;
//! let store = Arc::new(NotionClient::new(&config.notion, &config.retry)?);
//! let notifier = Arc::new(GitHubNotifier::new(&config.github)?);
//! let dispatcher = Dispatcher::new(store, notifier, config.collections.clone());
//!
//! let ok = dispatcher.dispatch(Some("issues"), &payload).await?;
//! ```

pub mod dispatcher;
pub mod synchronizer;

pub use dispatcher::{infer_event_kind, resolve, Dispatcher, INFERENCE_ORDER, ROUTES};
pub use synchronizer::Synchronizer;
