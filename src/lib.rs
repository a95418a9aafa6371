//! notion-sync - Mirror GitHub issues, pull requests, discussions and project
//! items into Notion databases
//!
//! This crate normalizes GitHub webhook payloads, upserts them into Notion
//! keyed by the GitHub identifier, retries transient API failures with
//! exponential backoff, and links each GitHub item back to its Notion page.

pub mod config;
pub mod error;
pub mod github;
pub mod models;
pub mod notion;
pub mod otel;
pub mod sync;
