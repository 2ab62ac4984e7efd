//! # Storage Layer
//!
//! The server side of preference sync is an opaque key → document store. This
//! module defines the contract the reconciler consumes, [`PreferenceStore`],
//! and two implementations.
//!
//! ## Contract
//!
//! - `fetch_preferences` returns the stored document as-is: it may be partial,
//!   stale or empty. It is idempotent and has no side effects.
//! - `update_preferences` replaces the whole stored document and echoes back
//!   what was stored. The echo is authoritative and may differ from the
//!   request (normalization).
//!
//! Both calls may fail; the reconciler classifies failures as load or save
//! errors.
//!
//! ## Implementations
//!
//! - [`fs::FileStore`]: one JSON file per user, used by the CLI.
//! - [`memory::MemoryStore`]: for testing reconciliation logic, with knobs
//!   for failures, latency and server-side normalization.
//!
//! ## Wire format
//!
//! Documents travel inside an envelope:
//!
//! ```json
//! { "preferences": { "ui": { "theme": "dark" }, "grids": { ... } } }
//! ```

use crate::error::Result;
use crate::merge::PartialPreferences;
use crate::model::PreferenceDocument;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub mod fs;
pub mod memory;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreferencesEnvelope<T> {
    pub preferences: T,
}

#[async_trait]
pub trait PreferenceStore: Send + Sync + 'static {
    /// The stored, possibly partial, document.
    async fn fetch_preferences(&self) -> Result<PartialPreferences>;

    /// Replaces the stored document and returns what was stored.
    async fn update_preferences(&self, document: PreferenceDocument)
        -> Result<PreferenceDocument>;
}

#[async_trait]
impl<S: PreferenceStore + ?Sized> PreferenceStore for Arc<S> {
    async fn fetch_preferences(&self) -> Result<PartialPreferences> {
        (**self).fetch_preferences().await
    }

    async fn update_preferences(
        &self,
        document: PreferenceDocument,
    ) -> Result<PreferenceDocument> {
        (**self).update_preferences(document).await
    }
}
