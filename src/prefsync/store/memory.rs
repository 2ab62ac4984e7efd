use super::PreferenceStore;
use crate::error::{PrefsError, Result};
use crate::merge::PartialPreferences;
use crate::model::PreferenceDocument;
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

pub type Normalizer = fn(&mut PreferenceDocument);

/// In-memory preference store for testing.
///
/// Holds the raw stored document so partial and malformed server data can be
/// seeded. Failure simulation, per-write latency and a normalizer (standing in
/// for server-side rewriting of documents) are configurable at any time
/// through `&self`.
#[derive(Default)]
pub struct MemoryStore {
    stored: Mutex<Value>,
    writes: Mutex<Vec<PreferenceDocument>>,
    reads: AtomicUsize,
    simulate_read_error: AtomicBool,
    simulate_write_error: AtomicBool,
    read_latency: Mutex<Option<Duration>>,
    write_latencies: Mutex<VecDeque<Duration>>,
    normalizer: Mutex<Option<Normalizer>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose current document is `raw`.
    pub fn with_document(raw: Value) -> Self {
        let store = Self::default();
        *store.stored.lock() = raw;
        store
    }

    pub fn set_simulate_read_error(&self, simulate: bool) {
        self.simulate_read_error.store(simulate, Ordering::SeqCst);
    }

    pub fn set_simulate_write_error(&self, simulate: bool) {
        self.simulate_write_error.store(simulate, Ordering::SeqCst);
    }

    /// Delays every fetch by `latency`. The document is read before the delay,
    /// as a server would snapshot it when the request arrives.
    pub fn set_read_latency(&self, latency: Duration) {
        *self.read_latency.lock() = Some(latency);
    }

    /// Delays the next write by `latency`. Queued delays are consumed in order,
    /// one per write.
    pub fn push_write_latency(&self, latency: Duration) {
        self.write_latencies.lock().push_back(latency);
    }

    pub fn set_normalizer(&self, normalizer: Normalizer) {
        *self.normalizer.lock() = Some(normalizer);
    }

    /// The raw stored document.
    pub fn stored(&self) -> Value {
        self.stored.lock().clone()
    }

    /// Every document accepted so far, in the order it was stored.
    pub fn writes(&self) -> Vec<PreferenceDocument> {
        self.writes.lock().clone()
    }

    pub fn write_count(&self) -> usize {
        self.writes.lock().len()
    }

    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PreferenceStore for MemoryStore {
    async fn fetch_preferences(&self) -> Result<PartialPreferences> {
        if self.simulate_read_error.load(Ordering::SeqCst) {
            return Err(PrefsError::Store("Simulated read error".to_string()));
        }
        self.reads.fetch_add(1, Ordering::SeqCst);
        let raw = self.stored.lock().clone();
        let latency = *self.read_latency.lock();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        PartialPreferences::from_value(&raw)
    }

    async fn update_preferences(
        &self,
        mut document: PreferenceDocument,
    ) -> Result<PreferenceDocument> {
        let latency = self.write_latencies.lock().pop_front();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        if self.simulate_write_error.load(Ordering::SeqCst) {
            return Err(PrefsError::Store("Simulated write error".to_string()));
        }

        let normalizer = *self.normalizer.lock();
        if let Some(normalize) = normalizer {
            normalize(&mut document);
        }

        *self.stored.lock() = serde_json::to_value(&document)?;
        self.writes.lock().push(document.clone());
        Ok(document)
    }
}
