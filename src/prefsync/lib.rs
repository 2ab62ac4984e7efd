//! # Prefsync Architecture
//!
//! Prefsync keeps a user's display preferences (theme, per-grid column layout,
//! sort and filters, per-team colors) consistent between an interactive client
//! and a remote document store. It is a library first; the `prefsync` binary is
//! one client of it.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  CLI (main.rs, args.rs, print.rs)                           │
//! │  - The ONLY place that knows about stdout/stderr/exit codes │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Column Engine (columns.rs)                                 │
//! │  - Optimistic column order over one grid                    │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Preference Reconciler (reconciler.rs)                      │
//! │  - Owns the canonical document, adopts server echoes        │
//! │  - Resolves the theme against the environment signal        │
//! └─────────────────────────────────────────────────────────────┘
//!                │                              │
//!                ▼                              ▼
//! ┌───────────────────────────┐   ┌─────────────────────────────┐
//! │  Debounce (debounce.rs)   │   │  Merge (merge.rs)           │
//! │  - Coalesced + immediate  │   │  - Partial server data over │
//! │    writes, save status    │   │    hardcoded defaults       │
//! └───────────────────────────┘   └─────────────────────────────┘
//!                │
//!                ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Storage Layer (store/)                                     │
//! │  - PreferenceStore trait                                    │
//! │  - FileStore (CLI), MemoryStore (testing)                   │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Ownership
//!
//! The reconciler exclusively owns the canonical
//! [`PreferenceDocument`](model::PreferenceDocument). Everything else holds
//! snapshots or a local optimistic view and routes durable changes back
//! through reconciler operations. The store's echo of a write, not the
//! locally computed document, becomes canonical.
//!
//! ## Runtime
//!
//! Everything runs on Tokio. Constructors that spawn background work
//! (reconciler, column engine, debounced saves) must be called inside a
//! runtime. Shared state sits behind `parking_lot` mutexes that are never
//! held across an `.await`.
//!
//! ## Module Overview
//!
//! - [`reconciler`]: Canonical document, mutations, theme resolution
//! - [`columns`]: Column visibility and ordering for one grid
//! - [`debounce`]: Debounced and immediate writes with observable status
//! - [`merge`]: Decoding partial server documents, merge-with-defaults
//! - [`filter`]: Numeric filter language and category filters
//! - [`catalog`]: Column definitions and the default document
//! - [`environment`]: Live OS color-scheme signal
//! - [`store`]: Storage abstraction and implementations
//! - [`model`]: Core data types
//! - [`config`]: Configuration management
//! - [`error`]: Error types

pub mod catalog;
pub mod columns;
pub mod config;
pub mod debounce;
pub mod environment;
pub mod error;
pub mod filter;
pub mod merge;
pub mod model;
pub mod reconciler;
pub mod store;

pub use error::{PrefsError, Result};
pub use reconciler::PreferenceReconciler;
