//! # Preference Reconciler
//!
//! [`PreferenceReconciler`] owns the canonical [`PreferenceDocument`] of one
//! user. Every other component reads snapshots of it and routes durable changes
//! back through its named operations; nothing else mutates the document.
//!
//! ## Loading
//!
//! Creating a reconciler spawns a fetch. Until it settles, `is_loading()` is
//! true and the document equals the hardcoded defaults. The fetched document
//! is merged over the defaults (see [`merge`](crate::merge)). A failed fetch
//! leaves the defaults in place and is exposed through `load_error()`; it is
//! not retried automatically. A fetch that settles after a write has already
//! been adopted is discarded, since it describes an older document.
//!
//! ## Mutations
//!
//! Each mutation copies the current in-memory document, applies a shallow
//! change, and writes the full result through the immediate path of a
//! [`DebounceCoordinator`]. On success the document echoed by the store
//! becomes canonical; the locally computed copy never is. On failure the
//! canonical document is left untouched and the error lands in
//! [`save_state`](PreferenceReconciler::save_state).
//!
//! Concurrent mutations are not serialized. Whichever write settles last
//! decides the canonical document.
//!
//! ## Theme
//!
//! The stored theme is `light`, `dark` or `system`. The reconciler listens to a
//! [`ColorSchemeWatch`] for the whole of its lifetime and exposes the concrete
//! `resolved_theme()`. Whenever that value changes, the optional theme applier
//! is invoked so the host can restyle its root element.

use crate::catalog::{default_preferences, DEFAULT_PREFERENCES};
use crate::debounce::{DebounceCoordinator, SaveState};
use crate::environment::ColorSchemeWatch;
use crate::error::{PrefsError, Result};
use crate::filter::{self, NumericFilterValue};
use crate::merge::merge_with_defaults;
use crate::model::{
    GridKey, GridPreference, GridPreferencePatch, PreferenceDocument, PreferencePatch,
    ResolvedTheme, SortDirection, TeamColorScheme, TeamId, Theme, UiPreferences,
};
use crate::store::PreferenceStore;
use parking_lot::Mutex;
use std::collections::BTreeSet;
use std::sync::{Arc, Weak};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

type ThemeApplier = Box<dyn Fn(ResolvedTheme) + Send + Sync>;

struct ReconcilerState {
    document: PreferenceDocument,
    load_error: Option<PrefsError>,
    system_scheme: ResolvedTheme,
    applied_theme: Option<ResolvedTheme>,
    /// Bumped every time a write is adopted.
    revision: u64,
    /// Bumped every time a fetched document replaces the canonical one.
    loads: u64,
    closed: bool,
}

struct ReconcilerInner<S> {
    store: Arc<S>,
    writer: DebounceCoordinator<PreferenceDocument, PreferenceDocument>,
    state: Mutex<ReconcilerState>,
    loading: watch::Sender<bool>,
    applier: Option<ThemeApplier>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl<S: PreferenceStore> ReconcilerInner<S> {
    async fn load(&self) -> Result<()> {
        self.loading.send_replace(true);
        let started_at = self.state.lock().revision;
        debug!("fetching preferences");
        let fetched = self.store.fetch_preferences().await;

        let outcome = {
            let mut state = self.state.lock();
            if state.closed {
                return Err(PrefsError::Closed);
            }
            match fetched {
                Ok(partial) => {
                    state.load_error = None;
                    if state.revision == started_at {
                        state.document = merge_with_defaults(partial, &DEFAULT_PREFERENCES);
                        state.loads += 1;
                        info!("preferences loaded");
                    } else {
                        debug!("discarding fetch that predates an adopted write");
                    }
                    Ok(())
                }
                Err(err) => {
                    let err = PrefsError::Load(err.to_string());
                    warn!(error = %err, "falling back to default preferences");
                    state.load_error = Some(err.clone());
                    Err(err)
                }
            }
        };

        self.loading.send_replace(false);
        self.sync_applied_theme();
        outcome
    }

    fn adopt(&self, echo: PreferenceDocument) {
        {
            let mut state = self.state.lock();
            if state.closed {
                debug!("write settled after shutdown; not adopting echo");
                return;
            }
            state.document = echo;
            state.revision += 1;
        }
        self.sync_applied_theme();
    }

    fn on_system_scheme(&self, scheme: ResolvedTheme) {
        {
            let mut state = self.state.lock();
            if state.closed {
                return;
            }
            state.system_scheme = scheme;
        }
        self.sync_applied_theme();
    }

    fn sync_applied_theme(&self) {
        let resolved = {
            let mut state = self.state.lock();
            if state.closed {
                return;
            }
            let resolved = state.document.theme().resolve(state.system_scheme);
            if state.applied_theme == Some(resolved) {
                return;
            }
            state.applied_theme = Some(resolved);
            resolved
        };
        debug!(theme = %resolved, "applying resolved theme");
        if let Some(apply) = &self.applier {
            apply(resolved);
        }
    }

    fn shutdown(&self) {
        {
            let mut state = self.state.lock();
            if state.closed {
                return;
            }
            state.closed = true;
        }
        self.writer.teardown();
        for task in self.tasks.lock().drain(..) {
            task.abort();
        }
        self.loading.send_replace(false);
        debug!("preference reconciler shut down");
    }
}

impl<S> Drop for ReconcilerInner<S> {
    fn drop(&mut self) {
        for task in self.tasks.get_mut().drain(..) {
            task.abort();
        }
    }
}

/// Shared handle to the canonical preference document.
///
/// Cloning is cheap and every clone talks to the same document. The reconciler
/// shuts down when the last clone is dropped or [`shutdown`](Self::shutdown)
/// is called.
pub struct PreferenceReconciler<S> {
    inner: Arc<ReconcilerInner<S>>,
}

impl<S> Clone for PreferenceReconciler<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: PreferenceStore> PreferenceReconciler<S> {
    /// Starts loading preferences from `store` and listening to `environment`.
    /// Must be called within a Tokio runtime.
    pub fn new(store: Arc<S>, environment: ColorSchemeWatch) -> Self {
        Self::spawn(store, environment, None)
    }

    /// Like [`new`](Self::new), calling `applier` whenever the resolved theme
    /// changes (including once the initial value is known).
    pub fn with_theme_applier(
        store: Arc<S>,
        environment: ColorSchemeWatch,
        applier: impl Fn(ResolvedTheme) + Send + Sync + 'static,
    ) -> Self {
        Self::spawn(store, environment, Some(Box::new(applier)))
    }

    fn spawn(store: Arc<S>, mut environment: ColorSchemeWatch, applier: Option<ThemeApplier>) -> Self {
        let writer_store = Arc::clone(&store);
        let writer = DebounceCoordinator::new(move |document: PreferenceDocument| {
            let store = Arc::clone(&writer_store);
            async move {
                store.update_preferences(document).await.map_err(|err| match err {
                    PrefsError::Save(_) => err,
                    other => PrefsError::Save(other.to_string()),
                })
            }
        });

        let system_scheme = *environment.borrow_and_update();
        let (loading, _) = watch::channel(true);
        let inner = Arc::new(ReconcilerInner {
            store,
            writer,
            state: Mutex::new(ReconcilerState {
                document: default_preferences(),
                load_error: None,
                system_scheme,
                applied_theme: None,
                revision: 0,
                loads: 0,
                closed: false,
            }),
            loading,
            applier,
            tasks: Mutex::new(Vec::new()),
        });
        inner.sync_applied_theme();

        let listener = {
            let weak: Weak<ReconcilerInner<S>> = Arc::downgrade(&inner);
            tokio::spawn(async move {
                while environment.changed().await.is_ok() {
                    let scheme = *environment.borrow_and_update();
                    let Some(inner) = weak.upgrade() else { break };
                    inner.on_system_scheme(scheme);
                }
            })
        };
        let loader = {
            let weak = Arc::downgrade(&inner);
            tokio::spawn(async move {
                if let Some(inner) = weak.upgrade() {
                    let _ = inner.load().await;
                }
            })
        };
        inner.tasks.lock().extend([listener, loader]);

        Self { inner }
    }

    // --- Reading ---

    /// A snapshot of the canonical document.
    pub fn document(&self) -> PreferenceDocument {
        self.inner.state.lock().document.clone()
    }

    pub fn grid(&self, key: GridKey) -> GridPreference {
        self.inner.state.lock().document.grid(key).clone()
    }

    pub fn theme(&self) -> Theme {
        self.inner.state.lock().document.theme()
    }

    pub fn resolved_theme(&self) -> ResolvedTheme {
        let state = self.inner.state.lock();
        state.document.theme().resolve(state.system_scheme)
    }

    pub fn get_team_color_scheme(&self, team: TeamId) -> Option<TeamColorScheme> {
        self.inner
            .state
            .lock()
            .document
            .team_color_scheme(team)
            .cloned()
    }

    /// How many fetched documents have been adopted so far. Local views layered
    /// over the document use it to notice that an external fetch superseded them.
    pub fn load_count(&self) -> u64 {
        self.inner.state.lock().loads
    }

    pub fn is_loading(&self) -> bool {
        *self.inner.loading.borrow()
    }

    /// Resolves once the in-progress fetch has settled, successfully or not.
    pub async fn wait_until_loaded(&self) {
        let mut loading = self.inner.loading.subscribe();
        let _ = loading.wait_for(|is_loading| !*is_loading).await;
    }

    pub fn load_error(&self) -> Option<PrefsError> {
        self.inner.state.lock().load_error.clone()
    }

    pub fn save_state(&self) -> SaveState {
        self.inner.writer.status()
    }

    pub fn clear_error(&self) {
        self.inner.writer.clear_error();
    }

    /// Fetches again and replaces the canonical document.
    pub async fn refresh(&self) -> Result<()> {
        self.inner.load().await
    }

    // --- Mutations ---

    async fn commit(&self, change: impl FnOnce(&mut PreferenceDocument)) -> Result<()> {
        let next = {
            let state = self.inner.state.lock();
            if state.closed {
                return Err(PrefsError::Closed);
            }
            let mut document = state.document.clone();
            change(&mut document);
            document
        };
        let echo = self.inner.writer.save_immediate(next).await?;
        self.inner.adopt(echo);
        Ok(())
    }

    /// Replaces whole sections of the document.
    pub async fn update_preferences(&self, patch: PreferencePatch) -> Result<()> {
        self.commit(|doc| doc.apply(patch)).await
    }

    pub async fn set_theme(&self, theme: Theme) -> Result<()> {
        self.update_preferences(PreferencePatch {
            ui: Some(UiPreferences { theme }),
            ..Default::default()
        })
        .await
    }

    pub async fn set_grid_preferences(&self, grid: GridKey, patch: GridPreferencePatch) -> Result<()> {
        self.commit(|doc| doc.grids.get_mut(grid).apply(patch)).await
    }

    pub async fn set_team_color_scheme(&self, team: TeamId, colors: TeamColorScheme) -> Result<()> {
        if let Some(bad) = colors.invalid_color() {
            return Err(PrefsError::InvalidColor(bad.to_string()));
        }
        self.commit(|doc| {
            doc.team_color_schemes.insert(team, colors);
        })
        .await
    }

    pub async fn remove_team_color_scheme(&self, team: TeamId) -> Result<()> {
        self.commit(|doc| {
            doc.team_color_schemes.remove(&team);
        })
        .await
    }

    /// Writes the hardcoded defaults verbatim.
    pub async fn reset_preferences(&self) -> Result<()> {
        self.commit(|doc| *doc = default_preferences()).await
    }

    pub async fn set_sort(&self, grid: GridKey, column: impl Into<String>, direction: SortDirection) -> Result<()> {
        self.set_grid_preferences(
            grid,
            GridPreferencePatch {
                sort_column: Some(column.into()),
                sort_direction: Some(direction),
                ..Default::default()
            },
        )
        .await
    }

    pub async fn set_column_width(&self, grid: GridKey, column: impl Into<String>, width: u32) -> Result<()> {
        let mut widths = self.grid(grid).column_widths;
        widths.insert(column.into(), width);
        self.set_grid_preferences(grid, GridPreferencePatch::column_widths(widths))
            .await
    }

    /// Sets or, with `None`, removes the numeric filter of one column.
    pub async fn set_numeric_filter(
        &self,
        grid: GridKey,
        column: &str,
        value: Option<NumericFilterValue>,
    ) -> Result<()> {
        let mut filters = self.grid(grid).numeric_filters;
        match value {
            Some(value) => {
                filters.insert(column.to_string(), value);
            }
            None => {
                filters.remove(column);
            }
        }
        self.set_grid_preferences(
            grid,
            GridPreferencePatch {
                numeric_filters: Some(filters),
                ..Default::default()
            },
        )
        .await
    }

    /// Parses `expression` and stores it as the column's filter. Text that
    /// does not parse is rejected without any write.
    pub async fn set_numeric_filter_expr(
        &self,
        grid: GridKey,
        column: &str,
        expression: &str,
    ) -> Result<NumericFilterValue> {
        let value = filter::parse(expression)
            .ok_or_else(|| PrefsError::InvalidFilter(expression.to_string()))?;
        self.set_numeric_filter(grid, column, Some(value)).await?;
        Ok(value)
    }

    pub async fn set_position_filter(&self, grid: GridKey, positions: BTreeSet<String>) -> Result<()> {
        self.set_grid_preferences(
            grid,
            GridPreferencePatch {
                position_filter: Some(positions),
                ..Default::default()
            },
        )
        .await
    }

    pub async fn set_status_filter(&self, grid: GridKey, statuses: BTreeSet<String>) -> Result<()> {
        self.set_grid_preferences(
            grid,
            GridPreferencePatch {
                status_filter: Some(statuses),
                ..Default::default()
            },
        )
        .await
    }

    /// Stops listening to the environment and cancels pending work. Writes in
    /// flight complete but are no longer adopted.
    pub fn shutdown(&self) {
        self.inner.shutdown();
    }
}
