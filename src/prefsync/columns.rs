//! # Column Visibility and Ordering
//!
//! A [`ColumnEngine`] presents one grid's `columns` list as an ordered,
//! toggle-able sequence. The list's membership is visibility; its order is
//! display order.
//!
//! ## Optimistic override
//!
//! Every mutation computes the next list from what the user currently sees,
//! stores it as a local [`ColumnOverride`] and dispatches exactly one write
//! through the reconciler. Reads prefer the override, so the UI reflects the
//! action before the round-trip completes. Writes are not coalesced; they are
//! queued in call order and drained by a single worker task.
//!
//! The override goes back to [`ColumnOverride::None`] when a write succeeds
//! and its list is still the current override. A failed write keeps the
//! override until the reconciler adopts the next fetched document.
//!
//! ## Widths
//!
//! Resizing produces a stream of values per drag, so widths go through a
//! [`DebounceCoordinator`] instead of the write queue.
//!
//! ## Teardown
//!
//! Dropping the engine closes the queue. Column writes already dispatched are
//! still drained; only a pending width save is cancelled.

use crate::catalog::{self, ColumnDef};
use crate::debounce::{DebounceCoordinator, DEFAULT_DEBOUNCE};
use crate::error::{PrefsError, Result};
use crate::model::{GridKey, GridPreferencePatch};
use crate::reconciler::PreferenceReconciler;
use crate::store::PreferenceStore;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

/// Local column order layered over the canonical document.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ColumnOverride {
    /// Defer to the reconciler's `GridPreference.columns`.
    #[default]
    None,
    /// An order the user produced that may not be persisted yet.
    Value(Vec<String>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "up" => Ok(Direction::Up),
            "down" => Ok(Direction::Down),
            _ => Err(format!("Unknown direction: {}", s)),
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Up => write!(f, "up"),
            Direction::Down => write!(f, "down"),
        }
    }
}

/// One row of the settings list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayColumn {
    pub def: ColumnDef,
    pub visible: bool,
}

type ChangeCallback = Arc<dyn Fn(&[String]) + Send + Sync>;

#[derive(Default)]
struct LocalState {
    order: ColumnOverride,
    /// Reconciler load count when `order` was set.
    epoch: u64,
    /// Widths resized locally but not yet persisted.
    widths: BTreeMap<String, u32>,
}

enum Job {
    Write(Vec<String>),
    Barrier(oneshot::Sender<()>),
}

pub struct ColumnEngineBuilder<S> {
    reconciler: PreferenceReconciler<S>,
    grid: GridKey,
    defs: Vec<ColumnDef>,
    width_delay: Duration,
    on_change: Option<ChangeCallback>,
}

impl<S: PreferenceStore> ColumnEngineBuilder<S> {
    /// Replaces the grid's catalog column definitions.
    pub fn columns(mut self, defs: impl Into<Vec<ColumnDef>>) -> Self {
        self.defs = defs.into();
        self
    }

    pub fn width_delay(mut self, delay: Duration) -> Self {
        self.width_delay = delay;
        self
    }

    /// Called with the new visible list after every mutation, before the
    /// write is dispatched.
    pub fn on_change(mut self, callback: impl Fn(&[String]) + Send + Sync + 'static) -> Self {
        self.on_change = Some(Arc::new(callback));
        self
    }

    /// Must be called within a Tokio runtime.
    pub fn build(self) -> ColumnEngine<S> {
        let local = Arc::new(Mutex::new(LocalState::default()));
        let (queue, jobs) = mpsc::unbounded_channel();
        tokio::spawn(drain(
            self.reconciler.clone(),
            self.grid,
            Arc::clone(&local),
            jobs,
        ));

        let widths = {
            let reconciler = self.reconciler.clone();
            let local = Arc::clone(&local);
            let grid = self.grid;
            DebounceCoordinator::builder(move |widths: BTreeMap<String, u32>| {
                let reconciler = reconciler.clone();
                let local = Arc::clone(&local);
                async move {
                    let result = reconciler
                        .set_grid_preferences(grid, GridPreferencePatch::column_widths(widths.clone()))
                        .await;
                    if result.is_ok() {
                        local
                            .lock()
                            .widths
                            .retain(|column, width| widths.get(column) != Some(width));
                    }
                    result
                }
            })
            .delay(self.width_delay)
            .build()
        };

        ColumnEngine {
            reconciler: self.reconciler,
            grid: self.grid,
            defs: self.defs,
            local,
            on_change: self.on_change,
            queue,
            widths,
        }
    }
}

async fn drain<S: PreferenceStore>(
    reconciler: PreferenceReconciler<S>,
    grid: GridKey,
    local: Arc<Mutex<LocalState>>,
    mut jobs: mpsc::UnboundedReceiver<Job>,
) {
    while let Some(job) = jobs.recv().await {
        match job {
            Job::Write(columns) => {
                debug!(%grid, ?columns, "persisting column order");
                let result = reconciler
                    .set_grid_preferences(grid, GridPreferencePatch::columns(columns.clone()))
                    .await;
                match result {
                    Ok(()) => {
                        let mut local = local.lock();
                        if local.order == ColumnOverride::Value(columns) {
                            local.order = ColumnOverride::None;
                        }
                    }
                    Err(err) => warn!(%grid, error = %err, "column order write failed"),
                }
            }
            Job::Barrier(done) => {
                let _ = done.send(());
            }
        }
    }
}

/// Column list of one grid with optimistic local edits.
pub struct ColumnEngine<S> {
    reconciler: PreferenceReconciler<S>,
    grid: GridKey,
    defs: Vec<ColumnDef>,
    local: Arc<Mutex<LocalState>>,
    on_change: Option<ChangeCallback>,
    queue: mpsc::UnboundedSender<Job>,
    widths: DebounceCoordinator<BTreeMap<String, u32>>,
}

impl<S: PreferenceStore> ColumnEngine<S> {
    pub fn builder(reconciler: PreferenceReconciler<S>, grid: GridKey) -> ColumnEngineBuilder<S> {
        ColumnEngineBuilder {
            reconciler,
            grid,
            defs: catalog::columns_for(grid).to_vec(),
            width_delay: DEFAULT_DEBOUNCE,
            on_change: None,
        }
    }

    /// An engine over the catalog columns of `grid`.
    pub fn new(reconciler: PreferenceReconciler<S>, grid: GridKey) -> Self {
        Self::builder(reconciler, grid).build()
    }

    pub fn grid(&self) -> GridKey {
        self.grid
    }

    pub fn definitions(&self) -> &[ColumnDef] {
        &self.defs
    }

    pub fn override_state(&self) -> ColumnOverride {
        self.local.lock().order.clone()
    }

    /// Visible column keys in display order.
    pub fn visible_columns(&self) -> Vec<String> {
        let loads = self.reconciler.load_count();
        {
            let local = self.local.lock();
            if let ColumnOverride::Value(columns) = &local.order {
                if local.epoch == loads {
                    return columns.clone();
                }
            }
        }
        self.reconciler.grid(self.grid).columns
    }

    pub fn is_visible(&self, key: &str) -> bool {
        self.visible_columns().iter().any(|c| c == key)
    }

    /// Every known column: visible ones first in display order, then hidden
    /// ones in declaration order.
    pub fn display_columns(&self) -> Vec<DisplayColumn> {
        let visible = self.visible_columns();
        let shown = visible
            .iter()
            .filter_map(|key| self.definition(key))
            .map(|def| DisplayColumn { def, visible: true });
        let hidden = self
            .defs
            .iter()
            .filter(|def| !visible.iter().any(|key| key == def.key))
            .map(|def| DisplayColumn {
                def: *def,
                visible: false,
            });
        shown.chain(hidden).collect()
    }

    fn definition(&self, key: &str) -> Option<ColumnDef> {
        self.defs.iter().find(|def| def.key == key).copied()
    }

    /// Hides a visible column or appends a hidden one. Returns the new
    /// visibility.
    pub fn toggle(&self, key: &str) -> Result<bool> {
        if self.definition(key).is_none() {
            return Err(PrefsError::UnknownColumn(key.to_string()));
        }
        let mut columns = self.visible_columns();
        let visible = match columns.iter().position(|c| c == key) {
            Some(index) => {
                columns.remove(index);
                false
            }
            None => {
                columns.push(key.to_string());
                true
            }
        };
        self.commit(columns);
        Ok(visible)
    }

    /// Swaps a visible column with its neighbour. Returns false, without
    /// writing, at either end or for a hidden column.
    pub fn move_column(&self, key: &str, direction: Direction) -> bool {
        let mut columns = self.visible_columns();
        let Some(index) = columns.iter().position(|c| c == key) else {
            return false;
        };
        let neighbour = match direction {
            Direction::Up if index > 0 => index - 1,
            Direction::Down if index + 1 < columns.len() => index + 1,
            _ => return false,
        };
        columns.swap(index, neighbour);
        self.commit(columns);
        true
    }

    /// Drag-and-drop completion: takes `from` out and re-inserts it at the
    /// index `to` occupied.
    pub fn move_to_position(&self, from: &str, to: &str) -> bool {
        if from == to {
            return false;
        }
        let mut columns = self.visible_columns();
        let (Some(from_index), Some(to_index)) = (
            columns.iter().position(|c| c == from),
            columns.iter().position(|c| c == to),
        ) else {
            return false;
        };
        let moved = columns.remove(from_index);
        columns.insert(to_index, moved);
        self.commit(columns);
        true
    }

    /// Restores the default-visible columns in declaration order, ignoring
    /// current preferences.
    pub fn reset_to_defaults(&self) {
        self.commit(catalog::default_visible(&self.defs));
    }

    fn commit(&self, columns: Vec<String>) {
        let loads = self.reconciler.load_count();
        {
            let mut local = self.local.lock();
            local.order = ColumnOverride::Value(columns.clone());
            local.epoch = loads;
        }
        if let Some(callback) = &self.on_change {
            callback(&columns);
        }
        if self.queue.send(Job::Write(columns)).is_err() {
            warn!(grid = %self.grid, "column worker stopped; write dropped");
        }
    }

    /// Widths as currently shown: persisted widths overlaid with local resizes.
    pub fn column_widths(&self) -> BTreeMap<String, u32> {
        let mut widths = self.reconciler.grid(self.grid).column_widths;
        widths.extend(
            self.local
                .lock()
                .widths
                .iter()
                .map(|(column, width)| (column.clone(), *width)),
        );
        widths
    }

    /// Records a width from a resize drag. Persisted once resizing pauses.
    pub fn resize(&self, key: &str, width: u32) -> Result<()> {
        if self.definition(key).is_none() {
            return Err(PrefsError::UnknownColumn(key.to_string()));
        }
        self.local.lock().widths.insert(key.to_string(), width);
        self.widths.save(self.column_widths());
        Ok(())
    }

    /// Persists a pending resize now instead of waiting for the delay.
    pub async fn flush_widths(&self) -> Result<()> {
        match self.widths.flush().await {
            Some(result) => result,
            None => Ok(()),
        }
    }

    /// Resolves once every column write dispatched so far has completed.
    pub async fn settled(&self) {
        let (done, wait) = oneshot::channel();
        if self.queue.send(Job::Barrier(done)).is_ok() {
            let _ = wait.await;
        }
    }
}
