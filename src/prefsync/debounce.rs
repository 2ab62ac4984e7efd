//! # Debounced saves
//!
//! [`DebounceCoordinator`] turns a burst of "save this value" calls into one
//! delayed write, while still offering an immediate path for edits that must be
//! durable right away.
//!
//! ## Lifecycle
//!
//! ```text
//! Idle --save--> PendingDebounce --timer / save_immediate--> Saving
//! Saving --ok--> Idle
//! Saving --err--> Error --save / save_immediate / clear_error--> PendingDebounce / Saving / Idle
//! ```
//!
//! - [`save`](DebounceCoordinator::save) (re)starts the timer and replaces the
//!   pending payload: the last call wins.
//! - [`save_immediate`](DebounceCoordinator::save_immediate) cancels any
//!   pending timer and writes now. A `save` followed by `save_immediate` yields
//!   exactly one write, the immediate one.
//! - Each coordinator owns at most one pending timer task. Cancelling it means
//!   aborting the task and bumping a generation counter, so a timer that already
//!   woke up but lost the race finds nothing to write.
//!
//! ## Teardown
//!
//! Dropping the coordinator (or calling [`teardown`](DebounceCoordinator::teardown))
//! cancels the pending timer. A write already in flight still completes, but its
//! outcome no longer touches [`SaveState`] and callbacks are not invoked.

use crate::error::{PrefsError, Result};
use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use parking_lot::Mutex;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::debug;

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(800);

type SaveFn<T, R> = Arc<dyn Fn(T) -> BoxFuture<'static, Result<R>> + Send + Sync>;
type SuccessCallback<R> = Arc<dyn Fn(&R) + Send + Sync>;
type ErrorCallback = Arc<dyn Fn(&PrefsError) + Send + Sync>;

/// Observable status of a coordinator.
#[derive(Debug, Clone, Default)]
pub struct SaveState {
    pub is_saving: bool,
    pub last_saved: Option<DateTime<Utc>>,
    pub error: Option<PrefsError>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SavePhase {
    Idle,
    PendingDebounce,
    Saving,
    Error,
}

struct Pending<T> {
    generation: u64,
    value: T,
    timer: JoinHandle<()>,
}

struct Slot<T> {
    pending: Option<Pending<T>>,
    generation: u64,
    in_flight: usize,
    last_saved: Option<DateTime<Utc>>,
    error: Option<PrefsError>,
    closed: bool,
}

struct Inner<T, R> {
    save_fn: SaveFn<T, R>,
    delay: Duration,
    on_success: Option<SuccessCallback<R>>,
    on_error: Option<ErrorCallback>,
    slot: Mutex<Slot<T>>,
}

impl<T, R> Inner<T, R>
where
    T: Send + 'static,
    R: Send + 'static,
{
    async fn fire(&self, generation: u64) {
        let value = {
            let mut slot = self.slot.lock();
            if slot.closed {
                return;
            }
            match slot.pending.take() {
                Some(pending) if pending.generation == generation => pending.value,
                other => {
                    slot.pending = other;
                    return;
                }
            }
        };
        let _ = self.execute(value).await;
    }

    async fn execute(&self, value: T) -> Result<R> {
        let mut guard = InFlight::enter(&self.slot);

        let result = (self.save_fn)(value).await;

        {
            let mut slot = self.slot.lock();
            guard.release(&mut slot);
            if slot.closed {
                debug!("write settled after teardown; dropping state update");
                return result;
            }
            match &result {
                Ok(_) => {
                    slot.last_saved = Some(Utc::now());
                    slot.error = None;
                }
                Err(err) => slot.error = Some(err.clone()),
            }
        }

        match &result {
            Ok(saved) => {
                if let Some(cb) = &self.on_success {
                    cb(saved);
                }
            }
            Err(err) => {
                debug!(error = %err, "write failed");
                if let Some(cb) = &self.on_error {
                    cb(err);
                }
            }
        }
        result
    }
}

/// Counts one write as in flight until it settles or its future is dropped.
struct InFlight<'a, T> {
    slot: &'a Mutex<Slot<T>>,
    active: bool,
}

impl<'a, T> InFlight<'a, T> {
    fn enter(slot: &'a Mutex<Slot<T>>) -> Self {
        {
            let mut slot = slot.lock();
            slot.in_flight += 1;
            slot.error = None;
        }
        Self { slot, active: true }
    }

    fn release(&mut self, slot: &mut Slot<T>) {
        if self.active {
            self.active = false;
            slot.in_flight -= 1;
        }
    }
}

impl<T> Drop for InFlight<'_, T> {
    fn drop(&mut self) {
        if self.active {
            debug!("write abandoned before it settled");
            self.slot.lock().in_flight -= 1;
        }
    }
}

/// Coalesces rapid saves of `T` into single writes. `R` is whatever the save
/// function returns on success (for example a server echo).
pub struct DebounceCoordinator<T, R = ()> {
    inner: Arc<Inner<T, R>>,
}

pub struct DebounceBuilder<T, R> {
    save_fn: SaveFn<T, R>,
    delay: Duration,
    on_success: Option<SuccessCallback<R>>,
    on_error: Option<ErrorCallback>,
}

impl<T, R> DebounceBuilder<T, R>
where
    T: Send + 'static,
    R: Send + 'static,
{
    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn on_success(mut self, callback: impl Fn(&R) + Send + Sync + 'static) -> Self {
        self.on_success = Some(Arc::new(callback));
        self
    }

    pub fn on_error(mut self, callback: impl Fn(&PrefsError) + Send + Sync + 'static) -> Self {
        self.on_error = Some(Arc::new(callback));
        self
    }

    pub fn build(self) -> DebounceCoordinator<T, R> {
        DebounceCoordinator {
            inner: Arc::new(Inner {
                save_fn: self.save_fn,
                delay: self.delay,
                on_success: self.on_success,
                on_error: self.on_error,
                slot: Mutex::new(Slot {
                    pending: None,
                    generation: 0,
                    in_flight: 0,
                    last_saved: None,
                    error: None,
                    closed: false,
                }),
            }),
        }
    }
}

impl<T, R> DebounceCoordinator<T, R>
where
    T: Send + 'static,
    R: Send + 'static,
{
    pub fn builder<F, Fut>(save_fn: F) -> DebounceBuilder<T, R>
    where
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R>> + Send + 'static,
    {
        DebounceBuilder {
            save_fn: Arc::new(move |value| Box::pin(save_fn(value))),
            delay: DEFAULT_DEBOUNCE,
            on_success: None,
            on_error: None,
        }
    }

    /// A coordinator with the default delay and no callbacks.
    pub fn new<F, Fut>(save_fn: F) -> Self
    where
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R>> + Send + 'static,
    {
        Self::builder(save_fn).build()
    }

    pub fn delay(&self) -> Duration {
        self.inner.delay
    }

    /// Schedules `value` to be written once the delay passes without another
    /// call. Replaces any pending payload. Must be called within a Tokio runtime.
    pub fn save(&self, value: T) {
        let mut slot = self.inner.slot.lock();
        if slot.closed {
            debug!("save after teardown ignored");
            return;
        }
        if let Some(previous) = slot.pending.take() {
            previous.timer.abort();
            debug!("pending save superseded");
        }
        slot.generation += 1;
        let generation = slot.generation;

        let inner = Arc::clone(&self.inner);
        let delay = self.inner.delay;
        let timer = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            inner.fire(generation).await;
        });
        slot.pending = Some(Pending {
            generation,
            value,
            timer,
        });
    }

    /// Cancels any pending save and writes `value` now.
    ///
    /// The outcome is also recorded in [`SaveState`]; callers that only render
    /// status may ignore the returned result.
    pub async fn save_immediate(&self, value: T) -> Result<R> {
        {
            let mut slot = self.inner.slot.lock();
            if slot.closed {
                return Err(PrefsError::Closed);
            }
            if let Some(previous) = slot.pending.take() {
                previous.timer.abort();
                debug!("pending save cancelled by immediate save");
            }
            slot.generation += 1;
        }
        self.inner.execute(value).await
    }

    /// Writes the pending payload now, if there is one.
    pub async fn flush(&self) -> Option<Result<R>> {
        let value = {
            let mut slot = self.inner.slot.lock();
            let pending = slot.pending.take()?;
            pending.timer.abort();
            slot.generation += 1;
            pending.value
        };
        Some(self.inner.execute(value).await)
    }

    pub fn clear_error(&self) {
        self.inner.slot.lock().error = None;
    }

    pub fn status(&self) -> SaveState {
        let slot = self.inner.slot.lock();
        SaveState {
            is_saving: slot.in_flight > 0,
            last_saved: slot.last_saved,
            error: slot.error.clone(),
        }
    }

    pub fn phase(&self) -> SavePhase {
        let slot = self.inner.slot.lock();
        if slot.in_flight > 0 {
            SavePhase::Saving
        } else if slot.pending.is_some() {
            SavePhase::PendingDebounce
        } else if slot.error.is_some() {
            SavePhase::Error
        } else {
            SavePhase::Idle
        }
    }

    pub fn has_pending(&self) -> bool {
        self.inner.slot.lock().pending.is_some()
    }

    /// Cancels the pending timer and stops reporting outcomes.
    pub fn teardown(&self) {
        let mut slot = self.inner.slot.lock();
        if slot.closed {
            return;
        }
        slot.closed = true;
        if let Some(pending) = slot.pending.take() {
            pending.timer.abort();
            debug!("pending save cancelled by teardown");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.inner.slot.lock().closed
    }
}

impl<T, R> Drop for DebounceCoordinator<T, R> {
    fn drop(&mut self) {
        let mut slot = self.inner.slot.lock();
        slot.closed = true;
        if let Some(pending) = slot.pending.take() {
            pending.timer.abort();
        }
    }
}
