//! The operating environment's light/dark preference as a live signal.
//!
//! [`ColorSchemeSignal`] wraps a `tokio::sync::watch` channel. Hosts push
//! changes with [`set`](ColorSchemeSignal::set) (for example from an OS
//! notification hook) or let [`spawn_poller`](ColorSchemeSignal::spawn_poller)
//! re-run detection periodically. Consumers hold a [`ColorSchemeWatch`].
//!
//! Detection goes through a replaceable detector so tests never depend on the
//! machine they run on.

use crate::model::ResolvedTheme;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

pub type ColorSchemeDetector = fn() -> ResolvedTheme;

/// Asks the OS via `dark-light`.
pub fn detect_system_color_scheme() -> ResolvedTheme {
    match dark_light::detect() {
        dark_light::Mode::Light => ResolvedTheme::Light,
        dark_light::Mode::Dark => ResolvedTheme::Dark,
    }
}

pub type ColorSchemeWatch = watch::Receiver<ResolvedTheme>;

#[derive(Debug, Clone)]
pub struct ColorSchemeSignal {
    sender: Arc<watch::Sender<ResolvedTheme>>,
    detector: ColorSchemeDetector,
}

impl ColorSchemeSignal {
    /// A signal seeded from the OS.
    pub fn detect() -> Self {
        Self::with_detector(detect_system_color_scheme)
    }

    /// A signal with a custom detector, seeded from it.
    pub fn with_detector(detector: ColorSchemeDetector) -> Self {
        let (sender, _) = watch::channel(detector());
        Self {
            sender: Arc::new(sender),
            detector,
        }
    }

    /// A fixed starting value; detection reports the same value until `set`.
    pub fn fixed(initial: ResolvedTheme) -> Self {
        let (sender, _) = watch::channel(initial);
        let detector: ColorSchemeDetector = match initial {
            ResolvedTheme::Light => || ResolvedTheme::Light,
            ResolvedTheme::Dark => || ResolvedTheme::Dark,
        };
        Self {
            sender: Arc::new(sender),
            detector,
        }
    }

    pub fn current(&self) -> ResolvedTheme {
        *self.sender.borrow()
    }

    /// Publishes a new value; subscribers are only notified on actual change.
    pub fn set(&self, scheme: ResolvedTheme) {
        let changed = self.sender.send_if_modified(|current| {
            if *current == scheme {
                false
            } else {
                *current = scheme;
                true
            }
        });
        if changed {
            debug!(%scheme, "system color scheme changed");
        }
    }

    /// Re-runs detection and publishes the result.
    pub fn refresh(&self) {
        self.set((self.detector)());
    }

    pub fn subscribe(&self) -> ColorSchemeWatch {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Re-detects every `every` until the returned handle is aborted.
    pub fn spawn_poller(&self, every: Duration) -> JoinHandle<()> {
        let signal = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            loop {
                ticker.tick().await;
                signal.refresh();
            }
        })
    }
}
