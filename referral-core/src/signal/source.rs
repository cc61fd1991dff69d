//! Adapter from host lifecycle hooks to launch signals

use std::sync::atomic::{AtomicBool, Ordering};

use tracing::debug;
use url::Url;

use super::LaunchSignal;

/// Normalizes the host's `onVisible` / `onNewLaunchData` hooks
///
/// The host may call `on_visible` more than once (e.g. every time the entry
/// point is shown again); only the first call per source is a cold start.
#[derive(Debug, Default)]
pub struct LaunchSignalSource {
    cold_started: AtomicBool,
}

impl LaunchSignalSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Entry point became visible. Returns `None` after the first call.
    pub fn on_visible(&self, launch_data: Option<Url>) -> Option<LaunchSignal> {
        if self.cold_started.swap(true, Ordering::SeqCst) {
            debug!(
                launch_data = launch_data.as_ref().map(Url::as_str),
                "Ignoring repeated visible hook; cold start already delivered"
            );
            return None;
        }
        Some(LaunchSignal::cold_start(launch_data))
    }

    /// New launch URI delivered to a running instance
    pub fn on_new_launch_data(&self, launch_data: Url) -> LaunchSignal {
        LaunchSignal::redelivered(launch_data)
    }

    /// Allow the next `on_visible` to produce the cold start again
    pub(crate) fn rearm(&self) {
        self.cold_started.store(false, Ordering::SeqCst);
    }

    /// Whether the cold start signal has been produced
    pub fn has_cold_started(&self) -> bool {
        self.cold_started.load(Ordering::SeqCst)
    }
}
