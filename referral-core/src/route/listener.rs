//! Listener that turns resolved sessions into navigation targets

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::debug;

use super::{DeepLinkTarget, resolve_params};
use crate::dispatch::{ListenerError, SessionListener, SessionOutcome};
use crate::session::SessionId;

/// A target produced for a resolved session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutedLaunch {
    pub session_id: SessionId,
    pub target: DeepLinkTarget,
}

/// Forwards a [`RoutedLaunch`] for every resolved session whose referral
/// parameters name a target. Failed sessions and unroutable params produce
/// nothing.
pub struct RouteListener {
    tx: mpsc::UnboundedSender<RoutedLaunch>,
}

impl RouteListener {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<RoutedLaunch>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl SessionListener for RouteListener {
    fn on_outcome(&self, outcome: &SessionOutcome) -> Result<(), ListenerError> {
        let SessionOutcome::Resolved { session_id, result } = outcome else {
            return Ok(());
        };

        let Some(target) = resolve_params(result) else {
            debug!(session_id = %session_id, "Referring params name no route");
            return Ok(());
        };

        self.tx
            .send(RoutedLaunch {
                session_id: *session_id,
                target,
            })
            .map_err(|_| "route receiver was dropped".into())
    }

    fn name(&self) -> &str {
        "router"
    }
}
