//! SessionCoordinator decides, per launch signal, whether to open a session
//!
//! The coordinator runs as a single task. Launch signals arrive on its inbox
//! from [`CoordinatorHandle`]s; backend calls run as spawned tasks that post
//! their single result back to the same task, so all state changes happen in
//! one place and in arrival order.
//!
//! ```text
//!            signal (no session pending)
//!   Idle ─────────────────────────────────▶ AwaitingResult
//!    ▲                                        │  same launch data: coalesced
//!    │        completion (dispatch, then      │  other launch data: queued
//!    └──────── re-drive queued signal) ◀──────┘
//! ```

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::backend::AttributionBackend;
use crate::config::CoordinatorConfig;
use crate::dispatch::{ResultDispatcher, SessionOutcome};
use crate::error::{AttributionError, BackendError};
use crate::signal::{LaunchSignal, LaunchSignalSource};

use super::state::{ReferringParams, SessionHandle, SessionId};
use super::store::{BeginOutcome, SessionStore};

/// Coarse coordinator state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoordinatorPhase {
    Idle,
    AwaitingResult,
}

/// Diagnostic snapshot of the coordinator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoordinatorStatus {
    pub phase: CoordinatorPhase,
    pub in_flight: Option<SessionId>,
    pub queued: Option<LaunchSignal>,
}

enum CoordinatorEvent {
    Signal(LaunchSignal),
    Status(oneshot::Sender<CoordinatorStatus>),
    Shutdown,
}

struct Completion {
    handle: SessionHandle,
    result: Result<ReferringParams, BackendError>,
}

enum Phase {
    Idle,
    AwaitingResult { handle: SessionHandle },
}

/// State machine that opens, coalesces, and queues attribution sessions
pub struct SessionCoordinator {
    store: Arc<SessionStore>,
    dispatcher: Arc<ResultDispatcher>,
    backend: Arc<dyn AttributionBackend>,
    phase: Phase,
    queued: Option<LaunchSignal>,
    inbox: mpsc::Receiver<CoordinatorEvent>,
    inbox_closed: bool,
    completion_tx: mpsc::UnboundedSender<Completion>,
    completion_rx: mpsc::UnboundedReceiver<Completion>,
    shutdown: CancellationToken,
}

impl SessionCoordinator {
    /// Create a coordinator and the handle used to feed it
    ///
    /// The store and dispatcher are owned by the caller and may be shared
    /// with diagnostics and listener registration code.
    pub fn new(
        store: Arc<SessionStore>,
        dispatcher: Arc<ResultDispatcher>,
        backend: Arc<dyn AttributionBackend>,
        config: &CoordinatorConfig,
    ) -> (Self, CoordinatorHandle) {
        let (tx, inbox) = mpsc::channel(config.event_capacity.max(1));
        let (completion_tx, completion_rx) = mpsc::unbounded_channel();
        let shutdown = CancellationToken::new();

        let coordinator = Self {
            store,
            dispatcher,
            backend,
            phase: Phase::Idle,
            queued: None,
            inbox,
            inbox_closed: false,
            completion_tx,
            completion_rx,
            shutdown: shutdown.clone(),
        };
        let handle = CoordinatorHandle {
            tx,
            source: Arc::new(LaunchSignalSource::new()),
            shutdown,
        };
        (coordinator, handle)
    }

    /// Run the event loop
    ///
    /// Returns after `shutdown()`, after cancellation, or once every handle
    /// is dropped and no session is pending or queued.
    pub async fn run(mut self) {
        info!(backend = self.backend.name(), "Session coordinator started");

        loop {
            if self.inbox_closed && self.is_settled() {
                debug!("All handles dropped and no work left");
                break;
            }

            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    debug!("Session coordinator cancelled");
                    break;
                }
                Some(completion) = self.completion_rx.recv() => {
                    self.handle_completion(completion).await;
                }
                event = self.inbox.recv(), if !self.inbox_closed => match event {
                    Some(CoordinatorEvent::Signal(signal)) => self.handle_signal(signal).await,
                    Some(CoordinatorEvent::Status(reply)) => {
                        let _ = reply.send(self.status());
                    }
                    Some(CoordinatorEvent::Shutdown) => break,
                    None => self.inbox_closed = true,
                },
            }
        }

        info!("Session coordinator stopped");
    }

    /// Current coordinator snapshot
    pub fn status(&self) -> CoordinatorStatus {
        let (phase, in_flight) = match &self.phase {
            Phase::Idle => (CoordinatorPhase::Idle, None),
            Phase::AwaitingResult { handle } => {
                (CoordinatorPhase::AwaitingResult, Some(handle.id()))
            }
        };
        CoordinatorStatus {
            phase,
            in_flight,
            queued: self.queued.clone(),
        }
    }

    fn is_settled(&self) -> bool {
        matches!(self.phase, Phase::Idle) && self.queued.is_none()
    }

    async fn handle_signal(&mut self, signal: LaunchSignal) {
        if let Phase::AwaitingResult { handle } = &self.phase {
            if signal.launch_data() == handle.launch_data() {
                debug!(
                    session_id = %handle.id(),
                    kind = signal.kind().as_str(),
                    "Coalesced launch signal into in-flight session"
                );
                return;
            }

            debug!(
                session_id = %handle.id(),
                kind = signal.kind().as_str(),
                launch_data = signal.launch_data().map(Url::as_str),
                "Queued launch signal until in-flight session completes"
            );
            if let Some(superseded) = self.queued.replace(signal) {
                debug!(
                    launch_data = superseded.launch_data().map(Url::as_str),
                    "Superseded previously queued launch signal"
                );
            }
            return;
        }

        let launch_data = signal.into_launch_data();
        match self.store.try_begin_session(launch_data).await {
            BeginOutcome::Started(handle) => {
                self.start_backend_call(handle.clone());
                self.phase = Phase::AwaitingResult { handle };
            }
            BeginOutcome::AlreadyPending(id) => {
                warn!(
                    session_id = %id,
                    "Store already has a pending session not opened by this coordinator; ignoring signal"
                );
            }
        }
    }

    fn start_backend_call(&self, handle: SessionHandle) {
        let backend = Arc::clone(&self.backend);
        let completion_tx = self.completion_tx.clone();
        let launch_data = handle.launch_data().cloned();

        tokio::spawn(async move {
            let call = tokio::spawn(async move { backend.init_session(launch_data).await });
            // A panicking backend still owes the session its single completion.
            let result = match call.await {
                Ok(result) => result,
                Err(e) if e.is_panic() => {
                    error!(session_id = %handle.id(), "Backend call panicked");
                    Err(BackendError::Unavailable("backend call panicked".to_string()))
                }
                Err(_) => Err(BackendError::Unavailable(
                    "backend call was cancelled".to_string(),
                )),
            };
            // Receiver is gone only if the coordinator stopped.
            let _ = completion_tx.send(Completion { handle, result });
        });
    }

    async fn handle_completion(&mut self, completion: Completion) {
        let Completion { handle, result } = completion;

        let (finished, failure) = match result {
            Ok(params) => (self.store.complete(&handle, params).await, None),
            Err(e) => (self.store.fail(&handle, &e).await, Some(e)),
        };

        // The store has already logged stale completions.
        let Ok(session) = finished else {
            return;
        };

        match failure {
            Some(e) => {
                let err = AttributionError::BackendInit(e);
                warn!(session_id = %session.id, error = %err, "Attribution session failed");
            }
            None => info!(session_id = %session.id, "Attribution session resolved"),
        }

        if matches!(&self.phase, Phase::AwaitingResult { handle: h } if h.id() == session.id) {
            self.phase = Phase::Idle;
        }

        if let Some(outcome) = SessionOutcome::from_session(&session) {
            self.dispatcher.dispatch(&outcome);
        }

        if let Some(next) = self.queued.take() {
            debug!(kind = next.kind().as_str(), "Re-driving queued launch signal");
            self.handle_signal(next).await;
        }
    }
}

/// Cloneable entry point for host lifecycle hooks
#[derive(Clone)]
pub struct CoordinatorHandle {
    tx: mpsc::Sender<CoordinatorEvent>,
    source: Arc<LaunchSignalSource>,
    shutdown: CancellationToken,
}

impl CoordinatorHandle {
    /// Host hook: the app's entry point became visible
    ///
    /// Returns `false` when the call was not the first and was ignored.
    pub async fn on_visible(&self, launch_data: Option<Url>) -> Result<bool, AttributionError> {
        let Some(signal) = self.source.on_visible(launch_data) else {
            return Ok(false);
        };
        if let Err(e) = self.signal(signal).await {
            // Undelivered, so the next visible hook is still the cold start.
            self.source.rearm();
            return Err(e);
        }
        Ok(true)
    }

    /// Host hook: a new launch URI arrived while running
    pub async fn on_new_launch_data(&self, launch_data: Url) -> Result<(), AttributionError> {
        let signal = self.source.on_new_launch_data(launch_data);
        self.signal(signal).await
    }

    /// Deliver an already-normalized signal
    pub async fn signal(&self, signal: LaunchSignal) -> Result<(), AttributionError> {
        self.send(CoordinatorEvent::Signal(signal)).await
    }

    /// Snapshot taken after every event sent before this call
    pub async fn status(&self) -> Result<CoordinatorStatus, AttributionError> {
        let (reply, rx) = oneshot::channel();
        self.send(CoordinatorEvent::Status(reply)).await?;
        rx.await.map_err(|_| AttributionError::CoordinatorStopped)
    }

    /// Stop the loop once events sent before this call are handled
    pub async fn shutdown(&self) -> Result<(), AttributionError> {
        self.send(CoordinatorEvent::Shutdown).await
    }

    /// Token that stops the loop immediately when cancelled
    pub fn cancellation_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    async fn send(&self, event: CoordinatorEvent) -> Result<(), AttributionError> {
        self.tx
            .send(event)
            .await
            .map_err(|_| AttributionError::CoordinatorStopped)
    }
}
