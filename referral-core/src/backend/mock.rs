//! Scripted backend for tests and scenario replay
//!
//! Queue responses with `queue_response()` / `queue_error()`; each call to
//! `init_session()` consumes one. A backend built with [`MockBackend::manual`]
//! instead hands calls without a queued response to the driver as
//! [`PendingInit`]s, so the driver decides when (and how) each call completes.

use std::collections::VecDeque;

use async_trait::async_trait;
use tokio::sync::{Mutex, mpsc, oneshot};
use url::Url;

use super::traits::AttributionBackend;
use crate::error::BackendError;
use crate::session::ReferringParams;

type InitResult = Result<ReferringParams, BackendError>;

/// A backend call awaiting a scripted reply
///
/// Dropping it without replying fails the call with `BackendError::Unavailable`.
#[derive(Debug)]
pub struct PendingInit {
    launch_data: Option<Url>,
    responder: oneshot::Sender<InitResult>,
}

impl PendingInit {
    pub fn launch_data(&self) -> Option<&Url> {
        self.launch_data.as_ref()
    }

    /// Complete the call with referral parameters
    pub fn resolve(self, params: ReferringParams) {
        // The caller may have gone away; nothing to report to.
        let _ = self.responder.send(Ok(params));
    }

    /// Complete the call with an error
    pub fn fail(self, error: BackendError) {
        let _ = self.responder.send(Err(error));
    }
}

/// Mock implementation of AttributionBackend
pub struct MockBackend {
    responses: Mutex<VecDeque<InitResult>>,
    calls: Mutex<Vec<Option<Url>>>,
    pending_tx: Option<mpsc::UnboundedSender<PendingInit>>,
}

impl MockBackend {
    /// Backend that answers only from queued responses
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
            pending_tx: None,
        }
    }

    /// Backend that hands unqueued calls to the returned receiver
    pub fn manual() -> (Self, mpsc::UnboundedReceiver<PendingInit>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let backend = Self {
            pending_tx: Some(tx),
            ..Self::new()
        };
        (backend, rx)
    }

    /// Queue a successful response for the next call
    pub async fn queue_response(&self, params: ReferringParams) {
        self.responses.lock().await.push_back(Ok(params));
    }

    /// Queue a failure for the next call
    pub async fn queue_error(&self, error: BackendError) {
        self.responses.lock().await.push_back(Err(error));
    }

    /// Launch data of every call made so far, in order
    pub async fn calls(&self) -> Vec<Option<Url>> {
        self.calls.lock().await.clone()
    }

    pub async fn call_count(&self) -> usize {
        self.calls.lock().await.len()
    }

    pub async fn queued_response_count(&self) -> usize {
        self.responses.lock().await.len()
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AttributionBackend for MockBackend {
    async fn init_session(&self, launch_data: Option<Url>) -> InitResult {
        self.calls.lock().await.push(launch_data.clone());

        if let Some(response) = self.responses.lock().await.pop_front() {
            return response;
        }

        let Some(pending_tx) = &self.pending_tx else {
            return Err(BackendError::InitFailed(
                "No queued response in MockBackend".to_string(),
            ));
        };

        let (responder, rx) = oneshot::channel();
        pending_tx
            .send(PendingInit {
                launch_data,
                responder,
            })
            .map_err(|_| BackendError::Unavailable("mock driver is gone".to_string()))?;

        rx.await
            .map_err(|_| BackendError::Unavailable("pending init was dropped".to_string()))?
    }

    fn name(&self) -> &str {
        "mock"
    }
}
