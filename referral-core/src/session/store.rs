//! SessionStore holds the current or most recently completed session
//!
//! At most one session is `Pending` at any time. Completions are accepted
//! only from the handle of that pending session; anything else is a stale or
//! duplicate delivery from the backend and is dropped.

use chrono::Utc;
use tokio::sync::RwLock;
use tracing::{debug, info};
use url::Url;

use crate::error::{AttributionError, BackendError};

use super::state::{AttributionSession, ReferringParams, SessionHandle, SessionId, SessionState};

/// Result of trying to open a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BeginOutcome {
    /// A new pending session was created
    Started(SessionHandle),
    /// A session is already pending; nothing was changed
    AlreadyPending(SessionId),
}

#[derive(Debug, Default)]
struct StoreInner {
    last_id: u64,
    current: Option<AttributionSession>,
}

/// Owner of attribution session state
///
/// Constructed once at startup and shared by reference with the coordinator.
#[derive(Debug, Default)]
pub struct SessionStore {
    inner: RwLock<StoreInner>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a new pending session unless one is already pending
    pub async fn try_begin_session(&self, launch_data: Option<Url>) -> BeginOutcome {
        let mut inner = self.inner.write().await;

        if let Some(current) = inner.current.as_ref().filter(|s| s.state.is_pending()) {
            return BeginOutcome::AlreadyPending(current.id);
        }

        inner.last_id += 1;
        let id = SessionId::new(inner.last_id);
        inner.current = Some(AttributionSession::pending(id, launch_data.clone()));

        info!(
            session_id = %id,
            launch_data = launch_data.as_ref().map(Url::as_str),
            "Attribution session opened"
        );
        BeginOutcome::Started(SessionHandle::new(id, launch_data))
    }

    /// Resolve the pending session referenced by `handle`
    pub async fn complete(
        &self,
        handle: &SessionHandle,
        result: ReferringParams,
    ) -> Result<AttributionSession, AttributionError> {
        self.finish(handle, SessionState::Resolved { result }).await
    }

    /// Fail the pending session referenced by `handle`
    pub async fn fail(
        &self,
        handle: &SessionHandle,
        error: &BackendError,
    ) -> Result<AttributionSession, AttributionError> {
        self.finish(
            handle,
            SessionState::Failed {
                error: error.to_string(),
            },
        )
        .await
    }

    /// Snapshot of the current or last completed session
    pub async fn current(&self) -> Option<AttributionSession> {
        self.inner.read().await.current.clone()
    }

    /// Id of the pending session, if any
    pub async fn pending_id(&self) -> Option<SessionId> {
        self.inner
            .read()
            .await
            .current
            .as_ref()
            .filter(|s| s.state.is_pending())
            .map(|s| s.id)
    }

    async fn finish(
        &self,
        handle: &SessionHandle,
        state: SessionState,
    ) -> Result<AttributionSession, AttributionError> {
        let mut inner = self.inner.write().await;

        let session = match inner.current.as_mut() {
            Some(session) if session.id == handle.id() && session.state.is_pending() => session,
            other => {
                let current = other.filter(|s| s.state.is_pending()).map(|s| s.id);
                debug!(
                    session_id = %handle.id(),
                    pending = ?current,
                    "Dropping completion for a session that is not pending"
                );
                return Err(AttributionError::DuplicateCallbackIgnored {
                    session_id: handle.id(),
                    current,
                });
            }
        };

        session.state = state;
        session.completed_at = Some(Utc::now());
        debug!(session_id = %session.id, state = session.state.name(), "Session reached terminal state");
        Ok(session.clone())
    }
}
