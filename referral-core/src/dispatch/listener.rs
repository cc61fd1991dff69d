//! Listener trait, outcome payload, and stock listeners

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::session::{AttributionSession, ReferringParams, SessionId, SessionState};

/// Error type listeners return from delivery
pub type ListenerError = Box<dyn std::error::Error + Send + Sync>;

/// Terminal outcome of a session as delivered to listeners
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SessionOutcome {
    Resolved {
        session_id: SessionId,
        result: ReferringParams,
    },
    Failed {
        session_id: SessionId,
        error: String,
    },
}

impl SessionOutcome {
    /// Outcome of a terminal session; `None` while it is still pending
    pub fn from_session(session: &AttributionSession) -> Option<Self> {
        match &session.state {
            SessionState::Pending => None,
            SessionState::Resolved { result } => Some(Self::Resolved {
                session_id: session.id,
                result: result.clone(),
            }),
            SessionState::Failed { error } => Some(Self::Failed {
                session_id: session.id,
                error: error.clone(),
            }),
        }
    }

    pub fn session_id(&self) -> SessionId {
        match self {
            Self::Resolved { session_id, .. } | Self::Failed { session_id, .. } => *session_id,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved { .. })
    }
}

/// Receiver of session outcomes
///
/// Called on the coordinator's event loop; implementations should hand work
/// off rather than block.
pub trait SessionListener: Send + Sync {
    fn on_outcome(&self, outcome: &SessionOutcome) -> Result<(), ListenerError>;

    /// Short name used in logs
    fn name(&self) -> &str {
        "listener"
    }
}

/// Listener that forwards outcomes into an unbounded channel
pub struct ChannelListener {
    tx: mpsc::UnboundedSender<SessionOutcome>,
}

impl ChannelListener {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<SessionOutcome>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl SessionListener for ChannelListener {
    fn on_outcome(&self, outcome: &SessionOutcome) -> Result<(), ListenerError> {
        self.tx
            .send(outcome.clone())
            .map_err(|_| "outcome receiver was dropped".into())
    }

    fn name(&self) -> &str {
        "channel"
    }
}

/// Listener that logs every outcome
#[derive(Debug, Default)]
pub struct LoggingListener;

impl SessionListener for LoggingListener {
    fn on_outcome(&self, outcome: &SessionOutcome) -> Result<(), ListenerError> {
        match outcome {
            SessionOutcome::Resolved { session_id, result } => {
                let params = serde_json::to_string(result)?;
                info!(session_id = %session_id, params = %params, "Referring params");
            }
            SessionOutcome::Failed { session_id, error } => {
                warn!(session_id = %session_id, error = %error, "Attribution unavailable");
            }
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "logging"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionId;

    fn resolved(id: u64) -> SessionOutcome {
        SessionOutcome::Resolved {
            session_id: SessionId::new(id),
            result: [("campaign", "x")].into_iter().collect(),
        }
    }

    #[test]
    fn outcome_from_pending_session_is_none() {
        let session = AttributionSession::pending(SessionId::new(1), None);
        assert!(SessionOutcome::from_session(&session).is_none());
    }

    #[test]
    fn outcome_from_failed_session_carries_error() {
        let mut session = AttributionSession::pending(SessionId::new(4), None);
        session.state = SessionState::Failed {
            error: "offline".to_string(),
        };

        let outcome = SessionOutcome::from_session(&session).unwrap();

        assert_eq!(outcome.session_id(), SessionId::new(4));
        assert!(!outcome.is_resolved());
        assert!(matches!(outcome, SessionOutcome::Failed { error, .. } if error == "offline"));
    }

    #[test]
    fn outcome_serializes_session_id_and_status() {
        let json = serde_json::to_value(resolved(7)).unwrap();
        assert_eq!(json["status"], "resolved");
        assert_eq!(json["session_id"], 7);
        assert_eq!(json["result"]["campaign"], "x");
    }

    #[test]
    fn channel_listener_forwards_outcomes() {
        let (listener, mut rx) = ChannelListener::new();

        listener.on_outcome(&resolved(1)).unwrap();

        assert_eq!(rx.try_recv().unwrap(), resolved(1));
    }

    #[test]
    fn channel_listener_errors_when_receiver_dropped() {
        let (listener, rx) = ChannelListener::new();
        drop(rx);

        assert!(listener.on_outcome(&resolved(1)).is_err());
    }

    #[test]
    fn logging_listener_accepts_both_outcomes() {
        let listener = LoggingListener;
        assert!(listener.on_outcome(&resolved(1)).is_ok());
        assert!(
            listener
                .on_outcome(&SessionOutcome::Failed {
                    session_id: SessionId::new(2),
                    error: "offline".to_string(),
                })
                .is_ok()
        );
    }
}
