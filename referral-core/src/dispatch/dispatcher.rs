//! ResultDispatcher fans session outcomes out to registered listeners
//!
//! Listeners are held weakly: dropping the last `Arc` of a listener stops
//! delivery to it even if it was never unregistered. Each dispatch works on a
//! snapshot of the registrations taken when it starts, and no lock is held
//! while a listener runs, so listeners may register or unregister from inside
//! `on_outcome`.

use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};

use tracing::{debug, error};

use super::listener::{SessionListener, SessionOutcome};
use crate::error::AttributionError;

/// Identifies one registration for later removal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegistrationToken(u64);

/// Summary of one dispatch
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DispatchReport {
    /// Listeners that accepted the outcome
    pub delivered: usize,
    /// Listeners that returned an error or panicked
    pub failed: usize,
    /// Registrations whose listener had already been dropped
    pub dropped: usize,
}

struct Registration {
    token: RegistrationToken,
    listener: Weak<dyn SessionListener>,
}

/// Owner of listener registrations
#[derive(Default)]
pub struct ResultDispatcher {
    registrations: RwLock<Vec<Registration>>,
    next_token: AtomicU64,
}

impl ResultDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener; the dispatcher keeps only a weak reference
    pub fn register<L: SessionListener + 'static>(&self, listener: &Arc<L>) -> RegistrationToken {
        let token = RegistrationToken(self.next_token.fetch_add(1, Ordering::SeqCst));
        let weak: Weak<L> = Arc::downgrade(listener);
        let weak: Weak<dyn SessionListener> = weak;
        self.write_registrations().push(Registration {
            token,
            listener: weak,
        });
        debug!(listener = listener.name(), token = token.0, "Listener registered");
        token
    }

    /// Remove a registration. Unknown or already-removed tokens are ignored.
    pub fn unregister(&self, token: RegistrationToken) {
        self.write_registrations()
            .retain(|registration| registration.token != token);
    }

    /// Number of registrations, including ones whose listener was dropped
    /// but not yet pruned
    pub fn listener_count(&self) -> usize {
        self.read_registrations().len()
    }

    /// Deliver an outcome to every listener registered when this call starts
    ///
    /// A listener that errors or panics is logged and skipped; the remaining
    /// listeners still receive the outcome.
    pub fn dispatch(&self, outcome: &SessionOutcome) -> DispatchReport {
        let snapshot: Vec<(RegistrationToken, Weak<dyn SessionListener>)> = self
            .read_registrations()
            .iter()
            .map(|registration| (registration.token, registration.listener.clone()))
            .collect();

        let mut report = DispatchReport::default();

        for (token, weak) in snapshot {
            let Some(listener) = weak.upgrade() else {
                report.dropped += 1;
                continue;
            };

            let result =
                std::panic::catch_unwind(AssertUnwindSafe(|| listener.on_outcome(outcome)));

            let failure = match result {
                Ok(Ok(())) => None,
                Ok(Err(e)) => Some(e.to_string()),
                Err(_) => Some("listener panicked".to_string()),
            };

            match failure {
                None => report.delivered += 1,
                Some(message) => {
                    let err = AttributionError::ListenerDelivery {
                        listener: listener.name().to_string(),
                        message,
                    };
                    error!(
                        session_id = %outcome.session_id(),
                        token = token.0,
                        error = %err,
                        "Listener delivery failed"
                    );
                    report.failed += 1;
                }
            }
        }

        if report.dropped > 0 {
            self.write_registrations()
                .retain(|registration| registration.listener.strong_count() > 0);
        }

        debug!(
            session_id = %outcome.session_id(),
            delivered = report.delivered,
            failed = report.failed,
            dropped = report.dropped,
            "Outcome dispatched"
        );
        report
    }

    // Writers only push or retain, so a poisoned list is still well formed.
    fn read_registrations(&self) -> RwLockReadGuard<'_, Vec<Registration>> {
        self.registrations
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn write_registrations(&self) -> RwLockWriteGuard<'_, Vec<Registration>> {
        self.registrations
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
