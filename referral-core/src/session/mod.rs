//! Attribution sessions: data model, store, and coordinator

pub mod coordinator;
pub mod state;
pub mod store;

// Re-export key types for convenience
pub use coordinator::{CoordinatorHandle, CoordinatorPhase, CoordinatorStatus, SessionCoordinator};
pub use state::{AttributionSession, ReferringParams, SessionHandle, SessionId, SessionState};
pub use store::{BeginOutcome, SessionStore};
