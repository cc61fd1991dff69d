//! Delivery of session outcomes to application listeners

pub mod dispatcher;
pub mod listener;

// Re-export key types for convenience
pub use dispatcher::{DispatchReport, RegistrationToken, ResultDispatcher};
pub use listener::{ChannelListener, ListenerError, LoggingListener, SessionListener, SessionOutcome};
