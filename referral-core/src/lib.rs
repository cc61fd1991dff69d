//! referral-core: attribution session lifecycle coordination
//!
//! This crate decides, on every launch of the app, whether an attribution
//! session must be opened with the backend, and delivers each session's
//! outcome to the rest of the app exactly once:
//!
//! - **Launch signals** - [`LaunchSignal`] normalizes cold starts and
//!   redelivered launch URIs
//! - **Session store** - [`SessionStore`] holds at most one pending session
//! - **Coordinator** - [`SessionCoordinator`] coalesces duplicate signals and
//!   queues new deep links while a session is in flight
//! - **Dispatch** - [`ResultDispatcher`] fans outcomes out to listeners
//! - **Routing** - [`LinkResolver`] and [`RouteListener`] map links and
//!   referral parameters to in-app targets
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use referral_core::backend::MockBackend;
//! use referral_core::{
//!     ChannelListener, CoordinatorConfig, ResultDispatcher, SessionCoordinator, SessionStore,
//! };
//!
//! async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = Arc::new(SessionStore::new());
//!     let dispatcher = Arc::new(ResultDispatcher::new());
//!     let (listener, mut outcomes) = ChannelListener::new();
//!     let listener = Arc::new(listener);
//!     dispatcher.register(&listener);
//!
//!     let backend = Arc::new(MockBackend::new());
//!     let (coordinator, handle) =
//!         SessionCoordinator::new(store, dispatcher, backend, &CoordinatorConfig::default());
//!     tokio::spawn(coordinator.run());
//!
//!     handle.on_visible(None).await?;
//!     if let Some(outcome) = outcomes.recv().await {
//!         println!("session {} finished", outcome.session_id());
//!     }
//!     Ok(())
//! }
//! ```

pub mod backend;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod route;
pub mod session;
pub mod signal;

// Re-export key types for convenience
pub use backend::{AttributionBackend, MockBackend, PendingInit, TimeoutBackend};
pub use config::{BackendConfig, CoordinatorConfig, LoggingConfig, ReferralConfig, RoutingConfig};
pub use dispatch::{
    ChannelListener, DispatchReport, LoggingListener, RegistrationToken, ResultDispatcher,
    SessionListener, SessionOutcome,
};
pub use error::{AttributionError, BackendError, ConfigError, ReferralError, RouteError};
pub use route::{DeepLinkTarget, LinkResolver, RouteListener, RoutedLaunch, resolve_params};
pub use session::{
    AttributionSession, BeginOutcome, CoordinatorHandle, CoordinatorPhase, CoordinatorStatus,
    ReferringParams, SessionCoordinator, SessionHandle, SessionId, SessionState, SessionStore,
};
pub use signal::{LaunchSignal, LaunchSignalSource, SignalKind};
