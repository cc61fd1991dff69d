//! Error types for referral-core

use thiserror::Error;

use crate::session::SessionId;

/// Top-level error type for referral-core
#[derive(Error, Debug)]
pub enum ReferralError {
    #[error("Attribution error: {0}")]
    Attribution(#[from] AttributionError),

    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Route error: {0}")]
    Route(#[from] RouteError),
}

/// Errors raised while running an attribution session
#[derive(Error, Debug)]
pub enum AttributionError {
    #[error("Backend failed to initialize session: {0}")]
    BackendInit(#[from] BackendError),

    #[error("Ignored completion for session {session_id}; pending session is {}", display_current(.current))]
    DuplicateCallbackIgnored {
        session_id: SessionId,
        current: Option<SessionId>,
    },

    #[error("Listener '{listener}' failed: {message}")]
    ListenerDelivery { listener: String, message: String },

    #[error("Session coordinator has stopped")]
    CoordinatorStopped,
}

fn display_current(current: &Option<SessionId>) -> String {
    match current {
        Some(id) => id.to_string(),
        None => "none".to_string(),
    }
}

/// Errors reported by an attribution backend
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    #[error("Session init failed: {0}")]
    InitFailed(String),

    #[error("Session init timed out after {after_ms}ms")]
    Timeout { after_ms: u64 },

    #[error("Backend unavailable: {0}")]
    Unavailable(String),
}

/// Errors from configuration validation
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

/// Errors from deep-link decoding
#[derive(Error, Debug)]
pub enum RouteError {
    #[error("Invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("Invalid payload JSON: {0}")]
    Json(#[from] serde_json::Error),
}
