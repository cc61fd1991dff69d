//! Launch signals delivered by the host lifecycle
//!
//! Platforms report two distinct hooks: the app's entry point became visible
//! (cold start), and a new launch URI arrived while already running
//! (redelivered). Both normalize into a single [`LaunchSignal`].

pub mod source;

use serde::{Deserialize, Serialize};
use url::Url;

pub use source::LaunchSignalSource;

/// Which lifecycle hook produced a signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalKind {
    ColdStart,
    Redelivered,
}

impl SignalKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ColdStart => "cold_start",
            Self::Redelivered => "redelivered",
        }
    }
}

/// A normalized lifecycle event that may open an attribution session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LaunchSignal {
    /// The app became visible for the first time in this process
    ColdStart { launch_data: Option<Url> },
    /// A new launch URI was delivered to the running app
    Redelivered { launch_data: Url },
}

impl LaunchSignal {
    pub fn cold_start(launch_data: Option<Url>) -> Self {
        Self::ColdStart { launch_data }
    }

    pub fn redelivered(launch_data: Url) -> Self {
        Self::Redelivered { launch_data }
    }

    pub fn kind(&self) -> SignalKind {
        match self {
            Self::ColdStart { .. } => SignalKind::ColdStart,
            Self::Redelivered { .. } => SignalKind::Redelivered,
        }
    }

    /// The URI carried by the signal, if any
    pub fn launch_data(&self) -> Option<&Url> {
        match self {
            Self::ColdStart { launch_data } => launch_data.as_ref(),
            Self::Redelivered { launch_data } => Some(launch_data),
        }
    }

    /// Consume the signal, keeping only its launch data
    pub fn into_launch_data(self) -> Option<Url> {
        match self {
            Self::ColdStart { launch_data } => launch_data,
            Self::Redelivered { launch_data } => Some(launch_data),
        }
    }
}
