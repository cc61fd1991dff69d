//! Attribution session data model

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

/// Process-unique, monotonically increasing session identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(u64);

impl SessionId {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Referral parameters returned by the backend for a resolved session
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReferringParams(BTreeMap<String, String>);

impl ReferringParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ReferringParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl From<BTreeMap<String, String>> for ReferringParams {
    fn from(map: BTreeMap<String, String>) -> Self {
        Self(map)
    }
}

/// State of an attribution session
///
/// `Resolved` and `Failed` are terminal; a session leaves `Pending` exactly once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SessionState {
    /// Backend request in flight
    Pending,
    /// Backend returned referral parameters
    Resolved { result: ReferringParams },
    /// Backend reported an error
    Failed { error: String },
}

impl SessionState {
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }

    pub fn is_terminal(&self) -> bool {
        !self.is_pending()
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Resolved { .. } => "Resolved",
            Self::Failed { .. } => "Failed",
        }
    }
}

/// One attempt to resolve where a launch came from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributionSession {
    pub id: SessionId,
    pub state: SessionState,
    pub launch_data: Option<Url>,
    pub opened_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl AttributionSession {
    pub(crate) fn pending(id: SessionId, launch_data: Option<Url>) -> Self {
        Self {
            id,
            state: SessionState::Pending,
            launch_data,
            opened_at: Utc::now(),
            completed_at: None,
        }
    }

    /// Referral parameters, present only once resolved
    pub fn result(&self) -> Option<&ReferringParams> {
        match &self.state {
            SessionState::Resolved { result } => Some(result),
            _ => None,
        }
    }

    /// Error description, present only once failed
    pub fn error(&self) -> Option<&str> {
        match &self.state {
            SessionState::Failed { error } => Some(error),
            _ => None,
        }
    }
}

/// Proof of ownership of the pending session, returned when one is opened
///
/// Completion must present the handle; a handle for any other session is
/// rejected by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionHandle {
    id: SessionId,
    launch_data: Option<Url>,
}

impl SessionHandle {
    pub(crate) fn new(id: SessionId, launch_data: Option<Url>) -> Self {
        Self { id, launch_data }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn launch_data(&self) -> Option<&Url> {
        self.launch_data.as_ref()
    }
}
