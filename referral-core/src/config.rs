//! Configuration for attribution coordination

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Default capacity of the coordinator inbox
pub const DEFAULT_EVENT_CAPACITY: usize = 64;

/// Complete configuration, as read from `config.toml`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferralConfig {
    #[serde(default)]
    pub coordinator: CoordinatorConfig,

    #[serde(default)]
    pub backend: BackendConfig,

    #[serde(default)]
    pub routing: RoutingConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl ReferralConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the runtime cannot honor
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.coordinator.event_capacity == 0 {
            return Err(ConfigError::InvalidValue {
                field: "coordinator.event_capacity",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.backend.timeout_ms == Some(0) {
            return Err(ConfigError::InvalidValue {
                field: "backend.timeout_ms",
                reason: "must be greater than zero when set".to_string(),
            });
        }
        if self.routing.prefixes.iter().any(|p| p.trim().is_empty()) {
            return Err(ConfigError::InvalidValue {
                field: "routing.prefixes",
                reason: "prefixes must not be empty".to_string(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoordinatorConfig {
    /// Capacity of the coordinator's signal inbox
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

fn default_event_capacity() -> usize {
    DEFAULT_EVENT_CAPACITY
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Fail backend calls that take longer than this
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

impl BackendConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingConfig {
    /// URL prefixes recognized as app deep links
    #[serde(default = "default_prefixes")]
    pub prefixes: Vec<String>,
}

fn default_prefixes() -> Vec<String> {
    vec![
        "wisaw://".to_string(),
        "https://link.wisaw.com".to_string(),
        "https://wisaw.com".to_string(),
    ]
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            prefixes: default_prefixes(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default tracing filter directive, e.g. `"info"` or `"referral_core=debug"`
    #[serde(default)]
    pub level: Option<String>,
}
