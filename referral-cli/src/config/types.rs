use referral_core::{
    BackendConfig, CoordinatorConfig, LoggingConfig, ReferralConfig, RoutingConfig,
};
use serde::Deserialize;

/// Configuration as stored in TOML files (with optional fields for merging)
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawReferralConfig {
    #[serde(default)]
    pub coordinator: RawCoordinatorConfig,

    #[serde(default)]
    pub backend: RawBackendConfig,

    #[serde(default)]
    pub routing: RawRoutingConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawCoordinatorConfig {
    pub event_capacity: Option<usize>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawBackendConfig {
    pub timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawRoutingConfig {
    pub prefixes: Option<Vec<String>>,
}

impl RawReferralConfig {
    /// Overlay values override base only if explicitly set
    pub fn merge(self, overlay: RawReferralConfig) -> RawReferralConfig {
        RawReferralConfig {
            coordinator: RawCoordinatorConfig {
                event_capacity: overlay
                    .coordinator
                    .event_capacity
                    .or(self.coordinator.event_capacity),
            },
            backend: RawBackendConfig {
                timeout_ms: overlay.backend.timeout_ms.or(self.backend.timeout_ms),
            },
            routing: RawRoutingConfig {
                prefixes: overlay.routing.prefixes.or(self.routing.prefixes),
            },
            logging: LoggingConfig {
                level: overlay.logging.level.or(self.logging.level),
            },
        }
    }

    /// Apply defaults for anything no layer set
    pub fn finalize(self) -> ReferralConfig {
        let coordinator = match self.coordinator.event_capacity {
            Some(event_capacity) => CoordinatorConfig { event_capacity },
            None => CoordinatorConfig::default(),
        };
        let routing = match self.routing.prefixes {
            Some(prefixes) => RoutingConfig { prefixes },
            None => RoutingConfig::default(),
        };

        ReferralConfig {
            coordinator,
            backend: BackendConfig {
                timeout_ms: self.backend.timeout_ms,
            },
            routing,
            logging: self.logging,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(toml: &str) -> RawReferralConfig {
        toml::from_str(toml).unwrap()
    }

    #[test]
    fn test_empty_raw_finalizes_to_defaults() {
        assert_eq!(
            RawReferralConfig::default().finalize(),
            ReferralConfig::default()
        );
    }

    #[test]
    fn test_overlay_wins_when_set() {
        let base = raw("[coordinator]\nevent_capacity = 4\n[logging]\nlevel = \"warn\"\n");
        let overlay = raw("[coordinator]\nevent_capacity = 16\n");

        let config = base.merge(overlay).finalize();

        assert_eq!(config.coordinator.event_capacity, 16);
        assert_eq!(config.logging.level.as_deref(), Some("warn"));
    }

    #[test]
    fn test_unset_overlay_keeps_base() {
        let base = raw("[backend]\ntimeout_ms = 250\n[routing]\nprefixes = [\"app://\"]\n");

        let config = base.merge(RawReferralConfig::default()).finalize();

        assert_eq!(config.backend.timeout_ms, Some(250));
        assert_eq!(config.routing.prefixes, vec!["app://".to_string()]);
    }
}
