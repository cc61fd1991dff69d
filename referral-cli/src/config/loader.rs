use super::types::RawReferralConfig;
use anyhow::{Context, Result};
use directories::ProjectDirs;
use referral_core::ReferralConfig;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Environment variable naming an alternative project config directory
pub const PROJECT_CONFIG_DIR_ENV: &str = "REFERRAL_PROJECT_CONFIG_DIR";

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration
    ///
    /// An explicit path replaces the layered lookup and must exist.
    pub fn load(explicit: Option<&Path>) -> Result<ReferralConfig> {
        match explicit {
            Some(path) => Self::load_from_path(path),
            None => Self::load_layers(Self::user_config_path(), Self::project_config_path()),
        }
    }

    /// Load a single config file
    pub fn load_from_path(path: &Path) -> Result<ReferralConfig> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        ReferralConfig::from_toml_str(&contents)
            .with_context(|| format!("Invalid config {}", path.display()))
    }

    /// Merge user config then project config, later layers overriding
    fn load_layers(user: Option<PathBuf>, project: PathBuf) -> Result<ReferralConfig> {
        let mut raw = RawReferralConfig::default();

        // Layer 1: User config
        if let Some(user_path) = user
            && user_path.exists()
        {
            raw = raw.merge(Self::read_raw(&user_path)?);
        }

        // Layer 2: Project config
        if project.exists() {
            raw = raw.merge(Self::read_raw(&project)?);
        }

        let config = raw.finalize();
        config.validate()?;
        Ok(config)
    }

    fn read_raw(path: &Path) -> Result<RawReferralConfig> {
        debug!(path = %path.display(), "Reading config layer");
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        toml::from_str(&contents).with_context(|| format!("Invalid config {}", path.display()))
    }

    /// Get user config path (platform-specific)
    pub fn user_config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "referral").map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Get project config path
    /// Can be overridden with REFERRAL_PROJECT_CONFIG_DIR env var
    pub fn project_config_path() -> PathBuf {
        if let Ok(dir) = std::env::var(PROJECT_CONFIG_DIR_ENV) {
            PathBuf::from(dir).join("config.toml")
        } else {
            PathBuf::from(".referral/config.toml")
        }
    }
}
