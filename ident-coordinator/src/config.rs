//! Configuration loading for the coordinator.
//!
//! Configuration is loaded from a TOML file (default: `ident.toml`).
//! Every field has a default, so an empty file (or no file at all) yields
//! a working configuration.

use ident_core::PromotionPolicy;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration for the identity-session subsystem.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Capability token configuration.
    pub tokens: TokensConfig,
    /// Typing presence configuration.
    pub presence: PresenceConfig,
    /// Group authorization policy.
    pub policy: PolicyConfig,
    /// Background sweep configuration.
    pub cleanup: CleanupConfig,
}

/// Capability token lifetimes.
#[derive(Debug, Clone, Deserialize)]
pub struct TokensConfig {
    /// Device-pairing token TTL in seconds (default: 300 = 5 minutes).
    #[serde(default = "default_pairing_ttl")]
    pub pairing_ttl_secs: u64,
    /// Group-invitation token TTL in seconds (default: 7 days).
    #[serde(default = "default_invitation_ttl")]
    pub invitation_ttl_secs: u64,
}

/// Typing presence tuning.
#[derive(Debug, Clone, Deserialize)]
pub struct PresenceConfig {
    /// Typing indicator window in milliseconds (default: 2000).
    #[serde(default = "default_typing_window")]
    pub typing_window_ms: u64,
}

/// Group authorization policy.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PolicyConfig {
    /// Who may promote members to admin (default: creator-or-elevated-admin).
    #[serde(default)]
    pub promotion: PromotionPolicy,
}

/// Background sweep configuration.
///
/// The engines are correct without the sweep (expiry is checked lazily on
/// every read), so this only bounds memory held by dead entries.
#[derive(Debug, Clone, Deserialize)]
pub struct CleanupConfig {
    /// Sweep interval in seconds (default: 60).
    #[serde(default = "default_cleanup_interval")]
    pub interval_secs: u64,
    /// Enable the sweep task (default: true).
    #[serde(default = "default_cleanup_enabled")]
    pub enabled: bool,
}

// Default value functions
fn default_pairing_ttl() -> u64 {
    300 // 5 minutes
}

fn default_invitation_ttl() -> u64 {
    7 * 24 * 60 * 60 // 7 days in seconds
}

fn default_typing_window() -> u64 {
    2000
}

fn default_cleanup_interval() -> u64 {
    60
}

fn default_cleanup_enabled() -> bool {
    true
}

impl Default for TokensConfig {
    fn default() -> Self {
        Self {
            pairing_ttl_secs: default_pairing_ttl(),
            invitation_ttl_secs: default_invitation_ttl(),
        }
    }
}

impl Default for PresenceConfig {
    fn default() -> Self {
        Self {
            typing_window_ms: default_typing_window(),
        }
    }
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_cleanup_interval(),
            enabled: default_cleanup_enabled(),
        }
    }
}

impl TokensConfig {
    /// Pairing token TTL as a [`Duration`].
    pub fn pairing_ttl(&self) -> Duration {
        Duration::from_secs(self.pairing_ttl_secs)
    }

    /// Invitation token TTL as a [`Duration`].
    pub fn invitation_ttl(&self) -> Duration {
        Duration::from_secs(self.invitation_ttl_secs)
    }
}

impl PresenceConfig {
    /// Typing window as a [`Duration`].
    pub fn typing_window(&self) -> Duration {
        Duration::from_millis(self.typing_window_ms)
    }
}

impl Config {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// Failed to parse configuration file.
    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying TOML parse error.
        source: toml::de::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_config_is_valid() {
        let config = Config::default();
        assert_eq!(config.tokens.pairing_ttl_secs, 300);
        assert_eq!(config.tokens.invitation_ttl_secs, 604_800);
        assert_eq!(config.presence.typing_window_ms, 2000);
        assert_eq!(config.policy.promotion, PromotionPolicy::CreatorOrElevatedAdmin);
        assert!(config.cleanup.enabled);
    }

    #[test]
    fn config_from_toml_string() {
        let toml = r#"
[tokens]
pairing_ttl_secs = 60

[presence]
typing_window_ms = 500

[policy]
promotion = "creator-only"

[cleanup]
enabled = false
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.tokens.pairing_ttl_secs, 60);
        // Unspecified fields fall back to defaults.
        assert_eq!(config.tokens.invitation_ttl_secs, 604_800);
        assert_eq!(config.presence.typing_window_ms, 500);
        assert_eq!(config.policy.promotion, PromotionPolicy::CreatorOnly);
        assert!(!config.cleanup.enabled);
        assert_eq!(config.cleanup.interval_secs, 60);
    }

    #[test]
    fn empty_toml_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.tokens.pairing_ttl_secs, 300);
    }

    #[test]
    fn from_file_reads_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[tokens]\npairing_ttl_secs = 120").unwrap();
        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.tokens.pairing_ttl_secs, 120);
    }

    #[test]
    fn from_file_missing_is_read_error() {
        let err = Config::from_file(std::path::Path::new("/nonexistent/ident.toml"));
        assert!(matches!(err, Err(ConfigError::ReadError { .. })));
    }
}
