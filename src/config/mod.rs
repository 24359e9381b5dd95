//! Configuration loading for the repo-signals service.
//!
//! Loads layered `.env` files and environment variables prefixed with
//! `REPO_SIGNALS_`, producing a typed [`AppConfig`].

use std::{collections::BTreeMap, env, net::SocketAddr, path::PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

const ENV_PREFIX: &str = "REPO_SIGNALS_";

/// Application configuration derived from `REPO_SIGNALS_*` environment variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct AppConfig {
    #[serde(default = "default_profile")]
    pub profile: String,
    #[serde(default = "default_api_bind_addr")]
    pub api_bind_addr: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_log_format")]
    pub log_format: String,
    #[serde(default = "default_database_url")]
    pub database_url: String,
    #[serde(default = "default_db_max_connections")]
    pub db_max_connections: u32,
    #[serde(default = "default_db_acquire_timeout_ms")]
    pub db_acquire_timeout_ms: u64,
    /// Shared secret for `X-Hub-Signature-256`. Unset disables verification.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webhook_github_secret: Option<String>,
    #[serde(default = "default_streak_sweep_interval_seconds")]
    pub streak_sweep_interval_seconds: u64,
    #[serde(default)]
    pub detection: DetectionConfig,
}

/// Thresholds handed to the detectors at construction time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct DetectionConfig {
    /// Commits whose author time lags the push receipt by more than this are suspicious.
    ///
    /// Environment variable: `REPO_SIGNALS_BACKDATE_SUSPICIOUS_HOURS`
    #[serde(default = "default_backdate_suspicious_hours")]
    pub backdate_suspicious_hours: i64,

    /// Lag beyond which a backdated commit is critical. Must be >= the suspicious threshold.
    ///
    /// Environment variable: `REPO_SIGNALS_BACKDATE_CRITICAL_HOURS`
    #[serde(default = "default_backdate_critical_hours")]
    pub backdate_critical_hours: i64,

    /// Hours without a push before an active repository is marked at risk.
    ///
    /// Environment variable: `REPO_SIGNALS_STREAK_INACTIVITY_HOURS`
    #[serde(default = "default_streak_inactivity_hours")]
    pub streak_inactivity_hours: i64,

    /// Raise an info alert for every commit that does not follow the convention.
    ///
    /// Environment variable: `REPO_SIGNALS_ALERT_NON_CONVENTIONAL`
    #[serde(default)]
    pub alert_non_conventional: bool,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            backdate_suspicious_hours: default_backdate_suspicious_hours(),
            backdate_critical_hours: default_backdate_critical_hours(),
            streak_inactivity_hours: default_streak_inactivity_hours(),
            alert_non_conventional: false,
        }
    }
}

impl DetectionConfig {
    /// Validate threshold ordering and positivity.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.backdate_suspicious_hours <= 0 {
            return Err(ConfigError::InvalidBackdateThreshold {
                value: self.backdate_suspicious_hours,
            });
        }

        if self.backdate_critical_hours < self.backdate_suspicious_hours {
            return Err(ConfigError::InvertedBackdateThresholds {
                suspicious: self.backdate_suspicious_hours,
                critical: self.backdate_critical_hours,
            });
        }

        if self.streak_inactivity_hours <= 0 {
            return Err(ConfigError::InvalidStreakInactivity {
                value: self.streak_inactivity_hours,
            });
        }

        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            profile: default_profile(),
            api_bind_addr: default_api_bind_addr(),
            log_level: default_log_level(),
            log_format: default_log_format(),
            database_url: default_database_url(),
            db_max_connections: default_db_max_connections(),
            db_acquire_timeout_ms: default_db_acquire_timeout_ms(),
            webhook_github_secret: None,
            streak_sweep_interval_seconds: default_streak_sweep_interval_seconds(),
            detection: DetectionConfig::default(),
        }
    }
}

impl AppConfig {
    /// Returns the configured bind address as a socket address.
    pub fn bind_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        self.api_bind_addr.parse()
    }

    /// Returns a redacted JSON representation (secrets are redacted).
    pub fn redacted_json(&self) -> serde_json::Result<String> {
        let mut config = self.clone();
        if config.webhook_github_secret.is_some() {
            config.webhook_github_secret = Some("[REDACTED]".to_string());
        }
        serde_json::to_string_pretty(&config)
    }

    /// Validates the configuration, returning an error if required settings are missing.
    pub fn validate(&self) -> Result<(), ConfigError> {
        // Unsigned deliveries are only tolerated for local development and tests.
        if !matches!(self.profile.as_str(), "local" | "test")
            && self
                .webhook_github_secret
                .as_deref()
                .is_none_or(str::is_empty)
        {
            return Err(ConfigError::MissingWebhookSecret {
                profile: self.profile.clone(),
            });
        }

        if !matches!(self.log_format.as_str(), "json" | "pretty") {
            return Err(ConfigError::InvalidLogFormat {
                value: self.log_format.clone(),
            });
        }

        if !(60..=86_400).contains(&self.streak_sweep_interval_seconds) {
            return Err(ConfigError::InvalidStreakSweepInterval {
                value: self.streak_sweep_interval_seconds,
            });
        }

        self.detection.validate()?;

        Ok(())
    }
}

fn default_profile() -> String {
    "local".to_string()
}

fn default_api_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

fn default_database_url() -> String {
    "sqlite://repo-signals.db?mode=rwc".to_string()
}

fn default_db_max_connections() -> u32 {
    10
}

fn default_db_acquire_timeout_ms() -> u64 {
    5000
}

fn default_streak_sweep_interval_seconds() -> u64 {
    3600 // 1 hour
}

fn default_backdate_suspicious_hours() -> i64 {
    24
}

fn default_backdate_critical_hours() -> i64 {
    72
}

fn default_streak_inactivity_hours() -> i64 {
    72
}

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load environment file {path}: {source}")]
    EnvFile {
        path: PathBuf,
        source: dotenvy::Error,
    },
    #[error("invalid api bind address '{value}': {source}")]
    InvalidBindAddr {
        value: String,
        source: std::net::AddrParseError,
    },
    #[error("invalid value '{value}' for {key}")]
    InvalidValue { key: String, value: String },
    #[error(
        "webhook secret is missing for profile '{profile}'; set REPO_SIGNALS_WEBHOOK_GITHUB_SECRET"
    )]
    MissingWebhookSecret { profile: String },
    #[error("log format must be 'json' or 'pretty', got '{value}'")]
    InvalidLogFormat { value: String },
    #[error("streak sweep interval must be between 60 and 86400 seconds, got {value}")]
    InvalidStreakSweepInterval { value: u64 },
    #[error("backdate suspicious threshold must be positive, got {value}")]
    InvalidBackdateThreshold { value: i64 },
    #[error(
        "backdate critical threshold ({critical}) cannot be lower than the suspicious threshold ({suspicious})"
    )]
    InvertedBackdateThresholds { suspicious: i64, critical: i64 },
    #[error("streak inactivity window must be positive, got {value}")]
    InvalidStreakInactivity { value: i64 },
}

/// Loads configuration using layered `.env` files and `REPO_SIGNALS_*` env vars.
pub struct ConfigLoader {
    base_dir: PathBuf,
    overrides: BTreeMap<String, String>,
    read_process_env: bool,
}

impl ConfigLoader {
    /// Creates a new loader rooted at the current working directory.
    pub fn new() -> Self {
        Self {
            base_dir: env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            overrides: BTreeMap::new(),
            read_process_env: true,
        }
    }

    /// Creates a loader rooted at the provided directory that ignores the process
    /// environment (useful for tests).
    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self {
            base_dir,
            overrides: BTreeMap::new(),
            read_process_env: false,
        }
    }

    /// Adds a prefixed variable that wins over every file layer, as the process
    /// environment would.
    pub fn with_override(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.overrides.insert(key.into(), value.into());
        self
    }

    /// Loads, validates and returns the layered configuration.
    pub fn load(&self) -> Result<AppConfig, ConfigError> {
        let (mut layered, profile_hint) = self.collect_layered_env()?;

        // Overlay the environment last so it wins.
        for (key, value) in self.environment() {
            if let Some(stripped) = key.strip_prefix(ENV_PREFIX) {
                layered.insert(stripped.to_string(), value);
            }
        }

        let profile = layered
            .remove("PROFILE")
            .filter(|v| !v.is_empty())
            .unwrap_or(profile_hint);

        let api_bind_addr = layered
            .remove("API_BIND_ADDR")
            .filter(|v| !v.is_empty())
            .unwrap_or_else(default_api_bind_addr);

        let log_level = layered
            .remove("LOG_LEVEL")
            .filter(|v| !v.is_empty())
            .unwrap_or_else(default_log_level);

        let log_format = layered
            .remove("LOG_FORMAT")
            .filter(|v| !v.is_empty())
            .unwrap_or_else(default_log_format);

        let database_url = layered
            .remove("DATABASE_URL")
            .filter(|v| !v.is_empty())
            .unwrap_or_else(default_database_url);

        let db_max_connections = parse_or(&mut layered, "DB_MAX_CONNECTIONS")?
            .unwrap_or_else(default_db_max_connections);

        let db_acquire_timeout_ms = parse_or(&mut layered, "DB_ACQUIRE_TIMEOUT_MS")?
            .unwrap_or_else(default_db_acquire_timeout_ms);

        let webhook_github_secret = layered.remove("WEBHOOK_GITHUB_SECRET").and_then(|val| {
            let trimmed = val.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        });

        let streak_sweep_interval_seconds =
            parse_or(&mut layered, "STREAK_SWEEP_INTERVAL_SECONDS")?
                .unwrap_or_else(default_streak_sweep_interval_seconds);

        let detection = DetectionConfig {
            backdate_suspicious_hours: parse_or(&mut layered, "BACKDATE_SUSPICIOUS_HOURS")?
                .unwrap_or_else(default_backdate_suspicious_hours),
            backdate_critical_hours: parse_or(&mut layered, "BACKDATE_CRITICAL_HOURS")?
                .unwrap_or_else(default_backdate_critical_hours),
            streak_inactivity_hours: parse_or(&mut layered, "STREAK_INACTIVITY_HOURS")?
                .unwrap_or_else(default_streak_inactivity_hours),
            alert_non_conventional: parse_or(&mut layered, "ALERT_NON_CONVENTIONAL")?
                .unwrap_or(false),
        };

        let config = AppConfig {
            profile,
            api_bind_addr,
            log_level,
            log_format,
            database_url,
            db_max_connections,
            db_acquire_timeout_ms,
            webhook_github_secret,
            streak_sweep_interval_seconds,
            detection,
        };

        config.validate()?;

        match config.bind_addr() {
            Ok(_) => Ok(config),
            Err(source) => Err(ConfigError::InvalidBindAddr {
                value: config.api_bind_addr.clone(),
                source,
            }),
        }
    }

    fn environment(&self) -> Vec<(String, String)> {
        let mut vars: Vec<(String, String)> = if self.read_process_env {
            env::vars().collect()
        } else {
            Vec::new()
        };
        vars.extend(
            self.overrides
                .iter()
                .map(|(key, value)| (key.clone(), value.clone())),
        );
        vars
    }

    fn collect_layered_env(&self) -> Result<(BTreeMap<String, String>, String), ConfigError> {
        let mut values = BTreeMap::new();

        self.merge_dotenv(self.base_dir.join(".env"), &mut values)?;
        self.merge_dotenv(self.base_dir.join(".env.local"), &mut values)?;

        let profile_key = format!("{ENV_PREFIX}PROFILE");
        let profile = self
            .environment()
            .into_iter()
            .rev()
            .find(|(key, _)| key == &profile_key)
            .map(|(_, value)| value)
            .or_else(|| values.get("PROFILE").cloned())
            .unwrap_or_else(default_profile);

        self.merge_dotenv(
            self.base_dir.join(format!(".env.{}", &profile)),
            &mut values,
        )?;
        self.merge_dotenv(
            self.base_dir.join(format!(".env.{}.local", &profile)),
            &mut values,
        )?;

        Ok((values, profile))
    }

    fn merge_dotenv(
        &self,
        path: PathBuf,
        values: &mut BTreeMap<String, String>,
    ) -> Result<(), ConfigError> {
        match dotenvy::from_path_iter(&path) {
            Ok(iter) => {
                for item in iter {
                    let (key, value) = item.map_err(|source| ConfigError::EnvFile {
                        path: path.clone(),
                        source,
                    })?;
                    if let Some(stripped) = key.strip_prefix(ENV_PREFIX) {
                        values.insert(stripped.to_string(), value);
                    }
                }
                Ok(())
            }
            Err(dotenvy::Error::Io(ref io_err))
                if io_err.kind() == std::io::ErrorKind::NotFound =>
            {
                Ok(())
            }
            Err(err) => Err(ConfigError::EnvFile { path, source: err }),
        }
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Removes `key` and parses it, rejecting values that do not parse instead of
/// silently falling back to the default.
fn parse_or<T: std::str::FromStr>(
    layered: &mut BTreeMap<String, String>,
    key: &str,
) -> Result<Option<T>, ConfigError> {
    match layered.remove(key).filter(|v| !v.trim().is_empty()) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue {
                key: format!("{ENV_PREFIX}{key}"),
                value: raw,
            }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid_for_local_profile() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.detection.backdate_suspicious_hours, 24);
        assert_eq!(config.detection.backdate_critical_hours, 72);
        assert_eq!(config.detection.streak_inactivity_hours, 72);
    }

    #[test]
    fn test_inverted_backdate_thresholds_rejected() {
        let detection = DetectionConfig {
            backdate_suspicious_hours: 48,
            backdate_critical_hours: 24,
            ..Default::default()
        };
        assert!(matches!(
            detection.validate(),
            Err(ConfigError::InvertedBackdateThresholds { .. })
        ));
    }

    #[test]
    fn test_production_profile_requires_webhook_secret() {
        let mut config = AppConfig {
            profile: "prod".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingWebhookSecret { .. })
        ));

        config.webhook_github_secret = Some("s3cret".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_redacted_json_hides_secret() {
        let config = AppConfig {
            webhook_github_secret: Some("super-secret-value".to_string()),
            ..Default::default()
        };
        let json = config.redacted_json().unwrap();
        assert!(json.contains("[REDACTED]"));
        assert!(!json.contains("super-secret-value"));
    }

    #[test]
    fn test_unknown_log_format_rejected() {
        let config = AppConfig {
            log_format: "xml".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidLogFormat { .. })
        ));
    }
}
