//! # Node Configuration
//!
//! Loaded from a single TOML file; every field has a default so an empty or
//! missing file yields a working node.
//!
//! ```toml
//! [planner]
//! dt = 0.1
//! line_speed = 150.0
//!
//! [egress]
//! y_positive = "down"
//! status = true
//! buffer = 64
//!
//! [ingress]
//! stdin = true
//! http_bind = "127.0.0.1:3000"
//! ```

// src/config.rs - Single configuration file
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::publisher::{LoopSettings, MIN_PERIOD};
use crate::transport::AxisConvention;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub planner: PlannerConfig,
    #[serde(default)]
    pub egress: EgressConfig,
    #[serde(default)]
    pub ingress: IngressConfig,
}

/// Loop timing and motion defaults.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PlannerConfig {
    /// Tick period in seconds
    #[serde(default = "default_dt")]
    pub dt: f64,
    /// Speed used for goto/delta moves, mm/s
    #[serde(default = "default_line_speed")]
    pub line_speed: f64,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            dt: default_dt(),
            line_speed: default_line_speed(),
        }
    }
}

impl PlannerConfig {
    /// Tick period, never shorter than [`MIN_PERIOD`].
    pub fn period(&self) -> Duration {
        Duration::try_from_secs_f64(self.dt)
            .unwrap_or(MIN_PERIOD)
            .max(MIN_PERIOD)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EgressConfig {
    #[serde(default)]
    pub y_positive: AxisConvention,
    #[serde(default = "default_true")]
    pub status: bool,
    #[serde(default = "default_buffer")]
    pub buffer: usize,
}

impl Default for EgressConfig {
    fn default() -> Self {
        Self {
            y_positive: AxisConvention::default(),
            status: true,
            buffer: default_buffer(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IngressConfig {
    #[serde(default = "default_true")]
    pub stdin: bool,
    #[serde(default)]
    pub http_bind: Option<String>,
}

impl Default for IngressConfig {
    fn default() -> Self {
        Self {
            stdin: true,
            http_bind: None,
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.planner.dt.is_finite() || self.planner.dt <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "planner.dt must be a positive number of seconds, got {}",
                self.planner.dt
            )));
        }
        if !self.planner.line_speed.is_finite() || self.planner.line_speed <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "planner.line_speed must be > 0, got {}",
                self.planner.line_speed
            )));
        }
        if self.egress.buffer == 0 {
            return Err(ConfigError::Invalid("egress.buffer must be at least 1".to_string()));
        }
        if let Some(bind) = &self.ingress.http_bind {
            bind.parse::<std::net::SocketAddr>().map_err(|e| {
                ConfigError::Invalid(format!("ingress.http_bind '{}': {}", bind, e))
            })?;
        }
        Ok(())
    }

    pub fn loop_settings(&self) -> LoopSettings {
        LoopSettings {
            period: self.planner.period(),
            axis: self.egress.y_positive,
            emit_status: self.egress.status,
        }
    }
}

fn default_dt() -> f64 { 0.1 }
fn default_line_speed() -> f64 { 150.0 }
fn default_buffer() -> usize { 64 }
fn default_true() -> bool { true }

/// Load configuration from a TOML file at the given path.
pub fn load_config(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    match std::fs::read_to_string(path) {
        Ok(contents) => match toml::from_str(&contents) {
            Ok(config) => Ok(config),
            Err(e) => {
                tracing::error!("Failed to parse config TOML: {}", e);
                Err(ConfigError::Toml(e))
            }
        },
        Err(e) => {
            tracing::error!("Failed to read config file '{}': {}", path.display(), e);
            Err(ConfigError::Io(e))
        }
    }
}

/// Like [`load_config`], but a missing file means defaults.
pub fn load_config_or_default(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    if !path.exists() {
        tracing::debug!("no config at '{}', using defaults", path.display());
        return Ok(Config::default());
    }
    load_config(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_default_values() {
        let config = Config::default();
        assert_eq!(config.planner.dt, 0.1);
        assert_eq!(config.planner.line_speed, 150.0);
        assert_eq!(config.egress.y_positive, AxisConvention::Up);
        assert!(config.egress.status);
        assert_eq!(config.egress.buffer, 64);
        assert!(config.ingress.stdin);
        assert!(config.ingress.http_bind.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_config_success() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("node.toml");
        let mut file = File::create(&file_path).unwrap();
        writeln!(file, "[planner]\ndt = 0.05\n[egress]\ny_positive = 'down'").unwrap();
        file.flush().unwrap();
        let config = load_config(&file_path).unwrap();
        assert_eq!(config.planner.dt, 0.05);
        assert_eq!(config.egress.y_positive, AxisConvention::Down);
        // Defaults for missing fields
        assert_eq!(config.planner.line_speed, 150.0);
        assert!(config.ingress.stdin);
    }

    #[test]
    fn test_load_config_missing_file() {
        let result = load_config("nonexistent_file.toml");
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_missing_default_file_falls_back() {
        let dir = tempdir().unwrap();
        let config = load_config_or_default(dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.planner.dt, 0.1);
    }

    #[test]
    fn test_load_config_invalid_toml() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("bad.toml");
        let mut file = File::create(&file_path).unwrap();
        writeln!(file, "not a valid toml").unwrap();
        file.flush().unwrap();
        let result = load_config(&file_path);
        assert!(matches!(result, Err(ConfigError::Toml(_))));
    }

    #[test]
    fn test_unknown_axis_convention_is_rejected() {
        let result: Result<Config, _> = toml::from_str("[egress]\ny_positive = 'sideways'");
        assert!(result.is_err());
    }

    #[test]
    fn test_period_is_floored() {
        let config: Config = toml::from_str("[planner]\ndt = 0.001").unwrap();
        assert_eq!(config.planner.period(), MIN_PERIOD);
        assert!(config.validate().is_ok());
        assert_eq!(config.loop_settings().period, MIN_PERIOD);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.planner.dt = 0.0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = Config::default();
        config.egress.buffer = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = Config::default();
        config.ingress.http_bind = Some("not an address".to_string());
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }
}
