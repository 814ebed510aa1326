//! Configuration loading from TOML files and environment variables.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::alarm::EngineSettings;
use crate::pointer::MoveSettings;

/// Root configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub poll: PollConfig,
    #[serde(default)]
    pub movement: MovementConfig,
    #[serde(default)]
    pub alarm: AlarmConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Pointer sampling configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollConfig {
    /// Time between pointer checks in seconds.
    #[serde(default = "default_interval_seconds")]
    pub interval_seconds: u64,
    /// Displacement in pixels above which a move counts as human.
    #[serde(default = "default_movement_threshold")]
    pub movement_threshold_px: u32,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_seconds: default_interval_seconds(),
            movement_threshold_px: default_movement_threshold(),
        }
    }
}

impl PollConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_seconds)
    }
}

/// Synthetic move configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovementConfig {
    #[serde(default = "default_min_distance")]
    pub min_distance_px: u32,
    #[serde(default = "default_max_distance")]
    pub max_distance_px: u32,
    /// Keep targets this far from the screen edges.
    #[serde(default = "default_screen_margin")]
    pub screen_margin_px: u32,
    /// Glide to the target instead of jumping.
    #[serde(default = "default_true")]
    pub smooth: bool,
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self {
            min_distance_px: default_min_distance(),
            max_distance_px: default_max_distance(),
            screen_margin_px: default_screen_margin(),
            smooth: true,
        }
    }
}

/// Inactivity alarm configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlarmConfig {
    /// Seconds without human movement before the alarm sounds.
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
    /// Gap between dings in milliseconds.
    #[serde(default = "default_ding_unit_ms")]
    pub ding_unit_ms: u64,
    /// Log notifications instead of playing them.
    #[serde(default)]
    pub mute: bool,
}

impl Default for AlarmConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: default_timeout_seconds(),
            ding_unit_ms: default_ding_unit_ms(),
            mute: false,
        }
    }
}

impl AlarmConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    pub fn ding_unit(&self) -> Duration {
        Duration::from_millis(self.ding_unit_ms)
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Data directory for the event journal.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Write the JSONL event journal.
    #[serde(default = "default_true")]
    pub journal: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            level: default_log_level(),
            journal: true,
        }
    }
}

impl LoggingConfig {
    /// Returns the journal directory path.
    pub fn logs_dir(&self) -> PathBuf {
        self.data_dir.join("logs")
    }
}

// Default value functions
fn default_interval_seconds() -> u64 {
    300
}

fn default_movement_threshold() -> u32 {
    10
}

fn default_min_distance() -> u32 {
    100
}

fn default_max_distance() -> u32 {
    500
}

fn default_screen_margin() -> u32 {
    50
}

fn default_timeout_seconds() -> u64 {
    1800
}

fn default_ding_unit_ms() -> u64 {
    1000
}

fn default_true() -> bool {
    true
}

fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .map(|h| h.join(".mousewake"))
        .unwrap_or_else(|| PathBuf::from(".mousewake"))
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;
        let config: Config =
            toml::from_str(&content).with_context(|| "Failed to parse config file")?;
        Ok(config)
    }

    /// Load configuration with environment variable overrides.
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let mut config = if let Some(path) = config_path {
            Self::from_file(path)?
        } else {
            // Try default config locations
            let default_paths = [
                PathBuf::from("config/default.toml"),
                dirs::config_dir()
                    .map(|d| d.join("mousewake/config.toml"))
                    .unwrap_or_default(),
            ];

            let mut loaded = None;
            for path in &default_paths {
                if path.is_file() {
                    loaded = Some(Self::from_file(path)?);
                    break;
                }
            }
            loaded.unwrap_or_default()
        };

        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.logging.data_dir = expand_tilde(&config.logging.data_dir);

        Ok(config)
    }

    /// Apply `MOUSEWAKE_*` overrides. Unparseable values are ignored.
    fn apply_env_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(v) = var("MOUSEWAKE_INTERVAL").and_then(|v| v.parse().ok()) {
            self.poll.interval_seconds = v;
        }
        if let Some(v) = var("MOUSEWAKE_THRESHOLD").and_then(|v| v.parse().ok()) {
            self.poll.movement_threshold_px = v;
        }
        if let Some(v) = var("MOUSEWAKE_TIMEOUT").and_then(|v| v.parse().ok()) {
            self.alarm.timeout_seconds = v;
        }
        if let Some(v) = var("MOUSEWAKE_DING_UNIT_MS").and_then(|v| v.parse().ok()) {
            self.alarm.ding_unit_ms = v;
        }
        if let Some(v) = var("MOUSEWAKE_MUTE").and_then(|v| v.parse().ok()) {
            self.alarm.mute = v;
        }
        if let Some(val) = var("MOUSEWAKE_DATA_DIR") {
            self.logging.data_dir = PathBuf::from(val);
        }
        if let Some(val) = var("MOUSEWAKE_LOG_LEVEL") {
            self.logging.level = val;
        }
    }

    /// Timing parameters for the escalation engine.
    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            alarm_timeout: self.alarm.timeout(),
            poll_interval: self.poll.interval(),
            ding_unit: self.alarm.ding_unit(),
        }
    }

    pub fn move_settings(&self) -> MoveSettings {
        MoveSettings {
            min_distance: self.movement.min_distance_px,
            max_distance: self.movement.max_distance_px,
            margin: self.movement.screen_margin_px,
            smooth: self.movement.smooth,
        }
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<()> {
        self.engine_settings().validate()?;
        if self.poll.movement_threshold_px == 0 {
            anyhow::bail!("Movement threshold must be greater than 0");
        }
        if self.movement.min_distance_px > self.movement.max_distance_px {
            anyhow::bail!(
                "Minimum move distance ({}px) exceeds maximum ({}px)",
                self.movement.min_distance_px,
                self.movement.max_distance_px
            );
        }
        Ok(())
    }
}

/// Expand ~ to home directory.
fn expand_tilde(path: &Path) -> PathBuf {
    if let Ok(rest) = path.strip_prefix("~") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    path.to_path_buf()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        config.validate().unwrap();

        let settings = config.engine_settings();
        assert_eq!(settings.alarm_timeout, Duration::from_secs(1800));
        assert_eq!(settings.poll_interval, Duration::from_secs(300));
        assert_eq!(settings.ding_unit, Duration::from_secs(1));
        assert_eq!(settings.max_ding_count(), 20);
    }

    #[test]
    fn test_partial_file_keeps_defaults() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[poll]
interval_seconds = 15

[alarm]
timeout_seconds = 600
mute = true
"#,
        )?;

        let config = Config::from_file(&path)?;

        assert_eq!(config.poll.interval_seconds, 15);
        assert_eq!(config.poll.movement_threshold_px, 10);
        assert_eq!(config.alarm.timeout_seconds, 600);
        assert!(config.alarm.mute);
        assert_eq!(config.alarm.ding_unit_ms, 1000);
        assert_eq!(config.movement, MovementConfig::default());
        assert_eq!(config.engine_settings().max_ding_count(), 15);
        Ok(())
    }

    #[test]
    fn test_explicit_missing_file_is_error() {
        let dir = tempdir().unwrap();
        let err = Config::load(Some(&dir.path().join("nope.toml"))).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }

    #[test]
    fn test_malformed_file_is_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[poll\ninterval_seconds = ").unwrap();

        let err = Config::from_file(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("MOUSEWAKE_INTERVAL", "30"),
            ("MOUSEWAKE_TIMEOUT", "120"),
            ("MOUSEWAKE_THRESHOLD", "not-a-number"),
            ("MOUSEWAKE_MUTE", "true"),
            ("MOUSEWAKE_LOG_LEVEL", "debug"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_env_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.poll.interval_seconds, 30);
        assert_eq!(config.alarm.timeout_seconds, 120);
        assert_eq!(config.poll.movement_threshold_px, 10);
        assert!(config.alarm.mute);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_validate_rejects_short_durations() {
        let mut config = Config::default();
        config.poll.interval_seconds = 1;
        assert!(config
            .validate()
            .unwrap_err()
            .to_string()
            .contains("poll interval"));

        let mut config = Config::default();
        config.alarm.timeout_seconds = 9;
        assert!(config
            .validate()
            .unwrap_err()
            .to_string()
            .contains("alarm timeout"));

        let mut config = Config::default();
        config.alarm.ding_unit_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_inverted_distances() {
        let mut config = Config::default();
        config.movement.min_distance_px = 600;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.poll.movement_threshold_px = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_expand_tilde() {
        let plain = PathBuf::from("/var/lib/mousewake");
        assert_eq!(expand_tilde(&plain), plain);

        if let Some(home) = dirs::home_dir() {
            assert_eq!(
                expand_tilde(Path::new("~/.mousewake")),
                home.join(".mousewake")
            );
        }
    }
}
