//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/treewalk/treewalk.toml`
//! 3. Explicit config file passed with `--config`
//! 4. Environment variables: `TREEWALK_*` prefix

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::ValueEnum;
use config::{Config, ConfigError, Environment};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::application::{ApplicationError, CompareOptions, CountMode, Strategy};
use crate::domain::CANONICAL_SIZE;

/// How the collector decides a channel is drained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum DrainMode {
    /// Until the walker closes its channel
    #[default]
    UntilClosed,
    /// Exactly `expected_count` values per channel
    Fixed,
}

/// Unified configuration for treewalk.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Channel buffer size (default: 0, synchronous handoff)
    pub channel_capacity: usize,
    /// Drain mode (default: until-closed)
    pub count_mode: DrainMode,
    /// Values per channel in fixed mode (default: 10)
    pub expected_count: usize,
    /// Drain order (default: sequential)
    pub strategy: Strategy,
    /// Receive timeout in milliseconds, 0 waits forever (default: 0)
    pub recv_timeout_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            channel_capacity: 0,
            count_mode: DrainMode::UntilClosed,
            expected_count: CANONICAL_SIZE,
            strategy: Strategy::Sequential,
            recv_timeout_ms: 0,
        }
    }
}

/// Raw settings for intermediate parsing (`None` means "not specified").
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawSettings {
    pub channel_capacity: Option<usize>,
    pub count_mode: Option<DrainMode>,
    pub expected_count: Option<usize>,
    pub strategy: Option<Strategy>,
    pub recv_timeout_ms: Option<u64>,
}

/// Get the XDG config directory for treewalk.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "treewalk").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("treewalk.toml"))
}

/// Expand `~`, `$VAR` and `${VAR}` in a path; unexpandable input is returned as is.
pub fn expand_path(path: &Path) -> PathBuf {
    let raw = path.to_string_lossy();
    let expanded = shellexpand::full(raw.as_ref())
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| raw.into_owned());
    PathBuf::from(expanded)
}

/// Load a TOML file into RawSettings for manual merging.
fn load_raw_settings(path: &Path) -> Result<RawSettings, ApplicationError> {
    let content = std::fs::read_to_string(path).map_err(|e| ApplicationError::Config {
        message: format!("read {}: {}", path.display(), e),
    })?;
    toml::from_str(&content).map_err(|e| ApplicationError::Config {
        message: format!("parse {}: {}", path.display(), e),
    })
}

impl Settings {
    /// Merge overlay config onto self (base): overlay wins where specified.
    fn merge_with(&self, overlay: &RawSettings) -> Self {
        Self {
            channel_capacity: overlay.channel_capacity.unwrap_or(self.channel_capacity),
            count_mode: overlay.count_mode.unwrap_or(self.count_mode),
            expected_count: overlay.expected_count.unwrap_or(self.expected_count),
            strategy: overlay.strategy.unwrap_or(self.strategy),
            recv_timeout_ms: overlay.recv_timeout_ms.unwrap_or(self.recv_timeout_ms),
        }
    }

    /// Load settings with layered precedence.
    ///
    /// # Arguments
    /// * `explicit` - Optional config file given on the command line; must exist
    ///
    /// # Precedence (lowest to highest)
    /// 1. Compiled defaults
    /// 2. Global config: `$XDG_CONFIG_HOME/treewalk/treewalk.toml`
    /// 3. Explicit config file
    /// 4. Environment variables: `TREEWALK_*` prefix
    pub fn load(explicit: Option<&Path>) -> Result<Self, ApplicationError> {
        let mut current = Self::default();

        if let Some(global_path) = global_config_path() {
            if global_path.exists() {
                let raw = load_raw_settings(&global_path)?;
                current = current.merge_with(&raw);
            }
        }

        if let Some(path) = explicit {
            let raw = load_raw_settings(&expand_path(path))?;
            current = current.merge_with(&raw);
        }

        current = Self::apply_env_overrides(current)?;
        current.validate()?;

        Ok(current)
    }

    /// Apply TREEWALK_* environment variables as explicit overrides.
    fn apply_env_overrides(mut settings: Self) -> Result<Self, ApplicationError> {
        let config = Config::builder()
            .add_source(Environment::with_prefix("TREEWALK"))
            .build()
            .map_err(config_err)?;

        if let Ok(val) = config.get::<usize>("channel_capacity") {
            settings.channel_capacity = val;
        }
        if let Ok(val) = config.get_string("count_mode") {
            settings.count_mode = parse_enum("count_mode", &val)?;
        }
        if let Ok(val) = config.get::<usize>("expected_count") {
            settings.expected_count = val;
        }
        if let Ok(val) = config.get_string("strategy") {
            settings.strategy = parse_enum("strategy", &val)?;
        }
        if let Ok(val) = config.get::<u64>("recv_timeout_ms") {
            settings.recv_timeout_ms = val;
        }

        Ok(settings)
    }

    fn validate(&self) -> Result<(), ApplicationError> {
        if self.count_mode == DrainMode::Fixed && self.expected_count == 0 {
            return Err(ApplicationError::Config {
                message: "expected_count must be positive in fixed mode".to_string(),
            });
        }
        Ok(())
    }

    /// Receive timeout, `None` when waiting forever.
    pub fn recv_timeout(&self) -> Option<Duration> {
        (self.recv_timeout_ms > 0).then(|| Duration::from_millis(self.recv_timeout_ms))
    }

    /// Options for a single comparison.
    pub fn to_options(&self) -> CompareOptions {
        CompareOptions {
            capacity: self.channel_capacity,
            count_mode: match self.count_mode {
                DrainMode::UntilClosed => CountMode::UntilClosed,
                DrainMode::Fixed => CountMode::Fixed(self.expected_count),
            },
            strategy: self.strategy,
            recv_timeout: self.recv_timeout(),
        }
    }

    /// Show the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ApplicationError> {
        toml::to_string_pretty(self).map_err(|e| ApplicationError::Config {
            message: format!("serialize config: {e}"),
        })
    }

    /// Generate a template config file.
    pub fn template() -> String {
        r#"# treewalk configuration
#
# Locations (by precedence, lowest to highest):
#   Global:   ~/.config/treewalk/treewalk.toml
#   Explicit: treewalk --config <file>
#   Env:      TREEWALK_* environment variables

# Channel buffer size, 0 hands every value over synchronously
# channel_capacity = 0

# "until-closed": drain until the walker closes its channel
# "fixed": receive exactly expected_count values, fewer is an error
# count_mode = "until-closed"
# expected_count = 10

# "sequential": drain left then right
# "lockstep": alternate and stop at the first mismatch
# strategy = "sequential"

# Receive timeout in milliseconds, 0 waits forever
# recv_timeout_ms = 0
"#
        .to_string()
    }
}

fn parse_enum<T: ValueEnum>(key: &str, value: &str) -> Result<T, ApplicationError> {
    T::from_str(value, true).map_err(|e| ApplicationError::Config {
        message: format!("{key}: {e}"),
    })
}

fn config_err(e: ConfigError) -> ApplicationError {
    ApplicationError::Config {
        message: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_defaults_when_converting_then_reference_protocol_without_timeout() {
        let options = Settings::default().to_options();
        assert_eq!(options.capacity, 0);
        assert_eq!(options.count_mode, CountMode::UntilClosed);
        assert_eq!(options.strategy, Strategy::Sequential);
        assert_eq!(options.recv_timeout, None);
    }

    #[test]
    fn given_fixed_mode_when_converting_then_carries_expected_count() {
        let settings = Settings {
            count_mode: DrainMode::Fixed,
            expected_count: 7,
            recv_timeout_ms: 250,
            ..Settings::default()
        };
        let options = settings.to_options();
        assert_eq!(options.count_mode, CountMode::Fixed(7));
        assert_eq!(options.recv_timeout, Some(Duration::from_millis(250)));
    }

    #[test]
    fn given_partial_overlay_when_merging_then_keeps_unspecified_fields() {
        let base = Settings::default();
        let overlay = RawSettings {
            strategy: Some(Strategy::Lockstep),
            channel_capacity: Some(4),
            ..RawSettings::default()
        };

        let merged = base.merge_with(&overlay);

        assert_eq!(merged.strategy, Strategy::Lockstep);
        assert_eq!(merged.channel_capacity, 4);
        assert_eq!(merged.count_mode, DrainMode::UntilClosed);
        assert_eq!(merged.expected_count, CANONICAL_SIZE);
    }

    #[test]
    fn given_fixed_mode_with_zero_count_when_validating_then_error() {
        let settings = Settings {
            count_mode: DrainMode::Fixed,
            expected_count: 0,
            ..Settings::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn given_tilde_path_when_expanding_then_uses_home() {
        let home = std::env::var("HOME").expect("HOME should be set");
        let expanded = expand_path(Path::new("~/treewalk.toml"));
        assert!(expanded.starts_with(&home), "{}", expanded.display());
    }

    #[test]
    fn given_template_when_parsing_then_yields_empty_overlay() {
        let raw: RawSettings = toml::from_str(&Settings::template()).expect("template parses");
        assert!(raw.strategy.is_none());
        assert!(raw.channel_capacity.is_none());
    }

    #[test]
    fn given_settings_when_serializing_then_roundtrips_through_toml() {
        let settings = Settings {
            strategy: Strategy::Lockstep,
            count_mode: DrainMode::Fixed,
            ..Settings::default()
        };
        let text = settings.to_toml().unwrap();
        assert!(text.contains("strategy = \"lockstep\""));
        assert!(text.contains("count_mode = \"fixed\""));
    }
}
