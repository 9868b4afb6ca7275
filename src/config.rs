//! Sandbox configuration.
//!
//! Loaded from YAML or from the process environment. Every field has a
//! default, so an empty document is a valid configuration.

use std::{fs, path::Path};

use serde::{Deserialize, Serialize};
use termcolor::ColorChoice;
use thiserror::Error;

use crate::log::{LevelParseError, LogLevel};

pub const ENV_LOG_LEVEL: &str = "SANDCHECK_LOG_LEVEL";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid configuration: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error(transparent)]
    Level(#[from] LevelParseError),
}

/// Terminal color policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorMode {
    /// Color only when stdout is a terminal.
    #[default]
    Auto,
    Always,
    Never,
}

impl ColorMode {
    pub fn resolve(self) -> ColorChoice {
        match self {
            ColorMode::Auto if atty::is(atty::Stream::Stdout) => ColorChoice::Auto,
            ColorMode::Auto | ColorMode::Never => ColorChoice::Never,
            ColorMode::Always => ColorChoice::Always,
        }
    }
}

/// Configuration for a sandbox run and its reference host.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SandboxConfig {
    /// Minimum severity printed by the console and the logger.
    pub log_level: LogLevel,
    pub color: ColorMode,
    /// Drop the level badge from logger lines.
    pub without_prefix: bool,
    /// Prefix prepended to every line of raw script output.
    pub output_prefix: Option<String>,
    /// Request an interrupt as soon as an error-level event is reported.
    pub fail_on_error_event: bool,
}

impl SandboxConfig {
    pub fn from_yaml_str(source: &str) -> Result<Self, ConfigError> {
        if source.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(source)?)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml_str(&source)
    }

    /// Reads the configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Environment loading over an arbitrary variable lookup.
    ///
    /// `SANDCHECK_LOG_LEVEL` selects the level. A non-empty `FORCE_COLOR`
    /// other than `0` forces color; otherwise `NO_COLOR` or `TERM=dumb`
    /// disables it.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(level) = lookup(ENV_LOG_LEVEL) {
            config.log_level = level.parse()?;
        }

        let set = |name: &str| lookup(name).is_some_and(|v| !v.is_empty());
        if set("FORCE_COLOR") && lookup("FORCE_COLOR").as_deref() != Some("0") {
            config.color = ColorMode::Always;
        } else if set("NO_COLOR") || lookup("TERM").as_deref() == Some("dumb") {
            config.color = ColorMode::Never;
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn empty_yaml_is_default() {
        let config = SandboxConfig::from_yaml_str("").unwrap_or_default();
        assert_eq!(config, SandboxConfig::default());
        assert_eq!(config.log_level, LogLevel::Info);
        assert_eq!(config.color, ColorMode::Auto);
    }

    #[test]
    fn yaml_fields() {
        let config = SandboxConfig::from_yaml_str(
            "log_level: warning\ncolor: never\nwithout_prefix: true\nfail_on_error_event: true\n",
        );
        assert!(config.is_ok());
        if let Ok(config) = config {
            assert_eq!(config.log_level, LogLevel::Warn);
            assert_eq!(config.color, ColorMode::Never);
            assert!(config.without_prefix);
            assert!(config.fail_on_error_event);
        }
    }

    #[test]
    fn yaml_rejects_unknown_level_and_fields() {
        assert!(matches!(
            SandboxConfig::from_yaml_str("log_level: loud"),
            Err(ConfigError::Yaml(_))
        ));
        assert!(SandboxConfig::from_yaml_str("colour: never").is_err());
    }

    #[test]
    fn environment_overrides() {
        let config = SandboxConfig::from_lookup(env(&[
            (ENV_LOG_LEVEL, "debug"),
            ("NO_COLOR", "1"),
        ]));
        assert!(config.is_ok_and(|c| c.log_level == LogLevel::Debug && c.color == ColorMode::Never));

        let config = SandboxConfig::from_lookup(env(&[("FORCE_COLOR", "1"), ("TERM", "dumb")]));
        assert!(config.is_ok_and(|c| c.color == ColorMode::Always));

        let config = SandboxConfig::from_lookup(env(&[("FORCE_COLOR", "0"), ("TERM", "dumb")]));
        assert!(config.is_ok_and(|c| c.color == ColorMode::Never));
    }

    #[test]
    fn environment_bad_level() {
        let err = SandboxConfig::from_lookup(env(&[(ENV_LOG_LEVEL, "loud")])).unwrap_err();
        assert_eq!(err.to_string(), "unrecognized logging level: \"loud\"");
    }

    #[test]
    fn explicit_modes_resolve() {
        assert_eq!(ColorMode::Always.resolve(), ColorChoice::Always);
        assert_eq!(ColorMode::Never.resolve(), ColorChoice::Never);
    }
}
