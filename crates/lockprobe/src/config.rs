//! # Probe Configuration
//!
//! Immutable per-run settings. Built before the run, read-only during it.
//!
//! Two sources:
//! - positional arguments: `[<inflate monitor> [<hold ms>]]`
//! - a TOML file:
//!
//! ```toml
//! inflate_monitor = true
//! hold_ms = 1000
//! rendezvous_timeout_ms = 30000
//! ```
//!
//! Missing keys fall back to the defaults; unknown keys are rejected.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{ProbeError, ProbeResult};

/// Default time the contending actor holds the monitor.
pub const DEFAULT_HOLD_MS: u64 = 1000;

/// Default bound on a single rendezvous wait.
pub const DEFAULT_RENDEZVOUS_TIMEOUT_MS: u64 = 30_000;

/// Upper bound accepted for the rendezvous wait (one hour).
pub const MAX_RENDEZVOUS_TIMEOUT_MS: u64 = 3_600_000;

/// Configuration for one contention probe run.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProbeConfig {
    /// Run the inflation hook on the monitor before the actor starts.
    pub inflate_monitor: bool,
    /// How long the contending actor holds the monitor (ms).
    pub hold_ms: u64,
    /// Bound on each rendezvous wait (ms). A party waiting longer breaks the run.
    pub rendezvous_timeout_ms: u64,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            inflate_monitor: true,
            hold_ms: DEFAULT_HOLD_MS,
            rendezvous_timeout_ms: DEFAULT_RENDEZVOUS_TIMEOUT_MS,
        }
    }
}

impl ProbeConfig {
    /// Creates a config with the given inflation flag and hold time.
    #[must_use]
    pub fn new(inflate_monitor: bool, hold_ms: u64) -> Self {
        Self {
            inflate_monitor,
            hold_ms,
            ..Self::default()
        }
    }

    /// Overrides the rendezvous wait bound.
    #[must_use]
    pub fn with_rendezvous_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.rendezvous_timeout_ms = timeout_ms;
        self
    }

    /// Hold time as a `Duration`.
    #[inline]
    #[must_use]
    pub fn hold(&self) -> Duration {
        Duration::from_millis(self.hold_ms)
    }

    /// Rendezvous wait bound as a `Duration`.
    #[inline]
    #[must_use]
    pub fn rendezvous_timeout(&self) -> Duration {
        Duration::from_millis(self.rendezvous_timeout_ms)
    }

    /// Checks the config before any thread starts.
    ///
    /// # Errors
    ///
    /// Returns [`ProbeError::Configuration`] if the rendezvous bound is zero or
    /// larger than [`MAX_RENDEZVOUS_TIMEOUT_MS`].
    pub fn validate(&self) -> ProbeResult<()> {
        if self.rendezvous_timeout_ms == 0 {
            return Err(ProbeError::Configuration(
                "rendezvous_timeout_ms must be greater than zero".into(),
            ));
        }
        if self.rendezvous_timeout_ms > MAX_RENDEZVOUS_TIMEOUT_MS {
            return Err(ProbeError::Configuration(format!(
                "rendezvous_timeout_ms {} exceeds maximum {MAX_RENDEZVOUS_TIMEOUT_MS}",
                self.rendezvous_timeout_ms
            )));
        }
        Ok(())
    }

    /// Parses `[<inflate monitor> [<hold ms>]]`.
    ///
    /// # Errors
    ///
    /// Returns [`ProbeError::Configuration`] for a flag that is not
    /// `true`/`false`, a hold time that is not a non-negative integer, or
    /// extra arguments.
    pub fn from_args<I, S>(args: I) -> ProbeResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut config = Self::default();
        let mut args = args.into_iter();

        if let Some(flag) = args.next() {
            config.inflate_monitor = parse_flag(flag.as_ref())?;
        }
        if let Some(hold) = args.next() {
            let hold = hold.as_ref();
            config.hold_ms = hold.trim().parse().map_err(|_| {
                ProbeError::Configuration(format!(
                    "hold time must be a non-negative integer (ms), got {hold:?}"
                ))
            })?;
        }
        if let Some(extra) = args.next() {
            return Err(ProbeError::Configuration(format!(
                "unexpected argument {:?}; usage: [<inflate monitor> [<hold ms>]]",
                extra.as_ref()
            )));
        }

        config.validate()?;
        Ok(config)
    }

    /// Parses a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`ProbeError::Configuration`] on syntax errors, unknown keys,
    /// wrong value types, or failed validation.
    pub fn from_toml_str(source: &str) -> ProbeResult<Self> {
        let config: Self = toml::from_str(source)
            .map_err(|e| ProbeError::Configuration(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads and parses a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ProbeError::Configuration`] if the file cannot be read or
    /// does not parse.
    pub fn load(path: impl AsRef<Path>) -> ProbeResult<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|e| {
            ProbeError::Configuration(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&source)
    }
}

fn parse_flag(value: &str) -> ProbeResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(ProbeError::Configuration(format!(
            "inflate monitor flag must be true or false, got {value:?}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ProbeConfig::default();
        assert!(config.inflate_monitor);
        assert_eq!(config.hold(), Duration::from_millis(1000));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_args() {
        let none: [&str; 0] = [];
        assert_eq!(ProbeConfig::from_args(none).unwrap(), ProbeConfig::default());

        let config = ProbeConfig::from_args(["FALSE"]).unwrap();
        assert!(!config.inflate_monitor);
        assert_eq!(config.hold_ms, DEFAULT_HOLD_MS);

        let config = ProbeConfig::from_args(["true", "50"]).unwrap();
        assert!(config.inflate_monitor);
        assert_eq!(config.hold_ms, 50);

        let config = ProbeConfig::from_args(["false", "0"]).unwrap();
        assert_eq!(config.hold(), Duration::ZERO);
    }

    #[test]
    fn test_from_args_rejects_malformed() {
        for args in [
            vec!["yes"],
            vec!["true", "-5"],
            vec!["true", "soon"],
            vec!["true", "10", "extra"],
        ] {
            let err = ProbeConfig::from_args(&args).unwrap_err();
            assert!(matches!(err, ProbeError::Configuration(_)), "{args:?}: {err}");
        }
    }

    #[test]
    fn test_from_toml() {
        let config = ProbeConfig::from_toml_str("inflate_monitor = false\nhold_ms = 50\n").unwrap();
        assert_eq!(config, ProbeConfig::new(false, 50));

        let config = ProbeConfig::from_toml_str("").unwrap();
        assert_eq!(config, ProbeConfig::default());
    }

    #[test]
    fn test_from_toml_rejects_bad_input() {
        assert!(ProbeConfig::from_toml_str("hold_ms = \"long\"").is_err());
        assert!(ProbeConfig::from_toml_str("holdms = 5").is_err());
        assert!(ProbeConfig::from_toml_str("rendezvous_timeout_ms = 0").is_err());
    }

    #[test]
    fn test_load_missing_file() {
        let err = ProbeConfig::load("/nonexistent/lockprobe.toml").unwrap_err();
        assert!(err.to_string().contains("cannot read"));
    }
}
