//! Orchestrator configuration with layered loading.
//!
//! Values are resolved in this order (later overrides earlier):
//!
//! 1. Compiled defaults from the `default_*` functions
//! 2. Optional TOML file
//! 3. `SPLICE_*` environment variables
//!
//! Configuration is validated at load time; an invalid value (zero cache
//! capacity, zero batch limit) is an error rather than a silent fallback.

use crate::cache::DEFAULT_HEADER_CACHE_CAPACITY;
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::{path::Path, time::Duration};

/// Tuning knobs for the pairing and canonicalization pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpliceConfig {
    /// LRU capacity for pending execution headers. Defaults to `1024`.
    #[serde(default = "default_header_cache_capacity")]
    pub header_cache_capacity: usize,

    /// Maximum slots inspected per canonicalization pass. Defaults to
    /// `50_000`.
    #[serde(default = "default_canonicalization_batch_limit")]
    pub canonicalization_batch_limit: u64,

    /// Quiet period before a burst of announcements triggers a pass, in
    /// milliseconds. Defaults to `1000`.
    #[serde(default = "default_debounce_interval_ms")]
    pub debounce_interval_ms: u64,

    /// Minimum accumulated announcements before a pass is scheduled; one
    /// announcement per chain is not enough to pair. Defaults to `2`.
    #[serde(default = "default_min_pending_for_trigger")]
    pub min_pending_for_trigger: usize,
}

fn default_header_cache_capacity() -> usize {
    DEFAULT_HEADER_CACHE_CAPACITY
}

fn default_canonicalization_batch_limit() -> u64 {
    50_000
}

fn default_debounce_interval_ms() -> u64 {
    1_000
}

fn default_min_pending_for_trigger() -> usize {
    2
}

impl Default for SpliceConfig {
    fn default() -> Self {
        Self {
            header_cache_capacity: default_header_cache_capacity(),
            canonicalization_batch_limit: default_canonicalization_batch_limit(),
            debounce_interval_ms: default_debounce_interval_ms(),
            min_pending_for_trigger: default_min_pending_for_trigger(),
        }
    }
}

impl SpliceConfig {
    /// Loads configuration from defaults, an optional TOML file, and
    /// `SPLICE_*` environment variables, then validates it.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` when a source fails to parse or validation
    /// rejects the resolved values.
    pub fn load(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        if let Some(path) = config_path {
            builder = builder.add_source(File::from(path));
        }

        let resolved: Self = builder
            .add_source(Environment::with_prefix("SPLICE"))
            .build()?
            .try_deserialize()?;

        resolved.validate()?;
        Ok(resolved)
    }

    /// Validates resolved values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Message` naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.header_cache_capacity == 0 {
            return Err(ConfigError::Message(
                "header_cache_capacity must be greater than zero".to_string(),
            ));
        }
        if self.canonicalization_batch_limit == 0 {
            return Err(ConfigError::Message(
                "canonicalization_batch_limit must be greater than zero".to_string(),
            ));
        }
        if self.debounce_interval_ms == 0 {
            return Err(ConfigError::Message(
                "debounce_interval_ms must be greater than zero".to_string(),
            ));
        }
        if self.min_pending_for_trigger == 0 {
            return Err(ConfigError::Message(
                "min_pending_for_trigger must be at least one".to_string(),
            ));
        }
        Ok(())
    }

    /// The debounce quiet period as a [`Duration`].
    #[must_use]
    pub fn debounce_interval(&self) -> Duration {
        Duration::from_millis(self.debounce_interval_ms)
    }
}
