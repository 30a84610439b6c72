//! Wall-clock pacing of simulated work.

use std::time::Duration;

use serde::{Deserialize, Serialize};

const CHECKPOINT_DELAY_ENV: &str = "ADMISSION_CHECKPOINT_DELAY_MS";
const BREW_UNIT_ENV: &str = "ADMISSION_BREW_UNIT_MS";
const CHECKPOINTS_ENV: &str = "ADMISSION_CHECKPOINTS";

/// How long simulated crossings and brews take.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PacingConfig {
    /// Checkpoints walked per crossing.
    pub checkpoint_count: u32,
    /// Pause at each checkpoint, in milliseconds.
    pub checkpoint_delay_ms: u64,
    /// Wall-clock length of one brew time unit, in milliseconds.
    pub brew_unit_ms: u64,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            checkpoint_count: 3,
            checkpoint_delay_ms: 50,
            brew_unit_ms: 1000,
        }
    }
}

impl PacingConfig {
    /// Pacing with no wall-clock delay at all, for tests and benchmarks.
    #[must_use]
    pub const fn instant() -> Self {
        Self {
            checkpoint_count: 3,
            checkpoint_delay_ms: 0,
            brew_unit_ms: 0,
        }
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.checkpoint_count == 0 {
            return Err("checkpoint_count must be greater than 0".into());
        }
        Ok(())
    }

    /// Pause at each checkpoint.
    #[must_use]
    pub const fn checkpoint_delay(&self) -> Duration {
        Duration::from_millis(self.checkpoint_delay_ms)
    }

    /// Length of one brew time unit.
    #[must_use]
    pub const fn brew_unit(&self) -> Duration {
        Duration::from_millis(self.brew_unit_ms)
    }

    /// Whether no pause is ever taken.
    #[must_use]
    pub const fn is_instant(&self) -> bool {
        self.checkpoint_delay_ms == 0 && self.brew_unit_ms == 0
    }

    /// Defaults overridden by `ADMISSION_*` environment variables, after loading `.env`.
    ///
    /// # Errors
    ///
    /// Returns a message naming the variable that failed to parse or validate.
    pub fn from_env() -> Result<Self, String> {
        if let Err(err) = dotenvy::dotenv() {
            tracing::debug!(error = %err, "no .env file loaded");
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each `ADMISSION_*` key.
    ///
    /// # Errors
    ///
    /// Returns a message naming the variable that failed to parse or validate.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();
        if let Some(value) = lookup(CHECKPOINT_DELAY_ENV) {
            cfg.checkpoint_delay_ms = parse_var(CHECKPOINT_DELAY_ENV, &value)?;
        }
        if let Some(value) = lookup(BREW_UNIT_ENV) {
            cfg.brew_unit_ms = parse_var(BREW_UNIT_ENV, &value)?;
        }
        if let Some(value) = lookup(CHECKPOINTS_ENV) {
            cfg.checkpoint_count = parse_var(CHECKPOINTS_ENV, &value)?;
        }
        cfg.validate()?;
        Ok(cfg)
    }
}

fn parse_var<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, String>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| format!("{key}={value}: {e}"))
}
