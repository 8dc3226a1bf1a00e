//! # Simulation Configuration
//!
//! Loaded once at startup, either built in code or parsed from TOML:
//!
//! ```toml
//! population = 10
//! fight_mode = "ordered"
//! initial_health = 100
//! damage = 10
//! stop_timeout_ms = 5000
//! seed = 42
//! ```
//!
//! Every key is optional; missing keys fall back to [`SimulationConfig::default`].

use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{SimulationError, SimulationResult};

/// Default population size.
pub const DEFAULT_POPULATION: usize = 8;

/// Default starting health for every immortal.
pub const DEFAULT_HEALTH: i32 = 100;

/// Default damage dealt per hit.
pub const DEFAULT_DAMAGE: i32 = 10;

/// Default bound on how long `stop()` waits for threads to exit.
pub const DEFAULT_STOP_TIMEOUT_MS: u64 = 5_000;

/// Lock acquisition strategy used by every immortal of a population.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FightMode {
    /// Lower construction index is always locked first. Deadlock-free.
    #[default]
    Ordered,
    /// Attacker locks itself, then the opponent. Can deadlock.
    Naive,
}

impl FightMode {
    /// Returns the configuration spelling of the mode.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ordered => "ordered",
            Self::Naive => "naive",
        }
    }
}

impl fmt::Display for FightMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FightMode {
    type Err = SimulationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ordered" => Ok(Self::Ordered),
            "naive" => Ok(Self::Naive),
            other => Err(SimulationError::InvalidConfig(format!(
                "unknown fight mode '{other}' (expected 'ordered' or 'naive')"
            ))),
        }
    }
}

/// Construction parameters for a population.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationConfig {
    /// Number of immortals (>= 1).
    pub population: usize,
    /// Fight strategy shared by all immortals.
    pub fight_mode: FightMode,
    /// Starting health (> 0).
    pub initial_health: i32,
    /// Damage per hit (>= 0).
    pub damage: i32,
    /// How long `stop()` waits before forcing cancellation.
    pub stop_timeout_ms: u64,
    /// Base seed for opponent selection. Clock-derived when absent.
    pub seed: Option<u64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            population: DEFAULT_POPULATION,
            fight_mode: FightMode::Ordered,
            initial_health: DEFAULT_HEALTH,
            damage: DEFAULT_DAMAGE,
            stop_timeout_ms: DEFAULT_STOP_TIMEOUT_MS,
            seed: None,
        }
    }
}

impl SimulationConfig {
    /// Builds a config with the four operator-facing parameters and defaults elsewhere.
    #[must_use]
    pub fn new(population: usize, fight_mode: FightMode, initial_health: i32, damage: i32) -> Self {
        Self {
            population,
            fight_mode,
            initial_health,
            damage,
            ..Self::default()
        }
    }

    /// Sets the base seed for opponent selection.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Sets the stop timeout.
    #[must_use]
    pub fn with_stop_timeout(mut self, timeout: Duration) -> Self {
        self.stop_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError::InvalidConfig`] on malformed TOML, or the
    /// matching validation error for out-of-range values.
    pub fn from_toml_str(source: &str) -> SimulationResult<Self> {
        let config: Self =
            toml::from_str(source).map_err(|e| SimulationError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError::InvalidConfig`] if the file cannot be read,
    /// plus every error of [`Self::from_toml_str`].
    pub fn from_file(path: impl AsRef<Path>) -> SimulationResult<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|e| {
            SimulationError::InvalidConfig(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&source)
    }

    /// Checks every value against its allowed range.
    ///
    /// # Errors
    ///
    /// Returns the first violated rule.
    pub fn validate(&self) -> SimulationResult<()> {
        if self.population == 0 {
            return Err(SimulationError::InvalidPopulation(self.population));
        }
        if self.initial_health <= 0 {
            return Err(SimulationError::InvalidHealth(self.initial_health));
        }
        if self.damage < 0 {
            return Err(SimulationError::InvalidDamage(self.damage));
        }
        if self.stop_timeout_ms == 0 {
            return Err(SimulationError::InvalidStopTimeout);
        }
        Ok(())
    }

    /// Stop timeout as a [`Duration`].
    #[must_use]
    pub const fn stop_timeout(&self) -> Duration {
        Duration::from_millis(self.stop_timeout_ms)
    }
}
