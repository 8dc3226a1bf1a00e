//! # Simulation Error Types
//!
//! All errors that can occur while building or driving a population.

use thiserror::Error;

/// Errors that can occur in the simulation core.
#[derive(Error, Debug)]
pub enum SimulationError {
    /// Population size must be at least one.
    #[error("invalid population size: {0} (must be >= 1)")]
    InvalidPopulation(usize),

    /// Initial health must be strictly positive.
    #[error("invalid initial health: {0} (must be > 0)")]
    InvalidHealth(i32),

    /// Damage per hit must not be negative.
    #[error("invalid damage: {0} (must be >= 0)")]
    InvalidDamage(i32),

    /// Stop timeout must be non-zero.
    #[error("invalid stop timeout: must be > 0 ms")]
    InvalidStopTimeout,

    /// A parallel search was asked to run with zero workers.
    #[error("invalid worker count: {0} (must be >= 1)")]
    InvalidWorkerCount(usize),

    /// Configuration could not be read or parsed.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A parked wait was cancelled; the caller should check its running flag and exit.
    #[error("wait interrupted by cancellation")]
    Interrupted,

    /// The OS refused to create a worker thread.
    #[error("failed to spawn thread for {name}")]
    Spawn {
        /// Name of the immortal whose thread could not be created.
        name: String,
        /// Underlying OS error.
        #[source]
        source: std::io::Error,
    },

    /// A previous stop abandoned threads that never terminated.
    #[error("population poisoned: {stranded} thread(s) never terminated")]
    Poisoned {
        /// Number of threads left behind.
        stranded: usize,
    },
}

/// Result type for simulation operations.
pub type SimulationResult<T> = Result<T, SimulationError>;
