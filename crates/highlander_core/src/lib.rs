//! # HIGHLANDER Core
//!
//! Coordination kernel for a population of fighting threads:
//! - every immortal runs on its own OS thread and mutates shared health
//! - the operator can pause the whole population and read a consistent snapshot
//! - stop always terminates, even while paused
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                      ImmortalManager                         │
//! │   start / pause / resume / stop / population_snapshot        │
//! └───────────────┬──────────────────────────────────────────────┘
//!                 │ Arc<Arena>
//! ┌───────────────┴──────────────────────────────────────────────┐
//! │ Arena                                                        │
//! │   [Immortal-0] [Immortal-1] ... [Immortal-N]  (fight locks)  │
//! │   PauseBarrier (one mutex, two condvars)                     │
//! │   ScoreBoard   (one atomic counter)                          │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Rules
//!
//! 1. **Per-immortal locks** - a fight locks exactly its two participants
//! 2. **Ordered locking** - lower construction index first, so no lock cycle
//! 3. **Cooperative stop** - an explicit running flag checked at safe points
//!
//! ## Example
//!
//! ```rust,no_run
//! use highlander_core::{FightMode, ImmortalManager};
//!
//! let manager = ImmortalManager::with_defaults(8, FightMode::Ordered, 100, 10)?;
//! manager.start()?;
//! let report = manager.pause_and_check();
//! println!("{report}");
//! manager.resume();
//! manager.stop();
//! # Ok::<(), highlander_core::SimulationError>(())
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod arena;
pub mod config;
pub mod error;
pub mod immortal;
pub mod manager;
pub mod scoreboard;
pub mod search;
pub mod sync;

pub use arena::Arena;
pub use config::{FightMode, SimulationConfig};
pub use error::{SimulationError, SimulationResult};
pub use immortal::{FightOutcome, Immortal, ImmortalSnapshot};
pub use manager::{ImmortalManager, PopulationReport};
pub use scoreboard::ScoreBoard;
pub use search::{BlacklistSource, HostBlacklistValidator, StaticBlacklist, BLACKLIST_ALARM_COUNT};
pub use sync::PauseBarrier;
