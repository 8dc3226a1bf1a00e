//! # Score Board
//!
//! Lock-free fight counter shared by every immortal of a population.

use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe count of completed fights.
#[derive(Debug, Default)]
pub struct ScoreBoard {
    fights: AtomicU64,
}

impl ScoreBoard {
    /// Creates an empty score board.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            fights: AtomicU64::new(0),
        }
    }

    /// Records one completed fight.
    #[inline]
    pub fn record_fight(&self) {
        self.fights.fetch_add(1, Ordering::Relaxed);
    }

    /// Total fights recorded so far.
    #[inline]
    #[must_use]
    pub fn total_fights(&self) -> u64 {
        self.fights.load(Ordering::Relaxed)
    }
}
