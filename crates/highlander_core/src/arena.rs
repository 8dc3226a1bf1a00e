//! # Arena
//!
//! The shared population: every immortal plus the barrier and score board
//! they all use. Shared by `Arc` between the manager and every task.
//!
//! Membership is fixed at construction. Tasks address each other by
//! construction index, which is also the lock-order key of the ordered
//! fight strategy.

use crate::config::{FightMode, SimulationConfig};
use crate::immortal::Immortal;
use crate::scoreboard::ScoreBoard;
use crate::sync::PauseBarrier;

/// Fixed population of immortals and their shared coordination state.
#[derive(Debug)]
pub struct Arena {
    immortals: Box<[Immortal]>,
    barrier: PauseBarrier,
    scoreboard: ScoreBoard,
    fight_mode: FightMode,
}

impl Arena {
    /// Builds the population described by `config`, registering every
    /// immortal with the barrier.
    ///
    /// The config is assumed validated.
    #[must_use]
    pub fn new(config: &SimulationConfig) -> Self {
        let barrier = PauseBarrier::new();
        let immortals = (0..config.population)
            .map(|index| {
                barrier.register();
                Immortal::new(
                    index,
                    format!("Immortal-{index}"),
                    config.initial_health,
                    config.damage,
                )
            })
            .collect();

        Self {
            immortals,
            barrier,
            scoreboard: ScoreBoard::new(),
            fight_mode: config.fight_mode,
        }
    }

    /// All immortals in construction order.
    #[inline]
    #[must_use]
    pub fn immortals(&self) -> &[Immortal] {
        &self.immortals
    }

    /// Population size.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.immortals.len()
    }

    /// True for an empty population (never the case for a validated config).
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.immortals.is_empty()
    }

    /// The population's pause barrier.
    #[inline]
    #[must_use]
    pub fn barrier(&self) -> &PauseBarrier {
        &self.barrier
    }

    /// The population's fight counter.
    #[inline]
    #[must_use]
    pub fn scoreboard(&self) -> &ScoreBoard {
        &self.scoreboard
    }

    /// Lock strategy used by every fight.
    #[inline]
    #[must_use]
    pub const fn fight_mode(&self) -> FightMode {
        self.fight_mode
    }

    /// Sum of all health values. Best-effort unless paused.
    #[must_use]
    pub fn total_health(&self) -> i64 {
        self.immortals.iter().map(|im| i64::from(im.health())).sum()
    }

    /// Number of immortals with `health > 0`. Best-effort unless paused.
    #[must_use]
    pub fn alive_count(&self) -> usize {
        self.immortals.iter().filter(|im| im.is_alive()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arena_registers_every_immortal() {
        let arena = Arena::new(&SimulationConfig::new(5, FightMode::Naive, 80, 4));

        assert_eq!(arena.len(), 5);
        assert_eq!(arena.barrier().registered(), 5);
        assert_eq!(arena.fight_mode(), FightMode::Naive);
        assert_eq!(arena.total_health(), 400);
        assert_eq!(arena.alive_count(), 5);

        for (i, im) in arena.immortals().iter().enumerate() {
            assert_eq!(im.index(), i);
            assert_eq!(im.name(), format!("Immortal-{i}"));
            assert_eq!(im.damage(), 4);
        }
    }

    #[test]
    fn test_aggregates_follow_fights() {
        let arena = Arena::new(&SimulationConfig::new(2, FightMode::Ordered, 100, 10));
        let [a, b] = arena.immortals() else {
            panic!("expected two immortals");
        };

        a.fight(b, arena.fight_mode(), arena.scoreboard());

        assert_eq!(arena.total_health(), 195);
        assert_eq!(arena.scoreboard().total_fights(), 1);
    }
}
