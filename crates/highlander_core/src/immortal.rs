//! # Immortal
//!
//! A worker with mutable health that fights the rest of the population
//! until told to stop.
//!
//! ## Fight Protocol
//!
//! ```text
//! loop:
//!   1. pick a live opponent at random (never self)
//!   2. waitpoint()            <- parks here while the population is paused
//!   3. lock both immortals    <- FightMode decides the order
//!   4. opponent -= damage, attacker += damage / 2, score += 1
//!   5. unlock in reverse order
//!   6. running? else exit
//! ```
//!
//! ## Lock Ordering
//!
//! ```text
//! Naive:    A attacks B: lock(A) then lock(B)
//!           B attacks A: lock(B) then lock(A)      => A waits B, B waits A: DEADLOCK
//!
//! Ordered:  lower construction index first, whatever the roles
//!           A attacks B: lock(A) then lock(B)
//!           B attacks A: lock(A) then lock(B)      => no cycle possible
//! ```
//!
//! Health is only ever written while the owning immortal's fight lock is
//! held. Reads outside a fight are lock-free and may be stale unless the
//! population is paused.

use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::arena::Arena;
use crate::config::FightMode;
use crate::scoreboard::ScoreBoard;

/// Back-off when an immortal has nobody left to fight.
const IDLE_BACKOFF: Duration = Duration::from_millis(1);

/// What happened to a single fight attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FightOutcome {
    /// Damage was applied and the fight was scored.
    Fought,
    /// One side was already dead (or it was a fight with oneself); nothing changed.
    Abandoned,
}

/// A fighting worker.
#[derive(Debug)]
pub struct Immortal {
    /// Construction index; the lock-order key.
    index: usize,
    name: String,
    /// Written only under `fight_lock`.
    health: AtomicI32,
    damage: i32,
    running: AtomicBool,
    fight_lock: Mutex<()>,
}

impl Immortal {
    /// Creates an immortal. It is not running until its population starts.
    #[must_use]
    pub fn new(index: usize, name: impl Into<String>, health: i32, damage: i32) -> Self {
        Self {
            index,
            name: name.into(),
            health: AtomicI32::new(health),
            damage,
            running: AtomicBool::new(false),
            fight_lock: Mutex::new(()),
        }
    }

    /// Construction index within the population.
    #[inline]
    #[must_use]
    pub const fn index(&self) -> usize {
        self.index
    }

    /// Display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current health (best-effort outside a pause).
    #[inline]
    #[must_use]
    pub fn health(&self) -> i32 {
        self.health.load(Ordering::Acquire)
    }

    /// Damage dealt per hit.
    #[inline]
    #[must_use]
    pub const fn damage(&self) -> i32 {
        self.damage
    }

    /// `health > 0`.
    #[inline]
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.health() > 0
    }

    /// Whether this immortal's task has been told to keep going.
    #[inline]
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Asks the task to stop at its next safe point.
    ///
    /// Only the manager may do this: a task leaving on its own would stay
    /// counted by the barrier and `pause()` could never complete.
    ///
    /// ```compile_fail
    /// use highlander_core::Immortal;
    ///
    /// Immortal::new(0, "Immortal-0", 100, 10).stop();
    /// ```
    pub(crate) fn stop(&self) {
        self.running.store(false, Ordering::Release);
    }

    /// Raises the running flag before a task is spawned.
    pub(crate) fn arm(&self) {
        self.running.store(true, Ordering::Release);
    }

    /// Cancellation token handed to the barrier.
    pub(crate) fn running_flag(&self) -> &AtomicBool {
        &self.running
    }

    /// Value copy of the current state.
    #[must_use]
    pub fn snapshot(&self) -> ImmortalSnapshot {
        ImmortalSnapshot {
            index: self.index,
            name: self.name.clone(),
            health: self.health(),
            damage: self.damage,
            running: self.is_running(),
        }
    }

    /// Attacks `opponent` once using the given lock strategy.
    ///
    /// Blocks while either fight lock is held elsewhere. With
    /// [`FightMode::Naive`] two immortals attacking each other can block
    /// forever.
    pub fn fight(&self, opponent: &Self, mode: FightMode, score: &ScoreBoard) -> FightOutcome {
        if std::ptr::eq(self, opponent) {
            return FightOutcome::Abandoned;
        }
        match mode {
            FightMode::Naive => self.fight_naive(opponent, score),
            FightMode::Ordered => self.fight_ordered(opponent, score),
        }
    }

    fn fight_naive(&self, opponent: &Self, score: &ScoreBoard) -> FightOutcome {
        let _mine = self.fight_lock.lock();
        let _theirs = opponent.fight_lock.lock();
        self.exchange_blows(opponent, score)
    }

    fn fight_ordered(&self, opponent: &Self, score: &ScoreBoard) -> FightOutcome {
        let (first, second) = if self.lock_key() < opponent.lock_key() {
            (self, opponent)
        } else {
            (opponent, self)
        };
        let _first = first.fight_lock.lock();
        let _second = second.fight_lock.lock();
        self.exchange_blows(opponent, score)
    }

    /// Total lock order: construction index, then address for duplicate indices.
    fn lock_key(&self) -> (usize, usize) {
        (self.index, self as *const Self as usize)
    }

    /// Held fight lock, for tests that need a fight to block.
    #[cfg(test)]
    pub(crate) fn hold_fight_lock(&self) -> parking_lot::MutexGuard<'_, ()> {
        self.fight_lock.lock()
    }

    /// Applies one hit. Caller holds both fight locks.
    fn exchange_blows(&self, opponent: &Self, score: &ScoreBoard) -> FightOutcome {
        let mine = self.health.load(Ordering::Acquire);
        let theirs = opponent.health.load(Ordering::Acquire);
        if mine <= 0 || theirs <= 0 {
            return FightOutcome::Abandoned;
        }

        opponent
            .health
            .store(theirs.saturating_sub(self.damage), Ordering::Release);
        self.health
            .store(mine.saturating_add(self.damage / 2), Ordering::Release);
        score.record_fight();
        FightOutcome::Fought
    }

    /// Picks a live opponent uniformly at random. `None` if this immortal is
    /// dead or has nobody left to fight.
    fn pick_opponent(
        &self,
        arena: &Arena,
        rng: &mut StdRng,
        candidates: &mut Vec<usize>,
    ) -> Option<usize> {
        if !self.is_alive() {
            return None;
        }
        candidates.clear();
        candidates.extend(
            arena
                .immortals()
                .iter()
                .filter(|other| other.index != self.index && other.is_alive())
                .map(Self::index),
        );
        candidates.choose(rng).copied()
    }
}

/// Task body for the immortal at `index`. Returns once it is stopped.
pub(crate) fn run(arena: &Arena, index: usize, seed: u64) {
    let me = &arena.immortals()[index];
    let mut rng = StdRng::seed_from_u64(seed);
    let mut candidates = Vec::with_capacity(arena.len());

    while me.is_running() {
        let opponent = me.pick_opponent(arena, &mut rng, &mut candidates);

        if arena.barrier().waitpoint(me.running_flag()).is_err() {
            break;
        }

        match opponent {
            Some(other) => {
                me.fight(&arena.immortals()[other], arena.fight_mode(), arena.scoreboard());
            }
            None => thread::sleep(IDLE_BACKOFF),
        }
    }

    tracing::trace!(immortal = %me.name, health = me.health(), "task exited");
}

/// Value copy of an immortal, safe to keep after the population moves on.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImmortalSnapshot {
    /// Construction index.
    pub index: usize,
    /// Display name.
    pub name: String,
    /// Health at snapshot time.
    pub health: i32,
    /// Damage per hit.
    pub damage: i32,
    /// Running flag at snapshot time.
    pub running: bool,
}

impl ImmortalSnapshot {
    /// `health > 0`.
    #[must_use]
    pub const fn is_alive(&self) -> bool {
        self.health > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_naive_fight_arithmetic() {
        let score = ScoreBoard::new();
        let a = Immortal::new(0, "A", 100, 10);
        let b = Immortal::new(1, "B", 100, 10);

        assert_eq!(a.fight(&b, FightMode::Naive, &score), FightOutcome::Fought);

        assert_eq!(b.health(), 90);
        assert_eq!(a.health(), 105);
        assert_eq!(score.total_fights(), 1);
    }

    #[test]
    fn test_ordered_fight_arithmetic_either_direction() {
        let score = ScoreBoard::new();
        let a = Immortal::new(0, "A", 100, 10);
        let b = Immortal::new(1, "B", 100, 10);

        // Higher index attacking lower still locks lower first.
        assert_eq!(b.fight(&a, FightMode::Ordered, &score), FightOutcome::Fought);
        assert_eq!(a.health(), 90);
        assert_eq!(b.health(), 105);

        assert_eq!(a.fight(&b, FightMode::Ordered, &score), FightOutcome::Fought);
        assert_eq!(b.health(), 95);
        assert_eq!(a.health(), 95);
        assert_eq!(score.total_fights(), 2);
    }

    #[test]
    fn test_odd_damage_rounds_toward_zero() {
        let score = ScoreBoard::new();
        let a = Immortal::new(0, "A", 50, 7);
        let b = Immortal::new(1, "B", 50, 3);

        a.fight(&b, FightMode::Ordered, &score);
        assert_eq!(b.health(), 43);
        assert_eq!(a.health(), 53);
    }

    #[test]
    fn test_dead_side_abandons_fight() {
        let score = ScoreBoard::new();
        let a = Immortal::new(0, "A", 100, 10);
        let b = Immortal::new(1, "B", 10, 10);

        assert_eq!(a.fight(&b, FightMode::Ordered, &score), FightOutcome::Fought);
        assert_eq!(b.health(), 0);
        assert!(!b.is_alive());

        // Neither attacking nor being attacked changes anything now.
        assert_eq!(a.fight(&b, FightMode::Ordered, &score), FightOutcome::Abandoned);
        assert_eq!(b.fight(&a, FightMode::Naive, &score), FightOutcome::Abandoned);
        assert_eq!(a.health(), 105);
        assert_eq!(b.health(), 0);
        assert_eq!(score.total_fights(), 1);
    }

    #[test]
    fn test_self_fight_is_abandoned() {
        let score = ScoreBoard::new();
        let a = Immortal::new(0, "A", 100, 10);
        assert_eq!(a.fight(&a, FightMode::Naive, &score), FightOutcome::Abandoned);
        assert_eq!(a.fight(&a, FightMode::Ordered, &score), FightOutcome::Abandoned);
        assert_eq!(a.health(), 100);
        assert_eq!(score.total_fights(), 0);
    }

    #[test]
    fn test_zero_damage_still_scores() {
        let score = ScoreBoard::new();
        let a = Immortal::new(0, "A", 100, 0);
        let b = Immortal::new(1, "B", 100, 0);
        assert_eq!(a.fight(&b, FightMode::Ordered, &score), FightOutcome::Fought);
        assert_eq!(a.health(), 100);
        assert_eq!(b.health(), 100);
        assert_eq!(score.total_fights(), 1);
    }

    #[test]
    fn test_health_saturates() {
        let score = ScoreBoard::new();
        let a = Immortal::new(0, "A", i32::MAX, 10);
        let b = Immortal::new(1, "B", 100, 10);
        a.fight(&b, FightMode::Ordered, &score);
        assert_eq!(a.health(), i32::MAX);
    }

    #[test]
    fn test_snapshot_is_a_value_copy() {
        let score = ScoreBoard::new();
        let a = Immortal::new(0, "Immortal-0", 100, 10);
        let b = Immortal::new(1, "Immortal-1", 100, 10);
        let before = b.snapshot();

        a.fight(&b, FightMode::Ordered, &score);

        assert_eq!(before.health, 100);
        assert_eq!(before.name, "Immortal-1");
        assert!(!before.running);
        assert_eq!(b.snapshot().health, 90);
    }

    #[test]
    fn test_ordered_fight_with_duplicate_index_terminates() {
        use std::sync::Arc;

        let a = Arc::new(Immortal::new(7, "A", i32::MAX / 2, 2));
        let b = Arc::new(Immortal::new(7, "B", i32::MAX / 2, 2));
        let score = Arc::new(ScoreBoard::new());
        let (tx, rx) = crossbeam_channel::unbounded();

        for (attacker, opponent) in [(Arc::clone(&a), Arc::clone(&b)), (Arc::clone(&b), Arc::clone(&a))] {
            let score = Arc::clone(&score);
            let tx = tx.clone();
            thread::spawn(move || {
                for _ in 0..20_000 {
                    attacker.fight(&opponent, FightMode::Ordered, &score);
                }
                let _ = tx.send(());
            });
        }

        for _ in 0..2 {
            rx.recv_timeout(Duration::from_secs(10))
                .expect("opposite attackers with equal indices deadlocked");
        }
        assert_eq!(score.total_fights(), 40_000);
    }

    #[test]
    fn test_running_flag_lifecycle() {
        let a = Immortal::new(0, "A", 100, 10);
        assert!(!a.is_running());
        a.arm();
        assert!(a.is_running());
        a.stop();
        assert!(!a.is_running());
    }
}
