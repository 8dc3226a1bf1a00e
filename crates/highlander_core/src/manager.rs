//! # Immortal Manager
//!
//! Owns the population and the lifecycle of its threads.
//!
//! ```text
//!   start() ──> one named OS thread per immortal
//!                 │
//!   pause() ──────┼──> barrier.pause(): returns once every thread is parked
//!   resume() ─────┼──> barrier.resume()
//!                 │
//!   stop() ───────┴──> clear running flags
//!                      barrier.resume()          (parked threads must see the flags)
//!                      wait for exit notices     (bounded by stop_timeout)
//!                      timeout? interrupt, join what finished, detach the rest
//! ```
//!
//! `stop()` never fails from the caller's point of view. Threads that could
//! not be joined (only possible with [`FightMode::Naive`] deadlocks) are
//! logged and left behind; the manager then refuses to start again because
//! those threads still hold fight locks.
//!
//! [`FightMode::Naive`]: crate::config::FightMode::Naive

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;

use crate::arena::Arena;
use crate::config::{FightMode, SimulationConfig};
use crate::error::{SimulationError, SimulationResult};
use crate::immortal::{self, ImmortalSnapshot};

/// Extra time granted to threads after a forced interrupt.
const INTERRUPT_GRACE: Duration = Duration::from_millis(100);

/// Sends the immortal's index when its task ends, panics included.
struct ExitNotice {
    tx: Sender<usize>,
    index: usize,
}

impl Drop for ExitNotice {
    fn drop(&mut self) {
        let _ = self.tx.send(self.index);
    }
}

/// Threads of the current run.
struct ActiveRun {
    handles: Vec<(usize, JoinHandle<()>)>,
    exits: Receiver<usize>,
}

/// Lifecycle manager for one population.
///
/// ## Usage
///
/// ```rust,no_run
/// use highlander_core::{FightMode, ImmortalManager};
///
/// let manager = ImmortalManager::with_defaults(10, FightMode::Ordered, 100, 10)?;
/// manager.start()?;
///
/// manager.pause();
/// let total = manager.total_health(); // exact while paused
/// manager.resume();
///
/// manager.stop();
/// # Ok::<(), highlander_core::SimulationError>(())
/// ```
pub struct ImmortalManager {
    arena: Arc<Arena>,
    config: SimulationConfig,
    run: Mutex<Option<ActiveRun>>,
    /// Threads abandoned by a timed-out stop.
    stranded: AtomicUsize,
}

impl ImmortalManager {
    /// Builds a population from a config.
    ///
    /// # Errors
    ///
    /// Returns the validation error of an out-of-range config.
    pub fn new(config: SimulationConfig) -> SimulationResult<Self> {
        config.validate()?;
        Ok(Self {
            arena: Arc::new(Arena::new(&config)),
            config,
            run: Mutex::new(None),
            stranded: AtomicUsize::new(0),
        })
    }

    /// Builds a population from the four operator-facing parameters.
    ///
    /// # Errors
    ///
    /// Same as [`Self::new`].
    pub fn with_defaults(
        population: usize,
        fight_mode: FightMode,
        initial_health: i32,
        damage: i32,
    ) -> SimulationResult<Self> {
        Self::new(SimulationConfig::new(population, fight_mode, initial_health, damage))
    }

    /// Spawns one thread per immortal. An active run is stopped first.
    ///
    /// # Errors
    ///
    /// - [`SimulationError::Spawn`] if the OS refuses a thread; the partial
    ///   run is stopped before returning.
    /// - [`SimulationError::Poisoned`] if a previous stop left threads behind.
    pub fn start(&self) -> SimulationResult<()> {
        let mut run = self.run.lock();
        if let Some(active) = run.take() {
            self.shutdown(active);
        }

        let stranded = self.stranded.load(Ordering::Acquire);
        if stranded > 0 {
            return Err(SimulationError::Poisoned { stranded });
        }

        let base_seed = self.config.seed.unwrap_or_else(clock_seed);
        let (tx, exits) = crossbeam_channel::unbounded();

        for im in self.arena.immortals() {
            im.arm();
        }

        let mut handles = Vec::with_capacity(self.arena.len());
        for im in self.arena.immortals() {
            let index = im.index();
            let arena = Arc::clone(&self.arena);
            let notice = ExitNotice {
                tx: tx.clone(),
                index,
            };
            let seed = task_seed(base_seed, index);

            let spawned = thread::Builder::new()
                .name(im.name().to_owned())
                .spawn(move || {
                    let _notice = notice;
                    immortal::run(&arena, index, seed);
                });

            match spawned {
                Ok(handle) => handles.push((index, handle)),
                Err(source) => {
                    drop(tx);
                    self.shutdown(ActiveRun { handles, exits });
                    return Err(SimulationError::Spawn {
                        name: im.name().to_owned(),
                        source,
                    });
                }
            }
        }
        drop(tx);

        tracing::info!(
            population = self.arena.len(),
            fight_mode = %self.config.fight_mode,
            health = self.config.initial_health,
            damage = self.config.damage,
            "population started"
        );

        *run = Some(ActiveRun { handles, exits });
        Ok(())
    }

    /// Blocks until every immortal thread is parked. No-op without an active run.
    pub fn pause(&self) {
        if !self.is_running() {
            return;
        }
        self.arena.barrier().pause();
        tracing::debug!(total_health = self.total_health(), "population paused");
    }

    /// [`Self::pause`] with an upper bound. Returns `false` if some thread
    /// never reached its waitpoint in time (the barrier stays paused).
    pub fn pause_for(&self, timeout: Duration) -> bool {
        if !self.is_running() {
            return true;
        }
        self.arena.barrier().pause_for(timeout)
    }

    /// Releases every parked thread.
    pub fn resume(&self) {
        self.arena.barrier().resume();
        tracing::debug!("population resumed");
    }

    /// Pauses (twice, to re-confirm quiescence) and returns a consistent
    /// report. The population stays paused; call [`Self::resume`] after.
    pub fn pause_and_check(&self) -> PopulationReport {
        self.pause();
        self.pause();
        PopulationReport {
            immortals: self.population_snapshot(),
            total_health: self.total_health(),
            alive: self.alive_count(),
            fights: self.scoreboard_total(),
        }
    }

    /// Stops every thread and waits for them, bounded by the stop timeout.
    ///
    /// Idempotent. Never fails: a timeout is logged and escalated to a
    /// forced interrupt.
    pub fn stop(&self) {
        let active = self.run.lock().take();
        if let Some(active) = active {
            self.shutdown(active);
        }
    }

    fn shutdown(&self, active: ActiveRun) {
        for im in self.arena.immortals() {
            im.stop();
        }
        self.arena.barrier().resume();

        let ActiveRun { handles, exits } = active;
        let mut pending = vec![false; self.arena.len()];
        for (index, _) in &handles {
            pending[*index] = true;
        }
        let mut remaining = handles.len();

        remaining = drain_exits(
            &exits,
            &mut pending,
            remaining,
            Instant::now() + self.config.stop_timeout(),
        );

        if remaining > 0 {
            tracing::warn!(
                remaining,
                timeout_ms = self.config.stop_timeout_ms,
                "stop timed out, forcing cancellation"
            );
            self.arena.barrier().interrupt();
            remaining = drain_exits(&exits, &mut pending, remaining, Instant::now() + INTERRUPT_GRACE);
        }

        let mut abandoned = 0;
        for (index, handle) in handles {
            if pending[index] && !handle.is_finished() {
                // Blocked on a fight lock forever; joining would hang.
                abandoned += 1;
                drop(handle);
                continue;
            }
            if handle.join().is_err() {
                tracing::warn!(index, "immortal thread panicked");
            }
        }

        if abandoned > 0 {
            self.stranded.fetch_add(abandoned, Ordering::AcqRel);
            tracing::warn!(abandoned, "threads abandoned after forced cancellation");
        }

        tracing::info!(
            total_health = self.total_health(),
            alive = self.alive_count(),
            fights = self.scoreboard_total(),
            "population stopped"
        );
    }

    /// Value copies of every immortal, in construction order.
    #[must_use]
    pub fn population_snapshot(&self) -> Vec<ImmortalSnapshot> {
        self.arena.immortals().iter().map(immortal::Immortal::snapshot).collect()
    }

    /// Sum of all health values. Exact only while paused or stopped.
    #[must_use]
    pub fn total_health(&self) -> i64 {
        self.arena.total_health()
    }

    /// Number of immortals with `health > 0`. Exact only while paused or stopped.
    #[must_use]
    pub fn alive_count(&self) -> usize {
        self.arena.alive_count()
    }

    /// Completed fights so far.
    #[must_use]
    pub fn scoreboard_total(&self) -> u64 {
        self.arena.scoreboard().total_fights()
    }

    /// Possibly stale pause flag, for refresh gating only.
    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.arena.barrier().is_paused()
    }

    /// Whether a run is active.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.run.lock().is_some()
    }

    /// Threads abandoned by timed-out stops.
    #[must_use]
    pub fn stranded_threads(&self) -> usize {
        self.stranded.load(Ordering::Acquire)
    }

    /// The validated construction config.
    #[must_use]
    pub const fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// The shared population.
    #[must_use]
    pub fn arena(&self) -> &Arena {
        &self.arena
    }

    /// Owned handle to the shared population; outlives the manager.
    #[must_use]
    pub fn shared_arena(&self) -> Arc<Arena> {
        Arc::clone(&self.arena)
    }
}

impl Drop for ImmortalManager {
    fn drop(&mut self) {
        self.stop();
    }
}

impl fmt::Debug for ImmortalManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImmortalManager")
            .field("population", &self.arena.len())
            .field("fight_mode", &self.config.fight_mode)
            .field("running", &self.is_running())
            .field("stranded", &self.stranded_threads())
            .finish()
    }
}

/// Receives exit notices until `remaining` hits zero or `deadline` passes.
fn drain_exits(
    exits: &Receiver<usize>,
    pending: &mut [bool],
    mut remaining: usize,
    deadline: Instant,
) -> usize {
    while remaining > 0 {
        match exits.recv_deadline(deadline) {
            Ok(index) => {
                if pending.get(index).copied().unwrap_or(false) {
                    pending[index] = false;
                    remaining -= 1;
                }
            }
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => break,
        }
    }
    remaining
}

fn clock_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_nanos() as u64)
}

fn task_seed(base: u64, index: usize) -> u64 {
    base ^ (index as u64).wrapping_add(1).wrapping_mul(0x9E37_79B9_7F4A_7C15)
}

/// Consistent view of a paused population.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PopulationReport {
    /// Every immortal, in construction order.
    pub immortals: Vec<ImmortalSnapshot>,
    /// Sum of health values.
    pub total_health: i64,
    /// Immortals with `health > 0`.
    pub alive: usize,
    /// Completed fights.
    pub fights: u64,
}

impl fmt::Display for PopulationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for im in &self.immortals {
            writeln!(f, "{:<14} : {:>5}", im.name, im.health)?;
        }
        writeln!(f, "--------------------------------")?;
        writeln!(f, "Total Health: {}", self.total_health)?;
        writeln!(f, "Alive: {}/{}", self.alive, self.immortals.len())?;
        write!(f, "Score (fights): {}", self.fights)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::immortal::Immortal;

    fn manager(n: usize) -> ImmortalManager {
        ImmortalManager::new(SimulationConfig::new(n, FightMode::Ordered, 100, 10).with_seed(7))
            .unwrap()
    }

    #[test]
    fn test_rejects_invalid_config() {
        assert!(matches!(
            ImmortalManager::with_defaults(0, FightMode::Ordered, 100, 10),
            Err(SimulationError::InvalidPopulation(0))
        ));
        assert!(matches!(
            ImmortalManager::with_defaults(3, FightMode::Ordered, -5, 10),
            Err(SimulationError::InvalidHealth(-5))
        ));
    }

    #[test]
    fn test_stop_without_start_is_noop() {
        let m = manager(4);
        m.stop();
        m.stop();
        assert!(!m.is_running());
        assert_eq!(m.total_health(), 400);
    }

    #[test]
    fn test_pause_without_run_returns() {
        let m = manager(4);
        m.pause();
        assert!(!m.is_paused());
        assert!(m.pause_for(Duration::from_millis(10)));
    }

    #[test]
    fn test_start_pause_resume_stop() {
        let m = manager(6);
        m.start().unwrap();
        assert!(m.is_running());
        assert!(m.population_snapshot().iter().all(|s| s.running));

        thread::sleep(Duration::from_millis(20));
        m.pause();
        assert!(m.is_paused());
        assert_eq!(m.arena().barrier().waiting(), 6);

        m.resume();
        m.stop();
        assert!(!m.is_running());
        assert!(m.population_snapshot().iter().all(|s| !s.running));
        assert_eq!(m.arena().barrier().waiting(), 0);
        assert_eq!(m.stranded_threads(), 0);
    }

    #[test]
    fn test_report_is_consistent() {
        let m = manager(5);
        m.start().unwrap();
        thread::sleep(Duration::from_millis(20));

        let report = m.pause_and_check();
        let sum: i64 = report.immortals.iter().map(|s| i64::from(s.health)).sum();
        assert_eq!(report.total_health, sum);
        assert_eq!(report.immortals.len(), 5);
        assert_eq!(report.fights, m.scoreboard_total());

        let rendered = report.to_string();
        assert!(rendered.contains("Immortal-0"));
        assert!(rendered.contains(&format!("Total Health: {sum}")));

        m.resume();
        m.stop();
    }

    #[test]
    fn test_forced_cancellation_strands_blocked_threads() {
        let m = ImmortalManager::new(
            SimulationConfig::new(2, FightMode::Ordered, 100, 10)
                .with_seed(7)
                .with_stop_timeout(Duration::from_millis(100)),
        )
        .unwrap();
        m.start().unwrap();

        // Every fight of a pair involves Immortal-0, so both tasks block here.
        let held = m.arena().immortals()[0].hold_fight_lock();
        thread::sleep(Duration::from_millis(50));

        let started = Instant::now();
        m.stop();
        assert!(started.elapsed() >= m.config().stop_timeout());
        assert!(started.elapsed() < Duration::from_secs(2));
        assert!(!m.is_running());
        assert_eq!(m.stranded_threads(), 2);
        assert!(matches!(m.start(), Err(SimulationError::Poisoned { stranded: 2 })));
        assert!(!m.is_running());

        drop(held);
    }

    #[test]
    fn test_running_flags_follow_the_manager() {
        let m = manager(4);
        m.start().unwrap();
        assert!(m.arena().immortals().iter().all(Immortal::is_running));

        // Every task stays counted, so a pause always completes.
        thread::sleep(Duration::from_millis(10));
        assert!(m.pause_for(Duration::from_secs(5)));
        assert_eq!(m.arena().barrier().waiting(), m.arena().barrier().registered());
        m.resume();

        m.stop();
        assert!(m.arena().immortals().iter().all(|im| !im.is_running()));
    }

    #[test]
    fn test_task_seeds_differ_per_index() {
        assert_ne!(task_seed(42, 0), task_seed(42, 1));
        assert_eq!(task_seed(42, 3), task_seed(42, 3));
    }
}
