//! # Pause Barrier
//!
//! Rendezvous pause/resume for a fixed set of registered workers.
//!
//! ## Architecture
//!
//! ```text
//!                 ┌──────────────────────────────────────┐
//!                 │             PauseBarrier             │
//!                 │                                      │
//!                 │  Mutex<BarrierState>                 │
//!                 │   paused / waiting / registered      │
//!                 │                                      │
//!                 │  Condvar resumed     Condvar all_paused
//!                 └──────┬───────────────────────┬───────┘
//!                        │                       │
//!      waitpoint() ──────┘                       └────── pause()
//!  (workers park here,                           (operator blocks here
//!   wait on `resumed`)                            until waiting == registered)
//! ```
//!
//! Exactly one mutex guards all counters, so `pause`, `resume` and
//! `waitpoint` can never lose a wakeup against each other.
//!
//! ## Invariants
//!
//! - `0 <= waiting <= registered`
//! - `all_paused` is notified when `waiting == registered` while paused
//! - `registered` only grows before any worker thread starts

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::error::{SimulationError, SimulationResult};

/// Counters protected by the barrier mutex.
#[derive(Debug, Default)]
struct BarrierState {
    paused: bool,
    waiting: usize,
    registered: usize,
    /// Bumped by `interrupt()` so parked waiters re-check cancellation.
    interrupt_epoch: u64,
}

/// Reusable pause/resume rendezvous.
///
/// ## Usage
///
/// ```rust
/// use std::sync::atomic::AtomicBool;
/// use highlander_core::PauseBarrier;
///
/// let barrier = PauseBarrier::new();
/// barrier.register();
///
/// // Worker side, between two units of work:
/// let running = AtomicBool::new(true);
/// barrier.waitpoint(&running).unwrap(); // not paused: returns at once
///
/// // Operator side:
/// barrier.resume(); // no-op while not paused
/// ```
#[derive(Debug)]
pub struct PauseBarrier {
    state: Mutex<BarrierState>,
    /// Workers wait here until `resume()` or `interrupt()`.
    resumed: Condvar,
    /// `pause()` waits here until every registered worker is parked.
    all_paused: Condvar,
    /// Lock-free mirror of `state.paused` for UI polling.
    paused_hint: AtomicBool,
}

impl Default for PauseBarrier {
    fn default() -> Self {
        Self::new()
    }
}

impl PauseBarrier {
    /// Creates a barrier with no registered workers.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(BarrierState::default()),
            resumed: Condvar::new(),
            all_paused: Condvar::new(),
            paused_hint: AtomicBool::new(false),
        }
    }

    /// Registers one more worker.
    ///
    /// Must be called once per worker before that worker's thread starts.
    pub fn register(&self) {
        self.state.lock().registered += 1;
    }

    /// Pauses every registered worker.
    ///
    /// Blocks until all of them are parked in [`Self::waitpoint`]. Calling it
    /// again while already paused simply re-confirms quiescence. Returns at
    /// once when nothing is registered.
    pub fn pause(&self) {
        let mut state = self.state.lock();
        state.paused = true;
        self.paused_hint.store(true, Ordering::Release);

        while state.waiting < state.registered {
            self.all_paused.wait(&mut state);
        }
    }

    /// Like [`Self::pause`], but gives up after `timeout`.
    ///
    /// Returns `true` once every worker is parked. On timeout the barrier
    /// stays paused (late workers still park) and `false` is returned; the
    /// caller decides whether to `resume()`.
    pub fn pause_for(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut state = self.state.lock();
        state.paused = true;
        self.paused_hint.store(true, Ordering::Release);

        while state.waiting < state.registered {
            if self.all_paused.wait_until(&mut state, deadline).timed_out() {
                return state.waiting >= state.registered;
            }
        }
        true
    }

    /// Releases every parked worker. No-op when not paused.
    ///
    /// Does not wait for the workers to actually leave the waitpoint.
    pub fn resume(&self) {
        let mut state = self.state.lock();
        if !state.paused {
            return;
        }
        state.paused = false;
        self.paused_hint.store(false, Ordering::Release);
        self.resumed.notify_all();
    }

    /// Wakes every parked worker without lifting the pause.
    ///
    /// Workers whose `running` flag is cleared leave with
    /// [`SimulationError::Interrupted`]; the others park again.
    pub fn interrupt(&self) {
        let mut state = self.state.lock();
        state.interrupt_epoch = state.interrupt_epoch.wrapping_add(1);
        self.resumed.notify_all();
    }

    /// Safe point for a worker between two units of work.
    ///
    /// Returns immediately when not paused. Otherwise the caller is counted
    /// as waiting and parks until resumed.
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError::Interrupted`] when `running` is found
    /// cleared while paused. The waiting count has already been restored.
    pub fn waitpoint(&self, running: &AtomicBool) -> SimulationResult<()> {
        let mut state = self.state.lock();

        while state.paused {
            if !running.load(Ordering::Acquire) {
                return Err(SimulationError::Interrupted);
            }

            state.waiting += 1;
            if state.waiting == state.registered {
                self.all_paused.notify_all();
            }

            let epoch = state.interrupt_epoch;
            while state.paused && state.interrupt_epoch == epoch {
                self.resumed.wait(&mut state);
            }
            state.waiting -= 1;

            if !running.load(Ordering::Acquire) {
                return Err(SimulationError::Interrupted);
            }
        }

        Ok(())
    }

    /// Non-blocking, possibly stale pause flag. Never use it for correctness.
    #[inline]
    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.paused_hint.load(Ordering::Acquire)
    }

    /// Number of workers currently parked.
    #[must_use]
    pub fn waiting(&self) -> usize {
        self.state.lock().waiting
    }

    /// Number of registered workers.
    #[must_use]
    pub fn registered(&self) -> usize {
        self.state.lock().registered
    }
}
