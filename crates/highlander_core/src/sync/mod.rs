//! # Synchronization Primitives
//!
//! ## The Problem
//!
//! ```text
//! Immortal threads 1..N:  mutate health continuously
//! Operator:               wants a consistent snapshot of every health value
//!
//! Without a rendezvous:   the snapshot races with in-flight fights
//! With one global lock:   every fight serializes, parallelism is gone
//! ```
//!
//! ## The Solution: Rendezvous Pause
//!
//! ```text
//! operator: pause()  ──> blocks until waiting == registered
//! immortal: waitpoint() between fights ──> parks while paused
//! operator: resume() ──> releases every parked immortal at once
//! ```
//!
//! Fights keep per-immortal locks; only the pause path is global.

mod pause_barrier;

pub use pause_barrier::PauseBarrier;
