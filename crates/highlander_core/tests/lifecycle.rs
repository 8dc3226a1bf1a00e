//! # Lifecycle Tests
//!
//! start / pause / resume / stop in every order an operator can press them.

use std::thread;
use std::time::{Duration, Instant};

use highlander_core::{FightMode, ImmortalManager, SimulationConfig, SimulationError};

fn manager(n: usize) -> ImmortalManager {
    ImmortalManager::new(
        SimulationConfig::new(n, FightMode::Ordered, 100, 10)
            .with_seed(99)
            .with_stop_timeout(Duration::from_secs(5)),
    )
    .unwrap()
}

#[test]
fn test_starts_and_stops() {
    let m = manager(8);
    m.start().unwrap();
    thread::sleep(Duration::from_millis(50));
    m.pause();
    let sum = m.total_health();
    m.resume();
    m.stop();
    assert!(sum > 0);
}

#[test]
fn test_stop_works_while_paused() {
    let m = manager(10);
    m.start().unwrap();
    m.pause();
    assert!(m.is_paused());

    let started = Instant::now();
    m.stop();
    assert!(started.elapsed() < m.config().stop_timeout());

    for im in m.population_snapshot() {
        assert!(!im.running, "{} must be stopped even if it was paused", im.name);
    }
    assert!(!m.is_paused());
    assert_eq!(m.arena().barrier().waiting(), 0);
    assert_eq!(m.stranded_threads(), 0);
}

#[test]
fn test_stop_is_idempotent() {
    let m = manager(4);
    m.stop();
    m.start().unwrap();
    m.stop();
    m.stop();
    assert!(!m.is_running());
    assert_eq!(m.stranded_threads(), 0);
}

#[test]
fn test_start_twice_replaces_the_active_run() {
    let m = manager(6);
    m.start().unwrap();
    thread::sleep(Duration::from_millis(10));
    m.start().unwrap();
    assert!(m.is_running());
    assert!(m.population_snapshot().iter().all(|s| s.running));

    m.pause();
    assert_eq!(m.arena().barrier().waiting(), 6);
    m.resume();
    m.stop();
}

#[test]
fn test_restart_after_stop_keeps_fighting() {
    let m = manager(6);
    m.start().unwrap();
    thread::sleep(Duration::from_millis(10));
    m.stop();
    let fights = m.scoreboard_total();

    m.start().unwrap();
    thread::sleep(Duration::from_millis(10));
    m.pause();
    assert!(m.scoreboard_total() >= fights);
    m.resume();
    m.stop();
    assert!(m.population_snapshot().iter().all(|s| !s.running));
}

#[test]
fn test_restart_while_paused_releases_the_old_run() {
    let m = manager(5);
    m.start().unwrap();
    m.pause();
    m.start().unwrap();
    assert!(!m.is_paused());
    m.pause();
    assert_eq!(m.arena().barrier().waiting(), 5);
    m.resume();
    m.stop();
}

#[test]
fn test_single_immortal_has_nobody_to_fight() {
    let m = manager(1);
    m.start().unwrap();
    thread::sleep(Duration::from_millis(20));
    m.pause();
    assert_eq!(m.scoreboard_total(), 0);
    assert_eq!(m.total_health(), 100);
    m.resume();
    m.stop();
}

#[test]
fn test_population_runs_down_to_a_survivor() {
    let m = manager(4);
    m.start().unwrap();

    let deadline = Instant::now() + Duration::from_secs(5);
    while m.alive_count() > 1 && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(5));
    }

    // The lone survivor keeps honouring pause and stop.
    m.pause();
    assert_eq!(m.alive_count(), 1);
    m.resume();
    m.stop();
    assert_eq!(m.stranded_threads(), 0);
}

#[test]
fn test_drop_stops_the_run() {
    let m = manager(6);
    let arena = m.shared_arena();
    m.start().unwrap();
    thread::sleep(Duration::from_millis(10));
    m.pause();
    drop(m);

    assert!(arena.immortals().iter().all(|im| !im.is_running()));
    assert!(!arena.barrier().is_paused());
    assert_eq!(arena.barrier().waiting(), 0);
}

#[test]
fn test_invalid_population_is_rejected() {
    assert!(matches!(
        ImmortalManager::with_defaults(0, FightMode::Ordered, 100, 10),
        Err(SimulationError::InvalidPopulation(0))
    ));
    assert!(matches!(
        ImmortalManager::with_defaults(2, FightMode::Naive, 100, -3),
        Err(SimulationError::InvalidDamage(-3))
    ));
}
