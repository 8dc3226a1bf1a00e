//! `highlander run`: the operator loop.

use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Args;
use highlander_core::{FightMode, ImmortalManager, SimulationConfig};
use tracing::{info, warn};

/// Options of `highlander run`. Flags override the config file.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// TOML config file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Number of immortals
    #[arg(short = 'n', long)]
    pub count: Option<usize>,

    /// Starting health of every immortal
    #[arg(long)]
    pub health: Option<i32>,

    /// Damage per hit
    #[arg(long)]
    pub damage: Option<i32>,

    /// Lock strategy (ordered, naive)
    #[arg(long)]
    pub fight: Option<FightMode>,

    /// Seed for opponent selection
    #[arg(long)]
    pub seed: Option<u64>,

    /// Total run time
    #[arg(long, default_value = "3000")]
    pub duration_ms: u64,

    /// Interval between pause-and-check reports
    #[arg(long, default_value = "1000")]
    pub check_every_ms: u64,
}

impl RunArgs {
    fn resolve_config(&self) -> Result<SimulationConfig> {
        let mut config = match &self.config {
            Some(path) => SimulationConfig::from_file(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?,
            None => SimulationConfig::default(),
        };

        if let Some(count) = self.count {
            config.population = count;
        }
        if let Some(health) = self.health {
            config.initial_health = health;
        }
        if let Some(damage) = self.damage {
            config.damage = damage;
        }
        if let Some(fight) = self.fight {
            config.fight_mode = fight;
        }
        if let Some(seed) = self.seed {
            config.seed = Some(seed);
        }

        config.validate().context("Invalid simulation parameters")?;
        Ok(config)
    }
}

/// Runs a population for `duration_ms`, reporting every `check_every_ms`.
pub fn execute(args: &RunArgs) -> Result<()> {
    let config = args.resolve_config()?;
    let check_every = Duration::from_millis(args.check_every_ms.max(1));
    let pause_timeout = config.stop_timeout();
    let naive = config.fight_mode == FightMode::Naive;

    let manager = ImmortalManager::new(config).context("Failed to build population")?;
    manager.start().context("Failed to start population")?;

    let deadline = Instant::now() + Duration::from_millis(args.duration_ms);
    let mut round = 0_u32;
    while Instant::now() < deadline {
        thread::sleep(check_every.min(deadline.saturating_duration_since(Instant::now())));
        round += 1;

        // A deadlocked naive pair never parks; a plain pause would hang.
        if naive && !manager.pause_for(pause_timeout) {
            warn!(round, "population failed to park; naive fights are deadlocked");
            break;
        }

        let report = manager.pause_and_check();
        println!("== check {round} ==\n{report}\n");
        manager.resume();
    }

    manager.stop();

    let stranded = manager.stranded_threads();
    if stranded > 0 {
        warn!(stranded, "threads left behind by a deadlock");
    }

    info!(
        total_health = manager.total_health(),
        alive = manager.alive_count(),
        fights = manager.scoreboard_total(),
        "run finished"
    );
    Ok(())
}
