//! `highlander blacklist`: range search over simulated servers.

use std::sync::Arc;
use std::time::Instant;

use anyhow::{ensure, Context, Result};
use clap::Args;
use highlander_core::{BlacklistSource, HostBlacklistValidator, StaticBlacklist, BLACKLIST_ALARM_COUNT};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Options of `highlander blacklist`.
#[derive(Args, Debug)]
pub struct BlacklistArgs {
    /// Host address to check
    #[arg(long)]
    pub host: String,

    /// Number of simulated blacklist servers
    #[arg(long, default_value = "10000")]
    pub servers: usize,

    /// Worker threads sharing the scan
    #[arg(short, long, default_value = "8")]
    pub workers: usize,

    /// Fraction of servers that list the host
    #[arg(long, default_value = "0.001")]
    pub listed_ratio: f64,

    /// Seed for the simulated server contents
    #[arg(long, default_value = "0")]
    pub seed: u64,

    /// Matches after which the host is untrustworthy
    #[arg(long, default_value_t = BLACKLIST_ALARM_COUNT)]
    pub alarm: usize,
}

/// Builds the simulated servers and scans them for `host`.
pub fn execute(args: &BlacklistArgs) -> Result<()> {
    ensure!(
        (0.0..=1.0).contains(&args.listed_ratio),
        "--listed-ratio must be within [0, 1], got {}",
        args.listed_ratio
    );

    let mut rng = StdRng::seed_from_u64(args.seed);
    let sources: Vec<Arc<dyn BlacklistSource>> = (0..args.servers)
        .map(|_| {
            let source: Arc<dyn BlacklistSource> = if rng.gen_bool(args.listed_ratio) {
                Arc::new(StaticBlacklist::new([args.host.as_str()]))
            } else {
                Arc::new(StaticBlacklist::empty())
            };
            source
        })
        .collect();

    let validator = HostBlacklistValidator::new(sources).with_alarm_threshold(args.alarm);

    let started = Instant::now();
    let found = validator
        .check_host(&args.host, args.workers)
        .context("Blacklist scan failed")?;
    let elapsed = started.elapsed();

    let verdict = if found.len() >= validator.alarm_threshold() {
        "NOT trustworthy"
    } else {
        "trustworthy"
    };
    println!("{}: {verdict}", args.host);
    println!("listed by {} server(s): {found:?}", found.len());
    println!("scanned {} servers on {} worker(s) in {elapsed:?}", validator.len(), args.workers);

    Ok(())
}
