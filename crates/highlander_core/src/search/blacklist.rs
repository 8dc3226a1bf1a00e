//! # Host Blacklist Validator
//!
//! Fork/join scan of a fixed list of blacklist sources.
//!
//! ```text
//!   sources: [0 ........ k) [k ........ 2k) ... [(w-1)k ........ len)
//!               worker 0       worker 1            worker w-1 (takes the remainder)
//!
//!   every hit: alarms.fetch_add(1)
//!   every worker stops once alarms >= threshold
//! ```
//!
//! Workers that were already checking a source when the threshold was
//! crossed elsewhere still report their hit, so the result can hold up to
//! `workers - 1` more indices than the threshold.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use parking_lot::Mutex;

use crate::error::{SimulationError, SimulationResult};

/// Matches after which a host is considered untrustworthy and the scan stops.
pub const BLACKLIST_ALARM_COUNT: usize = 5;

/// One blacklist server.
pub trait BlacklistSource: Send + Sync {
    /// Whether this source lists `host`.
    fn is_blacklisted(&self, host: &str) -> bool;
}

/// In-memory source listing a fixed set of hosts.
#[derive(Clone, Debug, Default)]
pub struct StaticBlacklist {
    hosts: Vec<String>,
}

impl StaticBlacklist {
    /// Source listing exactly `hosts`.
    #[must_use]
    pub fn new<I, S>(hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            hosts: hosts.into_iter().map(Into::into).collect(),
        }
    }

    /// Source listing nothing.
    #[must_use]
    pub const fn empty() -> Self {
        Self { hosts: Vec::new() }
    }
}

impl BlacklistSource for StaticBlacklist {
    fn is_blacklisted(&self, host: &str) -> bool {
        self.hosts.iter().any(|h| h == host)
    }
}

/// Partitioned parallel check of a host against every source.
pub struct HostBlacklistValidator {
    sources: Vec<Arc<dyn BlacklistSource>>,
    alarm_threshold: usize,
}

impl HostBlacklistValidator {
    /// Validator over `sources` with the default alarm threshold.
    #[must_use]
    pub fn new(sources: Vec<Arc<dyn BlacklistSource>>) -> Self {
        Self {
            sources,
            alarm_threshold: BLACKLIST_ALARM_COUNT,
        }
    }

    /// Overrides the alarm threshold.
    #[must_use]
    pub fn with_alarm_threshold(mut self, threshold: usize) -> Self {
        self.alarm_threshold = threshold;
        self
    }

    /// Number of sources.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    /// True when there is nothing to scan.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Current alarm threshold.
    #[must_use]
    pub const fn alarm_threshold(&self) -> usize {
        self.alarm_threshold
    }

    /// Scans all sources for `host` on `workers` threads.
    ///
    /// Returns the sorted indices of the sources listing `host`. `workers`
    /// is clamped to the number of sources.
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError::InvalidWorkerCount`] for zero workers.
    pub fn check_host(&self, host: &str, workers: usize) -> SimulationResult<Vec<usize>> {
        if workers == 0 {
            return Err(SimulationError::InvalidWorkerCount(workers));
        }
        if self.sources.is_empty() {
            return Ok(Vec::new());
        }

        let workers = workers.min(self.sources.len());
        let per_worker = self.sources.len() / workers;
        let alarms = AtomicUsize::new(0);
        let found = Mutex::new(Vec::new());

        thread::scope(|scope| {
            for w in 0..workers {
                let start = w * per_worker;
                let end = if w == workers - 1 {
                    self.sources.len()
                } else {
                    start + per_worker
                };
                let alarms = &alarms;
                let found = &found;

                scope.spawn(move || {
                    for (offset, source) in self.sources[start..end].iter().enumerate() {
                        if alarms.load(Ordering::Acquire) >= self.alarm_threshold {
                            break;
                        }
                        if source.is_blacklisted(host) {
                            let count = alarms.fetch_add(1, Ordering::AcqRel) + 1;
                            found.lock().push(start + offset);
                            if count >= self.alarm_threshold {
                                break;
                            }
                        }
                    }
                });
            }
        });

        let mut found = found.into_inner();
        found.sort_unstable();

        let checked = self.sources.len();
        if found.len() >= self.alarm_threshold {
            tracing::info!(host, hits = found.len(), checked, "host reported as NOT trustworthy");
        } else {
            tracing::info!(host, hits = found.len(), checked, "host reported as trustworthy");
        }

        Ok(found)
    }
}

impl std::fmt::Debug for HostBlacklistValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostBlacklistValidator")
            .field("sources", &self.sources.len())
            .field("alarm_threshold", &self.alarm_threshold)
            .finish()
    }
}
