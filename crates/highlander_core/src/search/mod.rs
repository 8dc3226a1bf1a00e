//! # Parallel Range Search
//!
//! One-shot fork/join scans, independent of the immortal population.

mod blacklist;

pub use blacklist::{BlacklistSource, HostBlacklistValidator, StaticBlacklist, BLACKLIST_ALARM_COUNT};
