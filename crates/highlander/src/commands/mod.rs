//! Subcommand handlers.

pub mod blacklist;
pub mod run;

pub use blacklist::BlacklistArgs;
pub use run::RunArgs;
