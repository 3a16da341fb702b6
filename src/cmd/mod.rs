//! Command line entry points.

pub mod dry_run;

pub use dry_run::{CronCheckArgs, DryRunArgs, DryRunError};
