//! Module-load activity log for hpcstat.
//!
//! The environment-modules system writes one syslog line per `module load`
//! command. This crate turns those lines into one record per loaded module
//! and answers questions about who loads what, and when.

pub mod parse;
pub mod stats;

pub use parse::{LogError, ModuleLoad, ParseError, parse_line, parse_log, read_log};
pub use stats::{GeneralStats, ModuleLog, UsageCount, UserActivity};
