//! Shared parsing utilities for scheduler and accounting output.
//!
//! This crate provides the small parsers and the command runner used by
//! hpcstat-slurm, hpcstat-usage and hpcstat-power.

pub mod command;
pub mod memory;
pub mod time;

pub use command::{CommandError, run_command, run_command_with_timeout};
pub use memory::{kib_to_gb, mb_to_gb, parse_memory_mb};
pub use time::{parse_duration, parse_slurm_timestamp, parse_time_of_day};

/// Filter helper for optional string fields.
/// Returns None if the string is empty or a placeholder value.
pub fn non_empty_string(s: &str) -> Option<String> {
    let trimmed = s.trim();
    if trimmed.is_empty()
        || trimmed == "-"
        || trimmed == "N/A"
        || trimmed == "Unknown"
        || trimmed == "(null)"
    {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Split a pipe-delimited line and validate field count.
pub fn split_delimited(line: &str, min_fields: usize) -> Result<Vec<&str>, String> {
    let fields: Vec<&str> = line.split('|').map(str::trim).collect();
    if fields.len() < min_fields {
        return Err(format!(
            "Expected {} fields, got {}: {}",
            min_fields,
            fields.len(),
            line
        ));
    }
    Ok(fields)
}

/// Parse a numeric field that may be padded or hold a placeholder.
///
/// `sinfo` prints `N/A` for the load of nodes that have not reported yet.
pub fn parse_f64_field(s: &str) -> Option<f64> {
    non_empty_string(s).and_then(|v| v.parse::<f64>().ok())
}
