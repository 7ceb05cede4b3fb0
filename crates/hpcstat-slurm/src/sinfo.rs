//! Query allocated nodes via sinfo.

use crate::types::NodeSnapshot;
use hpcstat_hosts::Host;
use hpcstat_parsers::{
    CommandError, parse_f64_field, parse_memory_mb, run_command_with_timeout,
    split_delimited,
};
use std::collections::HashSet;
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;

#[derive(Error, Debug)]
pub enum SinfoError {
    #[error(transparent)]
    Command(#[from] CommandError),
    #[error("Failed to parse sinfo output: {0}")]
    ParseError(String),
}

/// sinfo output format (one row per node and partition):
/// %N - Node name
/// %O - CPU load
/// %c - CPUs
/// %e - Free memory (MB)
/// %m - Memory (MB)
/// %a - Partition availability
/// %t - State (compact)
/// %E - Reason
/// %G - Generic resources
const SINFO_FORMAT: &str = "%N|%O|%c|%e|%m|%a|%t|%E|%G";

/// Nodes whose name, reason or generic resources mention one of these are
/// left out of usage reports.
pub const DEFAULT_EXCLUSIONS: &[&str] = &["a100", "shared", "rn"];

/// Parse a single line of sinfo output.
fn parse_sinfo_line(line: &str) -> Result<(NodeSnapshot, String), SinfoError> {
    let fields = split_delimited(line, 9).map_err(SinfoError::ParseError)?;

    if fields[0].is_empty() {
        return Err(SinfoError::ParseError(format!("missing node name: {}", line)));
    }
    let cpus = fields[2]
        .parse()
        .map_err(|_| SinfoError::ParseError(format!("bad CPU count '{}': {}", fields[2], line)))?;

    let node = NodeSnapshot {
        host: Host::from(fields[0]),
        cpu_load: parse_f64_field(fields[1]),
        cpus,
        free_mem_mb: parse_memory_mb(fields[3]),
        total_mem_mb: parse_memory_mb(fields[4]),
        state: fields[6].to_string(),
    };
    let tags = format!("{} {} {}", fields[0], fields[7], fields[8]);
    Ok((node, tags))
}

fn is_allocated(state: &str) -> bool {
    // sinfo appends flags such as `*` (not responding) or `#` (powering up)
    state.starts_with("alloc")
}

/// Parse sinfo output into the allocated, non-excluded nodes.
///
/// Rows repeated for each partition a node belongs to collapse to the first.
pub fn parse_sinfo(output: &str, exclusions: &[&str]) -> Vec<NodeSnapshot> {
    let mut seen = HashSet::new();
    let mut nodes = Vec::new();

    for line in output.lines() {
        if line.trim().is_empty() {
            continue;
        }
        let (node, tags) = match parse_sinfo_line(line) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!("Failed to parse sinfo line: {}", e);
                continue;
            }
        };
        if !is_allocated(&node.state) {
            continue;
        }
        if exclusions.iter().any(|pat| tags.contains(pat)) {
            tracing::debug!("excluding {} ({})", node.host, tags.trim());
            continue;
        }
        if seen.insert(node.host.clone()) {
            nodes.push(node);
        }
    }

    nodes
}

/// Query allocated nodes with sinfo.
pub async fn query_sinfo(
    sinfo: &str,
    exclusions: &[&str],
    limit: Duration,
) -> Result<Vec<NodeSnapshot>, SinfoError> {
    let mut cmd = Command::new(sinfo);
    cmd.args(["-a", "--Node", "-h", "-o", SINFO_FORMAT]);

    let stdout = run_command_with_timeout(&mut cmd, "sinfo", limit).await?;
    let nodes = parse_sinfo(&stdout, exclusions);
    tracing::info!("sinfo reported {} allocated nodes", nodes.len());
    Ok(nodes)
}
