//! Query jobs running on a set of nodes via squeue.

use crate::types::SlurmJob;
use hpcstat_hosts::Host;
use hpcstat_parsers::{CommandError, parse_duration, run_command_with_timeout, split_delimited};
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;

#[derive(Error, Debug)]
pub enum SqueueError {
    #[error(transparent)]
    Command(#[from] CommandError),
    #[error("Failed to parse squeue output: {0}")]
    ParseError(String),
}

/// squeue output format:
/// %i - Job ID
/// %P - Partition
/// %j - Job name
/// %u - User
/// %M - Elapsed time
/// %D - Node count
/// %N - Nodelist
const SQUEUE_FORMAT: &str = "%i|%P|%j|%u|%M|%D|%N";

/// Parse a single line of squeue output.
fn parse_squeue_line(line: &str) -> Result<SlurmJob, SqueueError> {
    let fields = split_delimited(line, 7).map_err(SqueueError::ParseError)?;

    if fields[0].is_empty() {
        return Err(SqueueError::ParseError(format!("missing job id: {}", line)));
    }

    // Job names may contain the delimiter; the node list is always last.
    let last = fields.len() - 1;
    let node_count = fields[last - 1].parse().map_err(|_| {
        SqueueError::ParseError(format!("bad node count '{}': {}", fields[last - 1], line))
    })?;
    let name = if last > 6 {
        fields[2..last - 3].join("|")
    } else {
        fields[2].to_string()
    };

    Ok(SlurmJob {
        job_id: fields[0].to_string(),
        partition: fields[1].to_string(),
        name,
        user: fields[last - 3].to_string(),
        elapsed_text: fields[last - 2].to_string(),
        elapsed: parse_duration(fields[last - 2]),
        node_count,
        nodelist: fields[last].to_string(),
    })
}

/// Parse squeue output, skipping malformed lines with a warning.
pub fn parse_squeue(output: &str) -> Vec<SlurmJob> {
    let mut jobs = Vec::new();

    for line in output.lines() {
        if line.trim().is_empty() {
            continue;
        }
        match parse_squeue_line(line) {
            Ok(job) => jobs.push(job),
            Err(e) => tracing::warn!("Failed to parse squeue line: {}", e),
        }
    }

    jobs
}

/// Query jobs running on any of `hosts` with squeue.
pub async fn query_squeue(
    squeue: &str,
    hosts: &[Host],
    limit: Duration,
) -> Result<Vec<SlurmJob>, SqueueError> {
    if hosts.is_empty() {
        return Ok(Vec::new());
    }
    let nodelist = hosts
        .iter()
        .map(Host::as_str)
        .collect::<Vec<_>>()
        .join(",");

    let mut cmd = Command::new(squeue);
    cmd.args(["-a", "-h", "-w", &nodelist, "-o", SQUEUE_FORMAT]);

    let stdout = run_command_with_timeout(&mut cmd, "squeue", limit).await?;
    let jobs = parse_squeue(&stdout);
    tracing::info!("squeue reported {} jobs on {} nodes", jobs.len(), hosts.len());
    Ok(jobs)
}
