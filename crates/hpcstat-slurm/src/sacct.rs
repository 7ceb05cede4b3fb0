//! Look up finished job windows via sacct.

use crate::types::JobWindow;
use chrono::NaiveDateTime;
use hpcstat_parsers::{
    CommandError, non_empty_string, parse_slurm_timestamp, run_command_with_timeout,
    split_delimited,
};
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;

#[derive(Error, Debug)]
pub enum SacctError {
    #[error(transparent)]
    Command(#[from] CommandError),
    #[error("Failed to parse sacct output: {0}")]
    ParseError(String),
    #[error("sacct has no record of job {0}")]
    NotFound(String),
    #[error("job {0} has not started")]
    NotStarted(String),
    #[error("job {0} is still running; energy can only be estimated for finished jobs")]
    StillRunning(String),
}

/// sacct output format (--parsable2 uses | delimiter)
/// JobIDRaw, User, Partition, Start, End, AllocNodes, NodeList
const SACCT_FORMAT: &str = "JobIDRaw,User,Partition,Start,End,AllocNodes,NodeList";

fn parse_naive(s: &str) -> Option<NaiveDateTime> {
    parse_slurm_timestamp(s).map(|dt| dt.naive_utc())
}

/// Parse a single line of sacct output.
fn parse_sacct_line(line: &str) -> Result<JobWindow, SacctError> {
    let fields = split_delimited(line, 7).map_err(SacctError::ParseError)?;

    let alloc_nodes = fields[5].parse().map_err(|_| {
        SacctError::ParseError(format!("bad AllocNodes '{}': {}", fields[5], line))
    })?;

    Ok(JobWindow {
        job_id: fields[0].to_string(),
        user: fields[1].to_string(),
        partition: fields[2].to_string(),
        start: parse_naive(fields[3]),
        end: parse_naive(fields[4]),
        alloc_nodes,
        nodelist: non_empty_string(fields[6]).unwrap_or_default(),
    })
}

/// Pick the allocation line for `job_id` out of sacct output.
pub fn parse_job_window(output: &str, job_id: &str) -> Result<JobWindow, SacctError> {
    for line in output.lines() {
        if line.trim().is_empty() {
            continue;
        }
        match parse_sacct_line(line) {
            Ok(window) if window.job_id == job_id => return Ok(window),
            Ok(_) => {}
            Err(e) => tracing::warn!("Failed to parse sacct line: {}", e),
        }
    }
    Err(SacctError::NotFound(job_id.to_string()))
}

impl JobWindow {
    /// Start and end of a job that has finished.
    pub fn finished_bounds(&self) -> Result<(NaiveDateTime, NaiveDateTime), SacctError> {
        match (self.start, self.end) {
            (Some(start), Some(end)) => Ok((start, end)),
            (Some(_), None) => Err(SacctError::StillRunning(self.job_id.clone())),
            (None, _) => Err(SacctError::NotStarted(self.job_id.clone())),
        }
    }
}

/// Query the allocation window of one job.
pub async fn query_job_window(
    sacct: &str,
    job_id: &str,
    limit: Duration,
) -> Result<JobWindow, SacctError> {
    let mut cmd = Command::new(sacct);
    cmd.args([
        "-j",
        job_id,
        "-X",
        "--noheader",
        "--parsable2",
        "--format",
        SACCT_FORMAT,
    ]);

    let stdout = run_command_with_timeout(&mut cmd, "sacct", limit).await?;
    parse_job_window(&stdout, job_id)
}
