//! Process listings from compute nodes over a login shell.

use crate::samples::{ResourceSample, UserMatch, parse_ps_output};
use hpcstat_hosts::Host;
use hpcstat_parsers::{CommandError, run_command_with_timeout};
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;

#[derive(Error, Debug)]
#[error("{host}: {source}")]
pub struct RemoteError {
    pub host: Host,
    #[source]
    pub source: CommandError,
}

fn ps_args(policy: UserMatch) -> Vec<String> {
    vec![
        "ps".to_string(),
        "-eo".to_string(),
        format!("user:{},pcpu,rss", policy.ps_width()),
        "--no-headers".to_string(),
    ]
}

/// List every process on `host` with its owner, CPU percent and RSS.
///
/// Runs `ssh -o BatchMode=yes <host> ps ...` so a host that would prompt
/// for a password fails instead of hanging.
pub async fn query_processes(
    ssh: &str,
    host: &Host,
    policy: UserMatch,
    limit: Duration,
) -> Result<Vec<ResourceSample>, RemoteError> {
    let mut cmd = Command::new(ssh);
    cmd.args(["-o", "BatchMode=yes", host.as_str()])
        .args(ps_args(policy));

    let stdout = run_command_with_timeout(&mut cmd, "ssh", limit)
        .await
        .map_err(|source| RemoteError {
            host: host.clone(),
            source,
        })?;

    let samples = parse_ps_output(host, &stdout);
    tracing::debug!("{}: {} processes", host, samples.len());
    Ok(samples)
}
