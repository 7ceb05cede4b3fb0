//! Host-level join of jobs onto the nodes of interest.

use hpcstat_hosts::{Host, ParseError, decode_many};
use hpcstat_slurm::SlurmJob;
use std::collections::BTreeMap;
use std::fmt;

pub type JobId = String;

/// Anything that occupies a set of nodes given as a node-list expression.
pub trait Placement {
    fn job_id(&self) -> &str;
    fn nodelist(&self) -> &str;
}

impl Placement for SlurmJob {
    fn job_id(&self) -> &str {
        &self.job_id
    }

    fn nodelist(&self) -> &str {
        &self.nodelist
    }
}

/// A host claimed by more than one job. The first claimant keeps it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostConflict {
    pub host: Host,
    pub kept: JobId,
    pub rejected: JobId,
}

impl fmt::Display for HostConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "host {} is claimed by jobs {} and {}; keeping {}",
            self.host, self.kept, self.rejected, self.kept
        )
    }
}

/// A job whose node list could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinFailure {
    pub job_id: JobId,
    pub error: ParseError,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JoinResult {
    /// Every host of interest, with the job occupying it if any
    pub assignments: BTreeMap<Host, Option<JobId>>,
    pub conflicts: Vec<HostConflict>,
    pub errors: Vec<JoinFailure>,
}

impl JoinResult {
    pub fn job_for(&self, host: &Host) -> Option<&str> {
        self.assignments.get(host).and_then(|j| j.as_deref())
    }
}

/// Assign jobs to the hosts of interest.
///
/// Hosts with no job are kept with `None`. Jobs are taken in the order
/// given, so on a conflict the earlier job keeps the host.
pub fn join<P: Placement>(jobs: &[P], hosts: &[Host]) -> JoinResult {
    let mut result = JoinResult {
        assignments: hosts.iter().map(|h| (h.clone(), None)).collect(),
        ..Default::default()
    };

    for job in jobs {
        let decoded = match decode_many(job.nodelist()) {
            Ok(decoded) => decoded,
            Err(error) => {
                tracing::warn!("job {}: {}", job.job_id(), error);
                result.errors.push(JoinFailure {
                    job_id: job.job_id().to_string(),
                    error,
                });
                continue;
            }
        };

        for host in decoded {
            let Some(slot) = result.assignments.get_mut(&host) else {
                continue;
            };
            match slot {
                None => *slot = Some(job.job_id().to_string()),
                Some(kept) if *kept == job.job_id() => {}
                Some(kept) => {
                    let conflict = HostConflict {
                        host,
                        kept: kept.clone(),
                        rejected: job.job_id().to_string(),
                    };
                    tracing::warn!("{}", conflict);
                    result.conflicts.push(conflict);
                }
            }
        }
    }

    result
}
