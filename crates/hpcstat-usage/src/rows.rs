//! Assemble per-host usage rows from node snapshots, jobs and process
//! listings.

use crate::jobs::HostRow;
use crate::join::JoinResult;
use crate::samples::{ResourceSample, UserMatch, aggregate};
use hpcstat_hosts::{Host, PoolTable};
use hpcstat_parsers::mb_to_gb;
use hpcstat_slurm::{NodeSnapshot, SlurmJob};
use std::collections::{BTreeMap, HashMap};

/// Result of listing processes on one host.
#[derive(Debug, Clone, PartialEq)]
pub enum SampleOutcome {
    /// No listing was attempted; usage falls back to the node's load.
    Skipped,
    Collected(Vec<ResourceSample>),
    /// The host could not be reached or timed out.
    Failed(String),
}

fn node_fallback(node: &NodeSnapshot) -> (Option<f64>, Option<f64>) {
    let memory = match (node.total_mem_mb, node.free_mem_mb) {
        (Some(total), Some(free)) => Some(mb_to_gb(total.saturating_sub(free) as f64)),
        _ => None,
    };
    (node.cpu_load, memory)
}

/// Build one row per node, in host order.
///
/// Cores used and memory come from the job owner's processes when a listing
/// was collected, from the node's load and free memory when none was
/// attempted, and are left unavailable when the listing failed.
pub fn build_host_rows(
    nodes: &[NodeSnapshot],
    joined: &JoinResult,
    jobs: &[SlurmJob],
    samples: &BTreeMap<Host, SampleOutcome>,
    pools: &PoolTable,
    policy: UserMatch,
) -> Vec<HostRow> {
    let by_id: HashMap<&str, &SlurmJob> = jobs.iter().map(|j| (j.job_id.as_str(), j)).collect();

    let mut rows: Vec<HostRow> = nodes
        .iter()
        .map(|node| {
            let job = joined
                .job_for(&node.host)
                .and_then(|id| by_id.get(id).copied());

            let (cores_used, memory_used_gb) = match samples.get(&node.host) {
                Some(SampleOutcome::Collected(listed)) => match job {
                    Some(job) => {
                        let sums = aggregate(listed, &node.host, &job.user, policy);
                        (Some(sums.cores()), Some(sums.memory_gb))
                    }
                    None => (None, None),
                },
                Some(SampleOutcome::Failed(_)) => (None, None),
                Some(SampleOutcome::Skipped) | None => node_fallback(node),
            };

            let cores_available = if node.cpus > 0 {
                node.cpus
            } else {
                pools.cores(&node.host)
            };

            HostRow {
                host: node.host.clone(),
                job_id: job.map(|j| j.job_id.clone()),
                user: job.map(|j| j.user.clone()),
                partition: job.map(|j| j.partition.clone()),
                job_name: job.map(|j| j.name.clone()),
                elapsed: job.map(|j| j.elapsed_text.clone()),
                cpu_load: node.cpu_load,
                cpu_used_pct: node.cpu_used_pct(),
                mem_used_pct: node.mem_used_pct(),
                cores_used,
                cores_available,
                memory_used_gb,
            }
        })
        .collect();

    rows.sort_by(|a, b| a.host.cmp(&b.host));
    rows
}
