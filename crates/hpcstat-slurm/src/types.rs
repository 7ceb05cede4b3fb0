//! SLURM node and job types.

use chrono::NaiveDateTime;
use hpcstat_hosts::Host;
use std::time::Duration;

/// One node as reported by sinfo.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeSnapshot {
    pub host: Host,

    /// 1-minute CPU load; None when the node has not reported yet
    pub cpu_load: Option<f64>,

    /// Configured CPUs
    pub cpus: u32,

    /// Free memory (in MB)
    pub free_mem_mb: Option<u64>,

    /// Configured memory (in MB)
    pub total_mem_mb: Option<u64>,

    /// Compact state, e.g. `alloc`, `mix`, `idle`
    pub state: String,
}

impl NodeSnapshot {
    /// CPU load as a percentage of configured CPUs.
    pub fn cpu_used_pct(&self) -> Option<f64> {
        let load = self.cpu_load?;
        if self.cpus == 0 {
            return None;
        }
        Some(load / f64::from(self.cpus) * 100.0)
    }

    /// Used memory as a percentage of configured memory.
    pub fn mem_used_pct(&self) -> Option<f64> {
        let total = self.total_mem_mb?;
        let free = self.free_mem_mb?;
        if total == 0 {
            return None;
        }
        Some((total as f64 - free as f64) / total as f64 * 100.0)
    }
}

/// A job as listed by squeue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlurmJob {
    pub job_id: String,
    pub partition: String,
    pub name: String,
    pub user: String,

    /// Elapsed time as printed by squeue
    pub elapsed_text: String,

    pub elapsed: Option<Duration>,
    pub node_count: u32,

    /// Raw node-list expression, e.g. `dn[001-004]`
    pub nodelist: String,
}

/// Start and end of a job from sacct.
///
/// Timestamps are the scheduler's wall-clock times, which is also what the
/// power loggers write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobWindow {
    pub job_id: String,
    pub user: String,
    pub partition: String,
    pub start: Option<NaiveDateTime>,

    /// None while the job is still running
    pub end: Option<NaiveDateTime>,

    pub alloc_nodes: u32,
    pub nodelist: String,
}

impl JobWindow {
    pub fn is_running(&self) -> bool {
        self.start.is_some() && self.end.is_none()
    }
}
