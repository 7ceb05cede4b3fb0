//! `hpcstat usage` and `hpcstat jobs`.

use super::emit;
use crate::collect::collect_samples;
use hpcstat_cli::{Tools, UsageArgs};
use hpcstat_hosts::{Host, PoolTable};
use hpcstat_output::{Align, Table, fmt_opt, fmt_value};
use hpcstat_slurm::{query_sinfo, query_squeue};
use hpcstat_usage::{
    HostRow, JobMetricRow, aggregate_by_job, ambiguous_users, build_host_rows, join,
};
use miette::{IntoDiagnostic, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Report {
    /// One row per allocated node
    Nodes,
    /// One row per job
    Jobs,
}

pub async fn run(args: &UsageArgs, report: Report, tools: &Tools, pools: &PoolTable) -> Result<()> {
    let filter = args.filter.to_filter();
    let collect = args.collect.to_config().into_diagnostic()?;

    let mut nodes = query_sinfo(&tools.sinfo, &args.exclusions(), tools.timeout)
        .await
        .into_diagnostic()?;
    if let Some(node) = &filter.node {
        nodes.retain(|n| n.host.as_str() == node);
    }
    let hosts: Vec<Host> = nodes.iter().map(|n| n.host.clone()).collect();

    let jobs = query_squeue(&tools.squeue, &hosts, tools.timeout)
        .await
        .into_diagnostic()?;
    let joined = join(&jobs, &hosts);

    for ambiguous in ambiguous_users(jobs.iter().map(|j| j.user.as_str()), collect.user_match) {
        tracing::warn!("{}", ambiguous);
    }

    // Only nodes running a job have an owner whose processes count.
    let busy: Vec<Host> = joined
        .assignments
        .iter()
        .filter(|(_, job)| job.is_some())
        .map(|(host, _)| host.clone())
        .collect();
    let samples = collect_samples(&tools.ssh, &busy, &collect).await;

    let rows = build_host_rows(&nodes, &joined, &jobs, &samples, pools, collect.user_match);

    match report {
        Report::Nodes => {
            let rows = filter.apply_hosts(rows);
            emit("usage", &host_table(&rows), args.output_dir.as_deref())
        }
        Report::Jobs => {
            let (job_rows, _) = aggregate_by_job(&rows);
            let job_rows = filter.apply_jobs(job_rows);
            emit("jobs", &job_table(&job_rows), args.output_dir.as_deref())
        }
    }
}

fn text(value: &Option<String>) -> String {
    value.clone().unwrap_or_default()
}

pub fn host_table(rows: &[HostRow]) -> Table {
    use Align::{Left, Right};

    let mut table = Table::new([
        "Node",
        "Job ID",
        "User",
        "Partition",
        "Job Name",
        "Elapsed",
        "CPU Load",
        "CPU %",
        "Mem %",
        "Cores Used",
        "Cores",
        "Memory (GB)",
    ])
    .with_align(&[
        Left, Left, Left, Left, Left, Right, Right, Right, Right, Right, Right, Right,
    ]);

    for row in rows {
        table.push_row([
            row.host.to_string(),
            text(&row.job_id),
            text(&row.user),
            text(&row.partition),
            text(&row.job_name),
            text(&row.elapsed),
            fmt_opt(row.cpu_load, 2),
            fmt_opt(row.cpu_used_pct, 2),
            fmt_opt(row.mem_used_pct, 2),
            fmt_opt(row.cores_used, 2),
            row.cores_available.to_string(),
            fmt_opt(row.memory_used_gb, 2),
        ]);
    }
    table
}

pub fn job_table(rows: &[JobMetricRow]) -> Table {
    use Align::{Left, Right};

    let mut table = Table::new([
        "Job ID",
        "User",
        "Partition",
        "Nodes",
        "Cores Used",
        "Cores",
        "Memory (GB)",
        "Efficiency %",
        "Note",
    ])
    .with_align(&[Left, Left, Left, Right, Right, Right, Right, Right, Left]);

    for row in rows {
        let mut notes = Vec::new();
        if row.partial {
            notes.push("partial");
        }
        if row.inconsistent {
            notes.push("inconsistent");
        }
        table.push_row([
            row.job_id.clone(),
            text(&row.user),
            text(&row.partition),
            row.node_count.to_string(),
            fmt_value(row.cores_used, 2),
            row.cores_available.to_string(),
            fmt_value(row.memory_used_gb, 2),
            row.efficiency.to_string(),
            notes.join(", "),
        ]);
    }
    table
}
