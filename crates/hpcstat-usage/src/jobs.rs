//! Per-host usage rows and their roll-up into one row per job.

use crate::join::JobId;
use hpcstat_hosts::Host;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;

/// Usage of one allocated host, with the job running on it if any.
///
/// `None` in a measured field means the value could not be obtained (node
/// not reporting, host unreachable), not zero.
#[derive(Debug, Clone, PartialEq)]
pub struct HostRow {
    pub host: Host,
    pub job_id: Option<JobId>,
    pub user: Option<String>,
    pub partition: Option<String>,
    pub job_name: Option<String>,
    pub elapsed: Option<String>,
    pub cpu_load: Option<f64>,
    pub cpu_used_pct: Option<f64>,
    pub mem_used_pct: Option<f64>,
    pub cores_used: Option<f64>,
    pub cores_available: u32,
    pub memory_used_gb: Option<f64>,
}

/// Used cores as a percentage of available cores.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Efficiency {
    Percent(f64),
    Unavailable,
}

impl Efficiency {
    pub fn from_cores(used: f64, available: u32) -> Self {
        if available == 0 {
            Efficiency::Unavailable
        } else {
            Efficiency::Percent(used / f64::from(available) * 100.0)
        }
    }

    pub fn percent(&self) -> Option<f64> {
        match self {
            Efficiency::Percent(p) => Some(*p),
            Efficiency::Unavailable => None,
        }
    }
}

impl fmt::Display for Efficiency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Efficiency::Percent(p) => write!(f, "{p:.2}"),
            Efficiency::Unavailable => f.write_str("unavailable"),
        }
    }
}

/// One row per job.
#[derive(Debug, Clone, PartialEq)]
pub struct JobMetricRow {
    pub job_id: JobId,
    pub user: Option<String>,
    pub partition: Option<String>,
    pub node_count: usize,
    pub cores_used: f64,
    pub cores_available: u32,
    pub memory_used_gb: f64,
    pub efficiency: Efficiency,
    /// Some hosts had no usage figures; the sums cover the rest
    pub partial: bool,
    /// Hosts disagreed on user or partition
    pub inconsistent: bool,
}

/// Hosts of one job disagree on a field that should be shared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsistencyWarning {
    pub job_id: JobId,
    pub field: &'static str,
    pub kept: String,
    pub other: String,
    pub host: Host,
}

impl fmt::Display for ConsistencyWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "job {}: {} '{}' on {} differs from '{}'; keeping '{}'",
            self.job_id, self.field, self.other, self.host, self.kept, self.kept
        )
    }
}

fn leading_number(id: &str) -> Option<u64> {
    let end = id.find(|c: char| !c.is_ascii_digit()).unwrap_or(id.len());
    id[..end].parse().ok()
}

/// Order job ids by their leading number (`123_4` is array task 4 of job
/// 123), then textually. Ids without a leading number sort last.
pub fn compare_job_ids(a: &str, b: &str) -> Ordering {
    match (leading_number(a), leading_number(b)) {
        (Some(x), Some(y)) => x.cmp(&y).then_with(|| a.cmp(b)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.cmp(b),
    }
}

fn check_shared(
    field: &'static str,
    kept: &Option<String>,
    seen: &Option<String>,
    row: &HostRow,
    job_id: &str,
) -> Option<ConsistencyWarning> {
    match (kept, seen) {
        (Some(kept), Some(other)) if kept != other => Some(ConsistencyWarning {
            job_id: job_id.to_string(),
            field,
            kept: kept.clone(),
            other: other.clone(),
            host: row.host.clone(),
        }),
        _ => None,
    }
}

/// Roll host rows up into one row per job, ascending by job id
/// (see [`compare_job_ids`]).
///
/// Rows without a job are skipped. The first row of a job decides its user
/// and partition; later rows that disagree produce a warning and mark the
/// job inconsistent.
///
/// Efficiency only counts the cores of hosts that reported usage, so an
/// unreachable host is not taken as idle. A job with no reporting host has
/// no efficiency.
pub fn aggregate_by_job(rows: &[HostRow]) -> (Vec<JobMetricRow>, Vec<ConsistencyWarning>) {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut jobs: Vec<JobMetricRow> = Vec::new();
    // Cores available on hosts with a usage figure, per job
    let mut measured: Vec<u32> = Vec::new();
    let mut warnings = Vec::new();

    for row in rows {
        let Some(job_id) = row.job_id.as_deref() else {
            continue;
        };

        let reported = if row.cores_used.is_some() {
            row.cores_available
        } else {
            0
        };

        let Some(&i) = index.get(job_id) else {
            index.insert(job_id, jobs.len());
            measured.push(reported);
            jobs.push(JobMetricRow {
                job_id: job_id.to_string(),
                user: row.user.clone(),
                partition: row.partition.clone(),
                node_count: 1,
                cores_used: row.cores_used.unwrap_or(0.0),
                cores_available: row.cores_available,
                memory_used_gb: row.memory_used_gb.unwrap_or(0.0),
                efficiency: Efficiency::Unavailable,
                partial: row.cores_used.is_none() || row.memory_used_gb.is_none(),
                inconsistent: false,
            });
            continue;
        };

        let job = &mut jobs[i];
        for warning in [
            check_shared("user", &job.user, &row.user, row, job_id),
            check_shared("partition", &job.partition, &row.partition, row, job_id),
        ]
        .into_iter()
        .flatten()
        {
            tracing::warn!("{}", warning);
            job.inconsistent = true;
            warnings.push(warning);
        }

        job.node_count += 1;
        job.cores_used += row.cores_used.unwrap_or(0.0);
        job.cores_available += row.cores_available;
        job.memory_used_gb += row.memory_used_gb.unwrap_or(0.0);
        job.partial |= row.cores_used.is_none() || row.memory_used_gb.is_none();
        measured[i] += reported;
    }

    for (job, &available) in jobs.iter_mut().zip(&measured) {
        job.efficiency = Efficiency::from_cores(job.cores_used, available);
    }
    jobs.sort_by(|a, b| compare_job_ids(&a.job_id, &b.job_id));

    (jobs, warnings)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(host: &str, job: Option<&str>, user: &str, used: Option<f64>, avail: u32) -> HostRow {
        HostRow {
            host: Host::from(host),
            job_id: job.map(String::from),
            user: Some(user.to_string()),
            partition: Some("compute".to_string()),
            job_name: None,
            elapsed: None,
            cpu_load: None,
            cpu_used_pct: None,
            mem_used_pct: None,
            cores_used: used,
            cores_available: avail,
            memory_used_gb: used.map(|_| 4.0),
        }
    }

    #[test]
    fn test_aggregate_two_nodes() {
        let rows = vec![
            row("dn001", Some("501"), "asmith", Some(1.5), 28),
            row("dn002", Some("501"), "asmith", Some(2.0), 28),
        ];
        let (jobs, warnings) = aggregate_by_job(&rows);
        assert!(warnings.is_empty());
        assert_eq!(jobs.len(), 1);

        let job = &jobs[0];
        assert_eq!(job.node_count, 2);
        assert_eq!(job.cores_used, 3.5);
        assert_eq!(job.cores_available, 56);
        assert_eq!(job.memory_used_gb, 8.0);
        assert_eq!(job.efficiency, Efficiency::Percent(6.25));
        assert_eq!(job.efficiency.to_string(), "6.25");
        assert!(!job.partial);
        assert!(!job.inconsistent);
    }

    #[test]
    fn test_zero_cores_available_is_unavailable() {
        let rows = vec![row("zz01", Some("7"), "asmith", Some(1.0), 0)];
        let (jobs, _) = aggregate_by_job(&rows);
        assert_eq!(jobs[0].efficiency, Efficiency::Unavailable);
        assert_eq!(jobs[0].efficiency.to_string(), "unavailable");
    }

    #[test]
    fn test_user_mismatch_warns_and_keeps_first() {
        let rows = vec![
            row("dn001", Some("501"), "asmith", Some(1.0), 28),
            row("dn002", Some("501"), "bjones", Some(1.0), 28),
            row("dn003", Some("501"), "bjones", Some(1.0), 28),
        ];
        let (jobs, warnings) = aggregate_by_job(&rows);
        assert_eq!(jobs[0].user.as_deref(), Some("asmith"));
        assert!(jobs[0].inconsistent);
        assert_eq!(warnings.len(), 2);
        assert_eq!(warnings[0].field, "user");
        assert_eq!(warnings[0].kept, "asmith");
        assert_eq!(warnings[0].other, "bjones");
        assert!(warnings[0].to_string().contains("dn002"));
    }

    #[test]
    fn test_unassigned_rows_skipped_and_order_numeric() {
        let rows = vec![
            row("dn001", Some("1000"), "asmith", Some(1.0), 28),
            row("dn002", None, "asmith", Some(1.0), 28),
            row("dn003", Some("999"), "bjones", Some(1.0), 28),
            row("dn004", Some("12_3"), "bjones", Some(1.0), 28),
        ];
        let (jobs, _) = aggregate_by_job(&rows);
        let ids: Vec<&str> = jobs.iter().map(|j| j.job_id.as_str()).collect();
        assert_eq!(ids, vec!["12_3", "999", "1000"]);
    }

    #[test]
    fn test_missing_usage_marks_partial() {
        let rows = vec![
            row("dg012", Some("77"), "asmith", Some(48.0), 96),
            row("dg013", Some("77"), "asmith", None, 96),
        ];
        let (jobs, _) = aggregate_by_job(&rows);
        assert!(jobs[0].partial);
        assert_eq!(jobs[0].cores_used, 48.0);
        assert_eq!(jobs[0].cores_available, 192);
        // dg013 did not report, so only dg012's cores count.
        assert_eq!(jobs[0].efficiency, Efficiency::Percent(50.0));
    }

    #[test]
    fn test_unreachable_host_is_not_idle() {
        let rows = vec![
            row("dg012", Some("78"), "asmith", Some(96.0), 96),
            row("dg013", Some("78"), "asmith", None, 96),
        ];
        let (jobs, _) = aggregate_by_job(&rows);
        assert_eq!(jobs[0].efficiency, Efficiency::Percent(100.0));

        let rows = vec![
            row("dg012", Some("79"), "asmith", None, 96),
            row("dg013", Some("79"), "asmith", None, 96),
        ];
        let (jobs, _) = aggregate_by_job(&rows);
        assert!(jobs[0].partial);
        assert_eq!(jobs[0].efficiency, Efficiency::Unavailable);
    }

    #[test]
    fn test_partition_mismatch_warns() {
        let mut second = row("dn002", Some("600"), "asmith", Some(1.0), 28);
        second.partition = Some("highmem".to_string());
        let rows = vec![row("dn001", Some("600"), "asmith", Some(1.0), 28), second];

        let (jobs, warnings) = aggregate_by_job(&rows);
        assert_eq!(jobs[0].partition.as_deref(), Some("compute"));
        assert!(jobs[0].inconsistent);
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].field, "partition");
        assert_eq!(warnings[0].kept, "compute");
        assert_eq!(warnings[0].other, "highmem");
        assert_eq!(warnings[0].host, Host::from("dn002"));
    }
}
