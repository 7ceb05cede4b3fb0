//! Row selection for usage reports.

use crate::jobs::{HostRow, JobMetricRow};

/// Filters from the command line. Unset fields select everything.
///
/// The `low` and `high` thresholds are strict and apply to the node's CPU
/// percentage (job efficiency for per-job rows). A row whose percentage is
/// unavailable is dropped whenever a threshold is set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReportFilter {
    pub user: Option<String>,
    pub low: Option<f64>,
    pub high: Option<f64>,
    pub node: Option<String>,
    pub job: Option<String>,
}

impl ReportFilter {
    fn in_range(&self, pct: Option<f64>) -> bool {
        if self.low.is_none() && self.high.is_none() {
            return true;
        }
        let Some(pct) = pct else {
            return false;
        };
        self.low.is_none_or(|low| pct < low) && self.high.is_none_or(|high| pct > high)
    }

    fn same(wanted: &Option<String>, actual: Option<&str>) -> bool {
        match wanted {
            Some(wanted) => actual == Some(wanted.as_str()),
            None => true,
        }
    }

    pub fn matches_host(&self, row: &HostRow) -> bool {
        Self::same(&self.user, row.user.as_deref())
            && Self::same(&self.node, Some(row.host.as_str()))
            && Self::same(&self.job, row.job_id.as_deref())
            && self.in_range(row.cpu_used_pct)
    }

    /// Per-job rows have no single node; a node filter is applied to the
    /// host rows before aggregation.
    pub fn matches_job(&self, row: &JobMetricRow) -> bool {
        Self::same(&self.user, row.user.as_deref())
            && Self::same(&self.job, Some(row.job_id.as_str()))
            && self.in_range(row.efficiency.percent())
    }

    pub fn apply_hosts(&self, rows: Vec<HostRow>) -> Vec<HostRow> {
        rows.into_iter().filter(|r| self.matches_host(r)).collect()
    }

    pub fn apply_jobs(&self, rows: Vec<JobMetricRow>) -> Vec<JobMetricRow> {
        rows.into_iter().filter(|r| self.matches_job(r)).collect()
    }
}
