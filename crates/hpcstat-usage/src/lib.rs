//! Usage reporting for hpcstat.
//!
//! Joins allocated nodes to the jobs running on them, reduces process
//! listings to per-node CPU and memory figures and rolls per-node rows up
//! into one row per job.

pub mod filter;
pub mod join;
pub mod jobs;
pub mod remote;
pub mod rows;
pub mod samples;

pub use filter::ReportFilter;
pub use join::{HostConflict, JobId, JoinFailure, JoinResult, Placement, join};
pub use jobs::{ConsistencyWarning, Efficiency, HostRow, JobMetricRow, aggregate_by_job};
pub use remote::{RemoteError, query_processes};
pub use rows::{SampleOutcome, build_host_rows};
pub use samples::{
    AmbiguousUsers, ResourceSample, ResourceSums, UserMatch, aggregate, ambiguous_users,
    parse_ps_output,
};
