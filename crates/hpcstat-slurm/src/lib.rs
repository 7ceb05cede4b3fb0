//! SLURM integration for hpcstat.
//!
//! Query node state via sinfo, running jobs via squeue and finished job
//! windows via sacct.

pub mod sacct;
pub mod sinfo;
pub mod squeue;
pub mod types;

pub use sacct::{SacctError, query_job_window};
pub use sinfo::{DEFAULT_EXCLUSIONS, SinfoError, query_sinfo};
pub use squeue::{SqueueError, query_squeue};
pub use types::{JobWindow, NodeSnapshot, SlurmJob};
