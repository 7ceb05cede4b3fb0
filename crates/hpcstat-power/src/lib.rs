//! Energy estimates from per-node power telemetry.
//!
//! Power loggers write one CSV file per node and day holding
//! `HH:MM:SS,watts` readings. A job's energy is the mean power inside its
//! run window times the window's length, summed over its nodes.

pub mod benchmark;
pub mod telemetry;
pub mod window;

pub use benchmark::{BenchmarkError, BenchmarkRun, find_run, read_benchmark_log};
pub use telemetry::{
    DEFAULT_FILE_STEM, PowerSample, TelemetryConfig, TelemetryError, parse_samples,
};
pub use window::{
    EnergyEstimate, HostEnergy, HostEnergyError, JobEnergy, TrimPolicy, WindowError, energy,
    energy_at, job_energy,
};
