//! CLI argument parsing for hpcstat.
//!
//! Arguments are parsed with clap and then resolved once into the plain
//! configuration structs the library crates take.

use camino::Utf8PathBuf;
use chrono::NaiveDate;
use clap::{ArgAction, Parser, Subcommand};
use hpcstat_power::{DEFAULT_FILE_STEM, TelemetryConfig};
use hpcstat_slurm::DEFAULT_EXCLUSIONS;
use hpcstat_usage::{ReportFilter, UserMatch};
use std::net::Ipv4Addr;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_POWER_ROOT: &str = "/lustre/admin/power_monitoring/power";

#[derive(Parser, Debug)]
#[command(name = "hpcstat", version)]
#[command(about = "Usage, energy and module reports for an HPC cluster")]
pub struct Args {
    /// Log more (-v info, -vv debug); HPCSTAT_LOG overrides
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// JSON file replacing the built-in host pool table
    #[arg(long, env = "HPCSTAT_CLUSTER_FILE", global = true)]
    pub cluster_file: Option<Utf8PathBuf>,

    #[arg(long, env = "HPCSTAT_SINFO", default_value = "sinfo")]
    pub sinfo: String,

    #[arg(long, env = "HPCSTAT_SQUEUE", default_value = "squeue")]
    pub squeue: String,

    #[arg(long, env = "HPCSTAT_SACCT", default_value = "sacct")]
    pub sacct: String,

    #[arg(long, env = "HPCSTAT_SSH", default_value = "ssh")]
    pub ssh: String,

    /// Timeout for scheduler queries in seconds
    #[arg(long, default_value = "60")]
    pub query_timeout: u64,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// CPU and memory usage of allocated nodes and the jobs on them
    Usage(UsageArgs),
    /// Usage rolled up to one row per job
    Jobs(UsageArgs),
    /// Energy used by a finished job
    Energy(EnergyArgs),
    /// Energy used by a run in a benchmark log
    Benchmark(BenchmarkArgs),
    /// Statistics from the module-load log
    Modules(ModulesArgs),
}

#[derive(clap::Args, Debug, Clone, Default)]
pub struct FilterArgs {
    /// Only report this user's jobs
    #[arg(short, long)]
    pub user: Option<String>,

    /// Only report CPU usage below this percentage
    #[arg(short, long)]
    pub low: Option<f64>,

    /// Only report CPU usage above this percentage
    #[arg(short = 'e', long)]
    pub high: Option<f64>,

    /// Only report this node
    #[arg(short, long)]
    pub node: Option<String>,

    /// Only report this job ID
    #[arg(short, long)]
    pub job: Option<String>,
}

#[derive(clap::Args, Debug, Clone)]
pub struct CollectArgs {
    /// Hosts listed in parallel
    #[arg(long, default_value = "8")]
    pub parallel: usize,

    /// Timeout per host listing in seconds
    #[arg(long, default_value = "5")]
    pub remote_timeout: u64,

    /// How listed user names are matched: exact, prefix:<n> or <n>
    #[arg(long, default_value = "7")]
    pub user_match: UserMatch,

    /// Use scheduler load figures instead of listing processes on each node
    #[arg(long)]
    pub no_remote: bool,
}

#[derive(clap::Args, Debug, Clone)]
pub struct UsageArgs {
    #[command(flatten)]
    pub filter: FilterArgs,

    #[command(flatten)]
    pub collect: CollectArgs,

    /// Skip nodes whose name, reason or generic resources mention this text
    #[arg(
        long = "exclude",
        default_values_t = DEFAULT_EXCLUSIONS.iter().map(|s| s.to_string()).collect::<Vec<_>>()
    )]
    pub exclusions: Vec<String>,

    /// Also write a date-stamped TSV report to this directory
    #[arg(long)]
    pub output_dir: Option<Utf8PathBuf>,
}

#[derive(clap::Args, Debug, Clone)]
pub struct TelemetryArgs {
    /// Root of the power telemetry tree
    #[arg(long, env = "HPCSTAT_POWER_ROOT", default_value = DEFAULT_POWER_ROOT)]
    pub power_root: Utf8PathBuf,

    /// File name stem of telemetry files
    #[arg(long, default_value = DEFAULT_FILE_STEM)]
    pub file_stem: String,
}

#[derive(clap::Args, Debug, Clone)]
pub struct EnergyArgs {
    /// Job ID as known to sacct
    pub job_id: String,

    #[command(flatten)]
    pub telemetry: TelemetryArgs,

    #[arg(long)]
    pub output_dir: Option<Utf8PathBuf>,
}

#[derive(clap::Args, Debug, Clone)]
pub struct BenchmarkArgs {
    /// Thread count of the run to look up
    #[arg(long)]
    pub threads: u32,

    /// Benchmark log file
    #[arg(long)]
    pub log: Utf8PathBuf,

    /// Number of runs the benchmark repeated
    #[arg(long, default_value = "1", value_parser = clap::value_parser!(u32).range(1..))]
    pub runs: u32,

    /// Telemetry address of the benchmarked machine
    #[arg(long, default_value = "10.10.1.201")]
    pub address: Ipv4Addr,

    #[command(flatten)]
    pub telemetry: TelemetryArgs,
}

#[derive(clap::Args, Debug, Clone)]
pub struct ModulesArgs {
    /// Module log file
    #[arg(long, env = "HPCSTAT_MODULE_LOG")]
    pub log: Utf8PathBuf,

    /// Report loads of this module
    #[arg(long)]
    pub module: Option<String>,

    /// Count every version of the module's family
    #[arg(long, requires = "module")]
    pub prefix_all: bool,

    /// Overall statistics and most recent loads
    #[arg(long)]
    pub general: bool,

    /// Number of most loaded modules to show
    #[arg(long, default_value = "10")]
    pub top: usize,

    /// Number of most recent loads to show
    #[arg(long, default_value = "10")]
    pub recent: usize,

    /// Print every load record
    #[arg(long)]
    pub full: bool,

    /// Report this user's loads
    #[arg(long)]
    pub user: Option<String>,

    /// First date to report (YYYY-MM-DD)
    #[arg(long)]
    pub start: Option<NaiveDate>,

    /// Last date to report, inclusive (default today)
    #[arg(long, requires = "start")]
    pub end: Option<NaiveDate>,

    #[arg(long)]
    pub output_dir: Option<Utf8PathBuf>,
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("--parallel must be at least 1")]
    NoWorkers,
    #[error("--end {end} is before --start {start}")]
    ReversedDates { start: NaiveDate, end: NaiveDate },
}

/// External programs hpcstat runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tools {
    pub sinfo: String,
    pub squeue: String,
    pub sacct: String,
    pub ssh: String,
    pub timeout: Duration,
}

/// How process listings are collected from nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollectConfig {
    pub parallel: usize,
    pub timeout: Duration,
    pub user_match: UserMatch,
    /// List processes over ssh; otherwise fall back to scheduler figures
    pub remote: bool,
}

impl Default for CollectConfig {
    fn default() -> Self {
        Self {
            parallel: 8,
            timeout: Duration::from_secs(5),
            user_match: UserMatch::default(),
            remote: true,
        }
    }
}

impl Args {
    pub fn tools(&self) -> Tools {
        Tools {
            sinfo: self.sinfo.clone(),
            squeue: self.squeue.clone(),
            sacct: self.sacct.clone(),
            ssh: self.ssh.clone(),
            timeout: Duration::from_secs(self.query_timeout),
        }
    }
}

impl FilterArgs {
    pub fn to_filter(&self) -> ReportFilter {
        ReportFilter {
            user: self.user.clone(),
            low: self.low,
            high: self.high,
            node: self.node.clone(),
            job: self.job.clone(),
        }
    }
}

impl CollectArgs {
    pub fn to_config(&self) -> Result<CollectConfig, ConfigError> {
        if self.parallel == 0 {
            return Err(ConfigError::NoWorkers);
        }
        Ok(CollectConfig {
            parallel: self.parallel,
            timeout: Duration::from_secs(self.remote_timeout),
            user_match: self.user_match,
            remote: !self.no_remote,
        })
    }
}

impl TelemetryArgs {
    pub fn to_config(&self) -> TelemetryConfig {
        TelemetryConfig {
            root: self.power_root.clone(),
            file_stem: self.file_stem.clone(),
        }
    }
}

impl UsageArgs {
    pub fn exclusions(&self) -> Vec<&str> {
        self.exclusions.iter().map(String::as_str).collect()
    }
}

impl ModulesArgs {
    /// The inclusive date range to report, if `--start` was given. `--end`
    /// defaults to `today`.
    pub fn date_range(
        &self,
        today: NaiveDate,
    ) -> Result<Option<(NaiveDate, NaiveDate)>, ConfigError> {
        let Some(start) = self.start else {
            return Ok(None);
        };
        let end = self.end.unwrap_or(today);
        if end < start {
            return Err(ConfigError::ReversedDates { start, end });
        }
        Ok(Some((start, end)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("hpcstat").chain(args.iter().copied())).unwrap()
    }

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn test_usage_defaults() {
        let args = parse(&["usage"]);
        assert_eq!(args.verbose, 0);
        let tools = args.tools();
        assert_eq!(tools.timeout, Duration::from_secs(60));

        let Command::Usage(usage) = args.command else {
            panic!("expected usage");
        };
        assert_eq!(usage.filter.to_filter(), ReportFilter::default());
        assert_eq!(usage.collect.to_config().unwrap(), CollectConfig::default());
        assert_eq!(usage.exclusions(), vec!["a100", "shared", "rn"]);
        assert_eq!(usage.output_dir, None);
    }

    #[test]
    fn test_usage_filters() {
        let args = parse(&[
            "-vv", "jobs", "-u", "jdoe", "-l", "25", "-e", "5", "-n", "dg012", "-j", "501",
            "--user-match", "exact", "--no-remote", "--parallel", "2",
        ]);
        assert_eq!(args.verbose, 2);
        let Command::Jobs(jobs) = args.command else {
            panic!("expected jobs");
        };
        assert_eq!(
            jobs.filter.to_filter(),
            ReportFilter {
                user: Some("jdoe".into()),
                low: Some(25.0),
                high: Some(5.0),
                node: Some("dg012".into()),
                job: Some("501".into()),
            }
        );
        let collect = jobs.collect.to_config().unwrap();
        assert_eq!(collect.user_match, UserMatch::Exact);
        assert_eq!(collect.parallel, 2);
        assert!(!collect.remote);
    }

    #[test]
    fn test_zero_workers_rejected() {
        let args = parse(&["usage", "--parallel", "0"]);
        let Command::Usage(usage) = args.command else {
            panic!("expected usage");
        };
        assert_eq!(usage.collect.to_config(), Err(ConfigError::NoWorkers));
    }

    #[test]
    fn test_bad_user_match_rejected() {
        assert!(Args::try_parse_from(["hpcstat", "usage", "--user-match", "prefix:0"]).is_err());
    }

    #[test]
    fn test_energy_args() {
        let args = parse(&["energy", "4821337", "--power-root", "/data/power"]);
        let Command::Energy(energy) = args.command else {
            panic!("expected energy");
        };
        assert_eq!(energy.job_id, "4821337");
        let telemetry = energy.telemetry.to_config();
        assert_eq!(telemetry.root, Utf8PathBuf::from("/data/power"));
        assert_eq!(telemetry.file_stem, "power_orginfo");
    }

    #[test]
    fn test_benchmark_args() {
        let args = parse(&["benchmark", "--threads", "72", "--log", "bench.log", "--runs", "3"]);
        let Command::Benchmark(bench) = args.command else {
            panic!("expected benchmark");
        };
        assert_eq!(bench.threads, 72);
        assert_eq!(bench.runs, 3);
        assert_eq!(bench.address, Ipv4Addr::new(10, 10, 1, 201));

        assert!(
            Args::try_parse_from(["hpcstat", "benchmark", "--threads", "1", "--log", "x", "--runs", "0"])
                .is_err()
        );
    }

    #[test]
    fn test_module_date_range() {
        let today = date("2024-06-01");

        let args = parse(&["modules", "--log", "m.log"]);
        let Command::Modules(modules) = args.command else {
            panic!("expected modules");
        };
        assert_eq!(modules.date_range(today), Ok(None));
        assert_eq!(modules.top, 10);

        let args = parse(&["modules", "--log", "m.log", "--start", "2024-05-01"]);
        let Command::Modules(modules) = args.command else {
            panic!("expected modules");
        };
        assert_eq!(modules.date_range(today), Ok(Some((date("2024-05-01"), today))));

        let args = parse(&[
            "modules", "--log", "m.log", "--start", "2024-05-01", "--end", "2024-04-01",
        ]);
        let Command::Modules(modules) = args.command else {
            panic!("expected modules");
        };
        assert!(matches!(
            modules.date_range(today),
            Err(ConfigError::ReversedDates { .. })
        ));
    }

    #[test]
    fn test_prefix_all_requires_module() {
        assert!(Args::try_parse_from(["hpcstat", "modules", "--log", "m.log", "--prefix-all"]).is_err());
    }
}
