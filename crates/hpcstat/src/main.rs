//! hpcstat - usage, energy and module reports for an HPC cluster.

mod collect;
mod commands;

use clap::Parser;
use hpcstat_cli::{Args, Command};
use hpcstat_hosts::PoolTable;
use miette::{IntoDiagnostic, Result};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;

const LOG_ENV: &str = "HPCSTAT_LOG";

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        _ => LevelFilter::DEBUG,
    };
    let filter = EnvFilter::builder()
        .with_env_var(LOG_ENV)
        .with_default_directive(level.into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let pools = match &args.cluster_file {
        Some(path) => PoolTable::from_json_file(path).into_diagnostic()?,
        None => PoolTable::builtin(),
    };
    let tools = args.tools();

    match &args.command {
        Command::Usage(usage) => {
            commands::usage::run(usage, commands::usage::Report::Nodes, &tools, &pools).await
        }
        Command::Jobs(usage) => {
            commands::usage::run(usage, commands::usage::Report::Jobs, &tools, &pools).await
        }
        Command::Energy(energy) => commands::energy::run_job(energy, &tools, &pools).await,
        Command::Benchmark(bench) => commands::energy::run_benchmark(bench),
        Command::Modules(modules) => commands::modules::run(modules),
    }
}
