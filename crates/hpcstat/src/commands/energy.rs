//! `hpcstat energy` and `hpcstat benchmark`.

use super::emit;
use hpcstat_cli::{BenchmarkArgs, EnergyArgs, Tools};
use hpcstat_hosts::{PoolTable, decode_many};
use hpcstat_output::{Align, Table, UNAVAILABLE, fmt_opt, fmt_value};
use hpcstat_power::{
    EnergyEstimate, JobEnergy, TrimPolicy, energy_at, find_run, job_energy, read_benchmark_log,
};
use hpcstat_slurm::query_job_window;
use miette::{IntoDiagnostic, Result};

pub async fn run_job(args: &EnergyArgs, tools: &Tools, pools: &PoolTable) -> Result<()> {
    let window = query_job_window(&tools.sacct, &args.job_id, tools.timeout)
        .await
        .into_diagnostic()?;
    let (start, end) = window.finished_bounds().into_diagnostic()?;

    let hosts = decode_many(&window.nodelist).into_diagnostic()?;
    if hosts.len() != window.alloc_nodes as usize {
        tracing::warn!(
            "job {}: sacct reports {} nodes but {} decodes to {}",
            window.job_id,
            window.alloc_nodes,
            window.nodelist,
            hosts.len()
        );
    }

    let telemetry = args.telemetry.to_config();
    let result = job_energy(&hosts, pools, &telemetry, start, end, TrimPolicy::default())
        .into_diagnostic()?;

    println!("Job {} ({}, {})", window.job_id, window.user, window.partition);
    println!("Start Time: {start}");
    println!("End Time: {end}");
    println!("Job duration: {:.3} hours", result.duration_hours);
    emit("energy", &host_energy_table(&result), args.output_dir.as_deref())?;
    println!("{}", total_line(&result));
    Ok(())
}

fn host_energy_table(job: &JobEnergy) -> Table {
    use Align::{Left, Right};

    let mut table = Table::new(["Node", "Address", "Mean Power (W)", "Samples", "Energy (Wh)", "Status"])
        .with_align(&[Left, Left, Right, Right, Right, Left]);
    for host in &job.hosts {
        let address = host.address.map(|a| a.to_string()).unwrap_or_default();
        let row = match &host.result {
            Ok(est) => [
                host.host.to_string(),
                address,
                fmt_opt(est.mean_watts, 3),
                est.samples_used.to_string(),
                fmt_opt(est.energy_wh, 3),
                "ok".to_string(),
            ],
            Err(e) => [
                host.host.to_string(),
                address,
                UNAVAILABLE.to_string(),
                String::new(),
                UNAVAILABLE.to_string(),
                e.to_string(),
            ],
        };
        table.push_row(row);
    }
    table
}

fn total_line(job: &JobEnergy) -> String {
    let total = fmt_opt(job.total_wh, 3);
    if job.partial {
        format!("Total energy: {total} Wh (partial: some nodes have no estimate)")
    } else {
        format!("Total energy: {total} Wh")
    }
}

pub fn run_benchmark(args: &BenchmarkArgs) -> Result<()> {
    let log = read_benchmark_log(&args.log).into_diagnostic()?;
    let run = find_run(&log, args.threads).into_diagnostic()?;
    println!("Benchmark {} with -{} {}", run.number, run.flag, run.threads);
    println!("Start Time: {}", run.start);
    println!("End Time: {}", run.end);

    let telemetry = args.telemetry.to_config();
    let samples = telemetry
        .load_day(args.address, run.start.date())
        .into_diagnostic()?;
    let estimate =
        energy_at(&samples, run.start, run.end, TrimPolicy::default()).into_diagnostic()?;

    for line in benchmark_summary(&estimate, args.runs) {
        println!("{line}");
    }
    Ok(())
}

fn benchmark_summary(estimate: &EnergyEstimate, runs: u32) -> Vec<String> {
    let per_run = estimate.energy_wh.map(|wh| wh / f64::from(runs.max(1)));
    vec![
        format!("Job duration: {} hours", fmt_value(estimate.duration_hours, 3)),
        format!(
            "Average power usage while job running: {} W",
            fmt_opt(estimate.mean_watts, 3)
        ),
        format!(
            "Energy consumption across {runs} runs: {} Wh",
            fmt_opt(estimate.energy_wh, 3)
        ),
        format!("Average energy used per run: {} Wh", fmt_opt(per_run, 3)),
    ]
}
