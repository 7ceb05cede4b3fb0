//! Parallel process listings from compute nodes.

use hpcstat_cli::CollectConfig;
use hpcstat_hosts::Host;
use hpcstat_usage::{SampleOutcome, query_processes};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// List processes on every host, at most `config.parallel` at a time.
///
/// Every host gets an outcome. A host that cannot be reached or times out is
/// `Failed`; with remote listing turned off every host is `Skipped`.
pub async fn collect_samples(
    ssh: &str,
    hosts: &[Host],
    config: &CollectConfig,
) -> BTreeMap<Host, SampleOutcome> {
    let mut outcomes = BTreeMap::new();
    if !config.remote {
        for host in hosts {
            outcomes.insert(host.clone(), SampleOutcome::Skipped);
        }
        return outcomes;
    }

    let semaphore = Arc::new(Semaphore::new(config.parallel.max(1)));
    let mut tasks = JoinSet::new();
    for host in hosts {
        let semaphore = Arc::clone(&semaphore);
        let ssh = ssh.to_string();
        let host = host.clone();
        let policy = config.user_match;
        let limit = config.timeout;

        tasks.spawn(async move {
            let outcome = match semaphore.acquire_owned().await {
                Ok(_permit) => match query_processes(&ssh, &host, policy, limit).await {
                    Ok(samples) => SampleOutcome::Collected(samples),
                    Err(e) => {
                        tracing::warn!("usage unavailable for {}", e);
                        SampleOutcome::Failed(e.source.to_string())
                    }
                },
                Err(e) => SampleOutcome::Failed(e.to_string()),
            };
            (host, outcome)
        });
    }

    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((host, outcome)) => {
                outcomes.insert(host, outcome);
            }
            Err(e) => tracing::error!("process listing task failed: {}", e),
        }
    }

    for host in hosts {
        outcomes
            .entry(host.clone())
            .or_insert_with(|| SampleOutcome::Failed("listing task failed".to_string()));
    }

    let failed = outcomes
        .values()
        .filter(|o| matches!(o, SampleOutcome::Failed(_)))
        .count();
    tracing::info!("listed processes on {} hosts, {} failed", hosts.len(), failed);
    outcomes
}
