//! Time-window power integration.
//!
//! Samples strictly inside `(start, end)` are selected. For windows of at
//! least [`TrimPolicy::min_duration`] the first two and the last selected
//! samples are dropped, since loggers catch the node ramping up and down
//! there. The mean of the remaining numeric readings times the window length
//! in hours is the energy in watt-hours.

use crate::telemetry::{PowerSample, TelemetryConfig, TelemetryError};
use chrono::{NaiveDateTime, NaiveTime, TimeDelta};
use hpcstat_hosts::{AddressError, Host, PoolTable};
use std::net::Ipv4Addr;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WindowError {
    /// Time-of-day arithmetic cannot express a window that wraps past
    /// midnight, and an empty window has no energy.
    #[error("window {start} to {end} crosses midnight or is empty")]
    CrossesMidnight { start: String, end: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrimPolicy {
    /// Windows shorter than this are not trimmed
    pub min_duration: TimeDelta,
    pub head: usize,
    pub tail: usize,
}

impl Default for TrimPolicy {
    fn default() -> Self {
        Self {
            min_duration: TimeDelta::minutes(5),
            head: 2,
            tail: 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnergyEstimate {
    /// None when no usable reading remained
    pub mean_watts: Option<f64>,
    pub duration_hours: f64,
    pub energy_wh: Option<f64>,
    pub samples_in_window: usize,
    /// Numeric readings that went into the mean
    pub samples_used: usize,
}

/// Estimate energy between two times of day on the same day.
pub fn energy(
    samples: &[PowerSample],
    start: NaiveTime,
    end: NaiveTime,
    policy: TrimPolicy,
) -> Result<EnergyEstimate, WindowError> {
    if end <= start {
        return Err(WindowError::CrossesMidnight {
            start: start.to_string(),
            end: end.to_string(),
        });
    }
    let length = end - start;

    let selected: Vec<&PowerSample> = samples
        .iter()
        .filter(|s| s.time > start && s.time < end)
        .collect();

    let kept: &[&PowerSample] = if length >= policy.min_duration {
        let from = policy.head.min(selected.len());
        let to = selected.len().saturating_sub(policy.tail).max(from);
        &selected[from..to]
    } else {
        &selected
    };

    let readings: Vec<f64> = kept.iter().filter_map(|s| s.watts).collect();
    let mean_watts = if readings.is_empty() {
        None
    } else {
        Some(readings.iter().sum::<f64>() / readings.len() as f64)
    };
    let duration_hours = length.num_seconds() as f64 / 3600.0;

    Ok(EnergyEstimate {
        mean_watts,
        duration_hours,
        energy_wh: mean_watts.map(|w| w * duration_hours),
        samples_in_window: selected.len(),
        samples_used: readings.len(),
    })
}

/// Energy for a window given as full timestamps.
///
/// Telemetry is stored per day, so both ends must fall on the same date.
pub fn energy_at(
    samples: &[PowerSample],
    start: NaiveDateTime,
    end: NaiveDateTime,
    policy: TrimPolicy,
) -> Result<EnergyEstimate, WindowError> {
    check_same_day(start, end)?;
    energy(samples, start.time(), end.time(), policy)
}

fn check_same_day(start: NaiveDateTime, end: NaiveDateTime) -> Result<(), WindowError> {
    if start.date() != end.date() || end <= start {
        return Err(WindowError::CrossesMidnight {
            start: start.to_string(),
            end: end.to_string(),
        });
    }
    Ok(())
}

#[derive(Error, Debug)]
pub enum HostEnergyError {
    #[error(transparent)]
    Address(#[from] AddressError),
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),
    #[error(transparent)]
    Window(#[from] WindowError),
    #[error("no usable power readings in the job window")]
    NoReadings,
}

/// Energy of one host of a job.
#[derive(Debug)]
pub struct HostEnergy {
    pub host: Host,
    pub address: Option<Ipv4Addr>,
    pub result: Result<EnergyEstimate, HostEnergyError>,
}

impl HostEnergy {
    pub fn energy_wh(&self) -> Option<f64> {
        self.result.as_ref().ok().and_then(|e| e.energy_wh)
    }
}

/// Energy of a job summed over its hosts.
#[derive(Debug)]
pub struct JobEnergy {
    pub hosts: Vec<HostEnergy>,
    pub duration_hours: f64,
    /// Sum over hosts with an estimate; None when no host had one
    pub total_wh: Option<f64>,
    /// Some hosts had no estimate
    pub partial: bool,
}

fn host_energy(
    host: &Host,
    pools: &PoolTable,
    telemetry: &TelemetryConfig,
    start: NaiveDateTime,
    end: NaiveDateTime,
    policy: TrimPolicy,
) -> HostEnergy {
    let address = match pools.address(host) {
        Ok(ip) => ip,
        Err(e) => {
            return HostEnergy {
                host: host.clone(),
                address: None,
                result: Err(e.into()),
            };
        }
    };

    let result = telemetry
        .load_day(address, start.date())
        .map_err(HostEnergyError::from)
        .and_then(|samples| {
            energy(&samples, start.time(), end.time(), policy).map_err(HostEnergyError::from)
        })
        .and_then(|estimate| match estimate.mean_watts {
            Some(_) => Ok(estimate),
            None => Err(HostEnergyError::NoReadings),
        });

    HostEnergy {
        host: host.clone(),
        address: Some(address),
        result,
    }
}

/// Estimate a job's energy over its hosts.
///
/// A host without an address, telemetry file or usable readings is reported
/// on its own and makes the total partial; it does not fail the job.
pub fn job_energy(
    hosts: &[Host],
    pools: &PoolTable,
    telemetry: &TelemetryConfig,
    start: NaiveDateTime,
    end: NaiveDateTime,
    policy: TrimPolicy,
) -> Result<JobEnergy, WindowError> {
    check_same_day(start, end)?;

    let hosts: Vec<HostEnergy> = hosts
        .iter()
        .map(|host| host_energy(host, pools, telemetry, start, end, policy))
        .collect();

    for host in &hosts {
        if let Err(e) = &host.result {
            tracing::warn!("{}: energy unavailable: {}", host.host, e);
        }
    }

    let estimates: Vec<f64> = hosts.iter().filter_map(HostEnergy::energy_wh).collect();
    let total_wh = if estimates.is_empty() {
        None
    } else {
        Some(estimates.iter().sum())
    };

    Ok(JobEnergy {
        partial: estimates.len() < hosts.len(),
        duration_hours: (end - start).num_seconds() as f64 / 3600.0,
        hosts,
        total_wh,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8Path;
    use chrono::NaiveDate;

    fn t(h: u32, m: u32, s: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, s).unwrap()
    }

    fn sample(time: NaiveTime, watts: Option<f64>) -> PowerSample {
        PowerSample { time, watts }
    }

    #[test]
    fn test_ten_minute_window_trims_three() {
        // 12 samples inside 10:00..10:10, plus two outside on each side.
        let mut samples = vec![sample(t(9, 59, 0), Some(1000.0)), sample(t(10, 0, 0), Some(1000.0))];
        for i in 0..12 {
            samples.push(sample(t(10, 0, 30) + TimeDelta::seconds(45 * i), Some(100.0 + i as f64)));
        }
        samples.push(sample(t(10, 10, 0), Some(1000.0)));
        samples.push(sample(t(10, 11, 0), Some(1000.0)));

        let est = energy(&samples, t(10, 0, 0), t(10, 10, 0), TrimPolicy::default()).unwrap();
        assert_eq!(est.samples_in_window, 12);
        assert_eq!(est.samples_used, 9);
        // Samples 2..=10 -> 102..=110
        assert_eq!(est.mean_watts, Some(106.0));
        assert!((est.duration_hours - 10.0 / 60.0).abs() < 1e-12);
        assert!((est.energy_wh.unwrap() - 106.0 / 6.0).abs() < 1e-9);
    }

    #[test]
    fn test_short_window_is_not_trimmed() {
        let samples: Vec<PowerSample> = (0..6)
            .map(|i| sample(t(10, 0, 10) + TimeDelta::seconds(20 * i), Some(200.0)))
            .collect();
        let est = energy(&samples, t(10, 0, 0), t(10, 3, 0), TrimPolicy::default()).unwrap();
        assert_eq!(est.samples_in_window, 6);
        assert_eq!(est.samples_used, 6);
        assert_eq!(est.mean_watts, Some(200.0));
        assert!((est.energy_wh.unwrap() - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_missing_readings_are_excluded() {
        let samples = vec![
            sample(t(10, 0, 30), Some(100.0)),
            sample(t(10, 1, 0), None),
            sample(t(10, 1, 30), Some(200.0)),
        ];
        let est = energy(&samples, t(10, 0, 0), t(10, 3, 0), TrimPolicy::default()).unwrap();
        assert_eq!(est.mean_watts, Some(150.0));
        assert_eq!(est.samples_in_window, 3);
        assert_eq!(est.samples_used, 2);
    }

    #[test]
    fn test_no_readings_is_unavailable_not_zero() {
        let samples = vec![sample(t(10, 0, 30), None)];
        let est = energy(&samples, t(10, 0, 0), t(10, 3, 0), TrimPolicy::default()).unwrap();
        assert_eq!(est.mean_watts, None);
        assert_eq!(est.energy_wh, None);

        // Trimming can leave nothing behind.
        let samples: Vec<PowerSample> = (0..3)
            .map(|i| sample(t(10, 1, 0) + TimeDelta::minutes(i), Some(100.0)))
            .collect();
        let est = energy(&samples, t(10, 0, 0), t(10, 10, 0), TrimPolicy::default()).unwrap();
        assert_eq!(est.samples_in_window, 3);
        assert_eq!(est.mean_watts, None);
    }

    #[test]
    fn test_window_crossing_midnight() {
        assert!(matches!(
            energy(&[], t(23, 50, 0), t(0, 10, 0), TrimPolicy::default()),
            Err(WindowError::CrossesMidnight { .. })
        ));
        assert!(energy(&[], t(10, 0, 0), t(10, 0, 0), TrimPolicy::default()).is_err());

        let day = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
        let start = day.and_time(t(23, 0, 0));
        let end = day.succ_opt().unwrap().and_time(t(23, 30, 0));
        assert!(energy_at(&[], start, end, TrimPolicy::default()).is_err());
    }

    fn write_day(config: &TelemetryConfig, ip: Ipv4Addr, date: NaiveDate, watts: f64) {
        let path = config.path_for(ip, date);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        let rows: String = (0..20)
            .map(|i| format!("10:{:02}:00,{}\n", i, watts))
            .collect();
        std::fs::write(path, rows).unwrap();
    }

    #[test]
    fn test_job_energy_sums_hosts_and_flags_partial() {
        let dir = tempfile::tempdir().unwrap();
        let config = TelemetryConfig::new(Utf8Path::from_path(dir.path()).unwrap());
        let pools = PoolTable::builtin();
        let date = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();

        write_day(&config, Ipv4Addr::new(10, 10, 9, 212), date, 300.0);
        write_day(&config, Ipv4Addr::new(10, 10, 9, 213), date, 500.0);

        let hosts = vec![
            Host::from("dg012"),
            Host::from("dg013"),
            Host::from("dg014"),
            Host::from("cn001"),
        ];
        let job = job_energy(
            &hosts,
            &pools,
            &config,
            date.and_time(t(10, 0, 0)),
            date.and_time(t(10, 15, 0)),
            TrimPolicy::default(),
        )
        .unwrap();

        assert_eq!(job.duration_hours, 0.25);
        assert_eq!(job.total_wh, Some(75.0 + 125.0));
        assert!(job.partial);
        assert!(matches!(
            job.hosts[2].result,
            Err(HostEnergyError::Telemetry(TelemetryError::Missing { .. }))
        ));
        assert!(matches!(
            job.hosts[3].result,
            Err(HostEnergyError::Address(AddressError::NoAddress { .. }))
        ));
        assert_eq!(job.hosts[3].address, None);
    }

    #[test]
    fn test_host_window_error_is_reported_as_such() {
        let dir = tempfile::tempdir().unwrap();
        let config = TelemetryConfig::new(Utf8Path::from_path(dir.path()).unwrap());
        let date = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
        write_day(&config, Ipv4Addr::new(10, 10, 9, 212), date, 300.0);

        let host = host_energy(
            &Host::from("dg012"),
            &PoolTable::builtin(),
            &config,
            date.and_time(t(10, 15, 0)),
            date.and_time(t(10, 0, 0)),
            TrimPolicy::default(),
        );
        let err = host.result.unwrap_err();
        assert!(matches!(
            err,
            HostEnergyError::Window(WindowError::CrossesMidnight { .. })
        ));
        assert!(err.to_string().contains("crosses midnight"));
    }
}
