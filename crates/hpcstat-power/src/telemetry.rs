//! Power telemetry files.
//!
//! Layout under the telemetry root:
//!
//! ```text
//! {root}/{YYYY}/{YYYY}{MM}/{MM}{DD}/{stem}_{ip}_{YYYYMMDD}.csv
//! ```
//!
//! Each file has no header; every row is `HH:MM:SS,watts`. Loggers write
//! error text instead of a number when a reading fails.

use camino::{Utf8Path, Utf8PathBuf};
use chrono::{NaiveDate, NaiveTime};
use hpcstat_parsers::parse_time_of_day;
use serde::Deserialize;
use std::net::Ipv4Addr;
use thiserror::Error;

pub const DEFAULT_FILE_STEM: &str = "power_orginfo";

#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("no telemetry file {path}")]
    Missing { path: Utf8PathBuf },
    #[error("failed to read telemetry file {path}: {source}")]
    Read {
        path: Utf8PathBuf,
        source: csv::Error,
    },
}

/// One reading. `watts` is None when the logger recorded something that is
/// not a number.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PowerSample {
    pub time: NaiveTime,
    pub watts: Option<f64>,
}

/// Where telemetry files live and how they are named.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryConfig {
    pub root: Utf8PathBuf,
    pub file_stem: String,
}

impl TelemetryConfig {
    pub fn new(root: impl Into<Utf8PathBuf>) -> Self {
        Self {
            root: root.into(),
            file_stem: DEFAULT_FILE_STEM.to_string(),
        }
    }

    /// Path of the file for logger `ip` on `date`.
    pub fn path_for(&self, ip: Ipv4Addr, date: NaiveDate) -> Utf8PathBuf {
        let year = date.format("%Y").to_string();
        let month = date.format("%m").to_string();
        let day = date.format("%d").to_string();
        let stamp = date.format("%Y%m%d");
        self.root
            .join(&year)
            .join(format!("{year}{month}"))
            .join(format!("{month}{day}"))
            .join(format!("{}_{}_{}.csv", self.file_stem, ip, stamp))
    }

    /// Read all samples for logger `ip` on `date`.
    pub fn load_day(&self, ip: Ipv4Addr, date: NaiveDate) -> Result<Vec<PowerSample>, TelemetryError> {
        read_samples(&self.path_for(ip, date))
    }
}

#[derive(Debug, Deserialize)]
struct TelemetryRecord {
    time: String,
    #[serde(default)]
    power: String,
}

/// Parse telemetry CSV from any reader.
///
/// Rows whose time cannot be parsed are skipped with a warning.
pub fn parse_samples<R: std::io::Read>(
    reader: R,
    origin: &Utf8Path,
) -> Result<Vec<PowerSample>, TelemetryError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut samples = Vec::new();
    for (i, record) in reader.deserialize::<TelemetryRecord>().enumerate() {
        let record = match record {
            Ok(record) => record,
            Err(e) if e.is_io_error() => {
                return Err(TelemetryError::Read {
                    path: origin.to_path_buf(),
                    source: e,
                });
            }
            Err(e) => {
                tracing::warn!("{}: skipping row {}: {}", origin, i + 1, e);
                continue;
            }
        };
        let Some(time) = parse_time_of_day(&record.time) else {
            tracing::warn!("{}: skipping row {}: bad time '{}'", origin, i + 1, record.time);
            continue;
        };
        samples.push(PowerSample {
            time,
            watts: record.power.parse::<f64>().ok().filter(|w| w.is_finite()),
        });
    }
    Ok(samples)
}

/// Read one telemetry file.
pub fn read_samples(path: &Utf8Path) -> Result<Vec<PowerSample>, TelemetryError> {
    let file = match std::fs::File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(TelemetryError::Missing {
                path: path.to_path_buf(),
            });
        }
        Err(e) => {
            return Err(TelemetryError::Read {
                path: path.to_path_buf(),
                source: e.into(),
            });
        }
    };
    let samples = parse_samples(file, path)?;
    tracing::debug!("{}: {} samples", path, samples.len());
    Ok(samples)
}
