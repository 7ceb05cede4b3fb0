//! Benchmark run logs.
//!
//! A benchmark driver writes a header line per run followed by its start
//! and end times:
//!
//! ```text
//! Benchmark 3: ./stream -t 72
//! ...
//! Start Time: 03/05/24 10:00:00
//! End Time: 03/05/24 10:12:30
//! ```
//!
//! The thread count is given by one of the flags `-p`, `-T`, `-t` or `-@`.

use camino::Utf8Path;
use chrono::NaiveDateTime;
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

static BENCHMARK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^Benchmark (\d+):.*-([pTt@]) (\d+)").expect("valid regex"));
static START_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^Start Time: (.+)").expect("valid regex"));
static END_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^End Time: (.+)").expect("valid regex"));

const TIMESTAMP_FORMAT: &str = "%m-%d-%y %H:%M:%S";

#[derive(Error, Debug)]
pub enum BenchmarkError {
    #[error("failed to read benchmark log {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("no benchmark found with {threads} threads")]
    NotFound { threads: u32 },
    #[error("benchmark {number} has no {which} time")]
    MissingTime { number: u32, which: &'static str },
    #[error("line {line}: invalid timestamp '{value}'")]
    BadTimestamp { line: usize, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BenchmarkRun {
    pub number: u32,
    /// Flag that carried the thread count
    pub flag: char,
    pub threads: u32,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

fn parse_timestamp(value: &str, line: usize) -> Result<NaiveDateTime, BenchmarkError> {
    let normalized = value.trim().replace('/', "-");
    NaiveDateTime::parse_from_str(&normalized, TIMESTAMP_FORMAT).map_err(|_| {
        BenchmarkError::BadTimestamp {
            line,
            value: value.trim().to_string(),
        }
    })
}

/// Find the first benchmark run with `threads` threads.
///
/// Its start and end times are the first `Start Time:` and `End Time:`
/// lines after the header and before the next benchmark header.
pub fn find_run(log: &str, threads: u32) -> Result<BenchmarkRun, BenchmarkError> {
    let lines: Vec<&str> = log.lines().collect();

    for (i, line) in lines.iter().enumerate() {
        let Some(caps) = BENCHMARK_RE.captures(line) else {
            continue;
        };
        if caps[3].parse::<u32>().ok() != Some(threads) {
            continue;
        }
        let number = caps[1].parse::<u32>().unwrap_or(0);
        let flag = caps[2].chars().next().unwrap_or('t');

        let mut start = None;
        let mut end = None;
        for (j, next) in lines.iter().enumerate().skip(i + 1) {
            if BENCHMARK_RE.is_match(next) {
                break;
            }
            if start.is_none() {
                if let Some(c) = START_RE.captures(next) {
                    start = Some(parse_timestamp(&c[1], j + 1)?);
                    continue;
                }
            }
            if let Some(c) = END_RE.captures(next) {
                end = Some(parse_timestamp(&c[1], j + 1)?);
                break;
            }
        }

        let start = start.ok_or(BenchmarkError::MissingTime {
            number,
            which: "start",
        })?;
        let end = end.ok_or(BenchmarkError::MissingTime {
            number,
            which: "end",
        })?;
        tracing::debug!("benchmark {} (-{} {}): {} to {}", number, flag, threads, start, end);
        return Ok(BenchmarkRun {
            number,
            flag,
            threads,
            start,
            end,
        });
    }

    Err(BenchmarkError::NotFound { threads })
}

pub fn read_benchmark_log(path: &Utf8Path) -> Result<String, BenchmarkError> {
    std::fs::read_to_string(path).map_err(|source| BenchmarkError::Io {
        path: path.to_string(),
        source,
    })
}
