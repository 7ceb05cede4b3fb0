//! Parser for module-load syslog lines.
//!
//! Two timestamp styles appear in the log, and a file may hold both:
//!
//! ```text
//! Feb  3 10:11:12 dn001 ModuleUsageTracking: user: "jdoe", module load {python/3.9 gcc/9.2}
//! 2023-02-04T10:11:12.123-05:00 dn001 ModuleUsageTracking: user: jdoe, module load "cuda/11.8"
//! ```
//!
//! The host follows the timestamp. The user is the first comma-separated
//! field after the second `:` of the text that follows the host. Modules are
//! the words after the last `load `.

use camino::Utf8Path;
use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};
use std::fs;
use thiserror::Error;

/// One module named in one load command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleLoad {
    pub timestamp: NaiveDateTime,
    pub host: String,
    pub user: String,
    pub module: String,
}

/// A load line that could not be understood.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("line {line}: {reason}")]
pub struct ParseError {
    pub line: usize,
    pub reason: String,
}

#[derive(Error, Debug)]
pub enum LogError {
    #[error("failed to read module log {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
}

/// Modules loaded implicitly by the scheduler environment.
fn is_ignored(module: &str) -> bool {
    module == "shared" || module.contains("slurm")
}

fn is_load_event(line: &str) -> bool {
    line.contains("load ") && !line.contains("unload")
}

fn take_token(s: &str) -> Option<(&str, &str)> {
    let s = s.trim_start();
    if s.is_empty() {
        return None;
    }
    let end = s.find(char::is_whitespace).unwrap_or(s.len());
    Some((&s[..end], &s[end..]))
}

/// Syslog timestamps carry no year. Assume the reference year, or the year
/// before when that would put the entry after the reference date.
fn syslog_timestamp(
    month: &str,
    day: &str,
    time: &str,
    reference: NaiveDate,
) -> Option<NaiveDateTime> {
    let parse = |year: i32| {
        NaiveDateTime::parse_from_str(&format!("{year} {month} {day} {time}"), "%Y %b %d %H:%M:%S")
            .ok()
    };
    let this_year = parse(reference.year());
    match this_year {
        Some(ts) if ts.date() <= reference => Some(ts),
        // Feb 29 may only exist in one of the two years
        _ => parse(reference.year() - 1).or(this_year),
    }
}

fn iso_timestamp(token: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(token) {
        return Some(dt.naive_local());
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(token, fmt).ok())
}

/// Split off the timestamp, returning it with the rest of the line.
fn split_timestamp(line: &str, reference: NaiveDate) -> Result<(NaiveDateTime, &str), String> {
    let (first, rest) = take_token(line).ok_or("empty line")?;

    if first.starts_with(|c: char| c.is_ascii_digit()) {
        let ts = iso_timestamp(first).ok_or_else(|| format!("unrecognized timestamp '{first}'"))?;
        return Ok((ts, rest));
    }

    let (day, rest) = take_token(rest).ok_or("truncated timestamp")?;
    let (time, rest) = take_token(rest).ok_or("truncated timestamp")?;
    let ts = syslog_timestamp(first, day, time, reference)
        .ok_or_else(|| format!("unrecognized timestamp '{first} {day} {time}'"))?;
    Ok((ts, rest))
}

fn extract_user(message: &str) -> Option<String> {
    let user = message
        .split(':')
        .nth(2)?
        .split(',')
        .next()?
        .replace('"', "");
    let user = user.trim();
    (!user.is_empty()).then(|| user.to_string())
}

fn extract_modules(line: &str) -> Vec<String> {
    let Some((_, tail)) = line.rsplit_once("load ") else {
        return Vec::new();
    };
    tail.chars()
        .filter(|c| !matches!(c, '{' | '}' | '"'))
        .collect::<String>()
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|m| !m.is_empty())
        .map(String::from)
        .collect()
}

/// Parse one log line.
///
/// Returns `Ok(vec![])` for lines that are not load events and for load
/// commands naming only ignored modules. `lineno` is 1-based and only used
/// for error messages. `reference` anchors the year of syslog timestamps.
pub fn parse_line(
    line: &str,
    lineno: usize,
    reference: NaiveDate,
) -> Result<Vec<ModuleLoad>, ParseError> {
    if !is_load_event(line) {
        return Ok(Vec::new());
    }
    let error = |reason: String| ParseError {
        line: lineno,
        reason,
    };

    let (timestamp, rest) = split_timestamp(line, reference).map_err(error)?;
    let (host, message) = take_token(rest).ok_or_else(|| error("missing host".into()))?;
    let user = extract_user(message).ok_or_else(|| error("missing user".into()))?;
    let modules = extract_modules(line);
    if modules.is_empty() {
        return Err(error("no module named after 'load'".into()));
    }

    Ok(modules
        .into_iter()
        .filter(|m| !is_ignored(m))
        .map(|module| ModuleLoad {
            timestamp,
            host: host.to_string(),
            user: user.clone(),
            module,
        })
        .collect())
}

/// Parse log content, collecting unparseable load lines instead of failing.
pub fn parse_log(content: &str, reference: NaiveDate) -> (Vec<ModuleLoad>, Vec<ParseError>) {
    let mut records = Vec::new();
    let mut errors = Vec::new();

    for (i, line) in content.lines().enumerate() {
        match parse_line(line, i + 1, reference) {
            Ok(loads) => records.extend(loads),
            Err(e) => {
                tracing::warn!("skipping module log {}", e);
                errors.push(e);
            }
        }
    }

    (records, errors)
}

/// Read and parse a module log file.
pub fn read_log(
    path: &Utf8Path,
    reference: NaiveDate,
) -> Result<(Vec<ModuleLoad>, Vec<ParseError>), LogError> {
    let content = fs::read_to_string(path).map_err(|source| LogError::Io {
        path: path.to_string(),
        source,
    })?;
    let (records, errors) = parse_log(&content, reference);
    tracing::info!(
        "{}: {} module loads, {} unparseable lines",
        path,
        records.len(),
        errors.len()
    );
    Ok((records, errors))
}
