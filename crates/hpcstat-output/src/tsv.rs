//! Date-stamped tab-separated report files.

use crate::table::Table;
use camino::{Utf8Path, Utf8PathBuf};
use chrono::NaiveDate;
use std::fs;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OutputError {
    #[error("IO error writing {path}: {source}")]
    Io {
        path: Utf8PathBuf,
        source: std::io::Error,
    },
    #[error("TSV error writing {path}: {source}")]
    Tsv {
        path: Utf8PathBuf,
        source: csv::Error,
    },
}

/// `{dir}/{report}_{YYYY-MM-DD}.tsv`
pub fn report_path(dir: &Utf8Path, report: &str, date: NaiveDate) -> Utf8PathBuf {
    dir.join(format!("{}_{}.tsv", report, date.format("%Y-%m-%d")))
}

/// Write `table` with a header row, replacing any file from earlier the
/// same day.
///
/// Creates `dir` if needed and returns the path written.
pub fn write_tsv(
    dir: &Utf8Path,
    report: &str,
    date: NaiveDate,
    table: &Table,
) -> Result<Utf8PathBuf, OutputError> {
    let path = report_path(dir, report, date);
    fs::create_dir_all(dir).map_err(|source| OutputError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let tsv_error = |source| OutputError::Tsv {
        path: path.clone(),
        source,
    };
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .from_path(&path)
        .map_err(tsv_error)?;
    writer.write_record(table.headers()).map_err(tsv_error)?;
    for row in table.rows() {
        writer.write_record(row).map_err(tsv_error)?;
    }
    writer.flush().map_err(|source| OutputError::Io {
        path: path.clone(),
        source,
    })?;

    tracing::info!("wrote {} rows to {}", table.rows().len(), path);
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_report_path() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
        assert_eq!(
            report_path(Utf8Path::new("/tmp/out"), "usage", date),
            Utf8PathBuf::from("/tmp/out/usage_2024-03-05.tsv")
        );
    }

    #[test]
    fn test_write_tsv() {
        let temp = TempDir::new().unwrap();
        let dir = Utf8Path::from_path(temp.path()).unwrap().join("reports");
        let date = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();

        let mut table = Table::new(["Job ID", "User", "Efficiency"]);
        table.push_row(["501", "asmith", "6.25"]);
        table.push_row(["502", "bjones", "unavailable"]);

        let path = write_tsv(&dir, "jobs", date, &table).unwrap();
        assert_eq!(path, dir.join("jobs_2024-03-05.tsv"));

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(
            content,
            "Job ID\tUser\tEfficiency\n501\tasmith\t6.25\n502\tbjones\tunavailable\n"
        );

        // Same day overwrites.
        let table = Table::new(["Job ID"]);
        write_tsv(&dir, "jobs", date, &table).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "Job ID\n");
    }
}
