pub mod energy;
pub mod modules;
pub mod usage;

use camino::Utf8Path;
use hpcstat_output::{Table, write_tsv};
use miette::{IntoDiagnostic, Result};

/// Print `table` and, when `output_dir` is set, save it as a dated TSV file.
pub(crate) fn emit(report: &str, table: &Table, output_dir: Option<&Utf8Path>) -> Result<()> {
    println!("{table}");
    if let Some(dir) = output_dir {
        let today = chrono::Local::now().date_naive();
        let path = write_tsv(dir, report, today, table).into_diagnostic()?;
        println!("Report written to {path}");
    }
    Ok(())
}
