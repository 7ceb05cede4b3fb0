//! Report output for hpcstat: psql-style console tables and date-stamped
//! tab-separated files.

pub mod table;
pub mod tsv;

pub use table::{Align, Table, UNAVAILABLE, fmt_opt, fmt_value};
pub use tsv::{OutputError, report_path, write_tsv};
