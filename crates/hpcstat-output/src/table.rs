//! psql-style text tables.
//!
//! ```text
//! +--------+-------+
//! | Node   | CPU % |
//! |--------+-------|
//! | dg012  | 50.00 |
//! +--------+-------+
//! ```

use std::fmt;

/// Text shown for a value that could not be obtained.
pub const UNAVAILABLE: &str = "unavailable";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Right,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    headers: Vec<String>,
    align: Vec<Align>,
    rows: Vec<Vec<String>>,
}

impl Table {
    /// A table whose columns are all left aligned.
    pub fn new<S: Into<String>>(headers: impl IntoIterator<Item = S>) -> Self {
        let headers: Vec<String> = headers.into_iter().map(Into::into).collect();
        let align = vec![Align::Left; headers.len()];
        Self {
            headers,
            align,
            rows: Vec::new(),
        }
    }

    /// Set column alignment; columns beyond `align` stay left aligned.
    pub fn with_align(mut self, align: &[Align]) -> Self {
        for (slot, a) in self.align.iter_mut().zip(align) {
            *slot = *a;
        }
        self
    }

    /// Append a row. Short rows are padded with empty cells and long rows are
    /// cut to the header width.
    pub fn push_row<S: Into<String>>(&mut self, cells: impl IntoIterator<Item = S>) {
        let mut row: Vec<String> = cells.into_iter().map(Into::into).collect();
        row.resize(self.headers.len(), String::new());
        self.rows.push(row);
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn widths(&self) -> Vec<usize> {
        let mut widths: Vec<usize> = self.headers.iter().map(|h| h.chars().count()).collect();
        for row in &self.rows {
            for (w, cell) in widths.iter_mut().zip(row) {
                *w = (*w).max(cell.chars().count());
            }
        }
        widths
    }
}

fn rule(f: &mut fmt::Formatter<'_>, widths: &[usize], edge: char) -> fmt::Result {
    write!(f, "{edge}")?;
    for (i, w) in widths.iter().enumerate() {
        if i > 0 {
            write!(f, "+")?;
        }
        write!(f, "{}", "-".repeat(w + 2))?;
    }
    writeln!(f, "{edge}")
}

fn line(
    f: &mut fmt::Formatter<'_>,
    widths: &[usize],
    align: &[Align],
    cells: &[String],
) -> fmt::Result {
    write!(f, "|")?;
    for ((&w, a), cell) in widths.iter().zip(align).zip(cells) {
        match a {
            Align::Left => write!(f, " {cell:<w$} |")?,
            Align::Right => write!(f, " {cell:>w$} |")?,
        }
    }
    writeln!(f)
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let widths = self.widths();
        rule(f, &widths, '+')?;
        line(f, &widths, &vec![Align::Left; widths.len()], &self.headers)?;
        rule(f, &widths, '|')?;
        for row in &self.rows {
            line(f, &widths, &self.align, row)?;
        }
        rule(f, &widths, '+')
    }
}

/// Format a number with `precision` decimals.
pub fn fmt_value(value: f64, precision: usize) -> String {
    format!("{value:.precision$}")
}

/// Format an optional number, rendering `None` as `unavailable`.
pub fn fmt_opt(value: Option<f64>, precision: usize) -> String {
    match value {
        Some(v) => fmt_value(v, precision),
        None => UNAVAILABLE.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_psql() {
        let mut table = Table::new(["Node", "CPU %"]).with_align(&[Align::Left, Align::Right]);
        table.push_row(["dg012", "50.00"]);
        table.push_row(["dn1", "5.5"]);

        let expected = "\
+-------+-------+
| Node  | CPU % |
|-------+-------|
| dg012 | 50.00 |
| dn1   |   5.5 |
+-------+-------+
";
        assert_eq!(table.to_string(), expected);
    }

    #[test]
    fn test_rows_padded_to_headers() {
        let mut table = Table::new(["a", "b", "c"]);
        table.push_row(["1"]);
        table.push_row(["1", "2", "3", "4"]);
        assert_eq!(table.rows()[0], vec!["1", "", ""]);
        assert_eq!(table.rows()[1].len(), 3);
    }

    #[test]
    fn test_empty_table() {
        let table = Table::new(["Job"]);
        assert!(table.is_empty());
        assert_eq!(table.to_string(), "+-----+\n| Job |\n|-----|\n+-----+\n");
    }

    #[test]
    fn test_fmt_opt() {
        assert_eq!(fmt_opt(Some(6.25), 2), "6.25");
        assert_eq!(fmt_opt(Some(1.0 / 3.0), 3), "0.333");
        assert_eq!(fmt_opt(None, 2), "unavailable");
    }
}
