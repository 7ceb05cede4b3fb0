//! Node-list decoding.
//!
//! Grammar accepted by [`decode`]:
//!
//! ```text
//!  expr  ::= host | prefix '[' spec ']'
//!  spec  ::= part (',' part)*
//!  part  ::= number | number '-' number
//! ```
//!
//! A range is expanded inclusively and every generated index is padded to the
//! width of the range start, so `dg[035-036]` gives `dg035 dg036`.  A single
//! index keeps its literal text.  Output order is textual order; overlapping
//! parts are not merged.
//!
//! Scheduler output may hold several expressions separated by top-level
//! commas (`dn[001-002],dg013`); [`decode_many`] handles that form.

use crate::Host;
use thiserror::Error;

/// Ranges larger than this are rejected rather than expanded.
const MAX_RANGE_LEN: u64 = 100_000;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("empty node list expression")]
    Empty,
    #[error("unbalanced brackets in node list '{expr}'")]
    Unbalanced { expr: String },
    #[error("missing host prefix in node list '{expr}'")]
    MissingPrefix { expr: String },
    #[error("unexpected text after ']' in node list '{expr}'")]
    TrailingText { expr: String },
    #[error("empty index list in node list '{expr}'")]
    EmptySpec { expr: String },
    #[error("empty element in index list of node list '{expr}'")]
    EmptyPart { expr: String },
    #[error("non-numeric index '{part}' in node list '{expr}'")]
    NonNumeric { expr: String, part: String },
    #[error("range start {start} is greater than end {end} in node list '{expr}'")]
    ReversedRange { expr: String, start: String, end: String },
    #[error("range '{part}' in node list '{expr}' is too large")]
    TooLarge { expr: String, part: String },
}

/// Decode one node-list expression into an ordered list of hosts.
pub fn decode(expr: &str) -> Result<Vec<Host>, ParseError> {
    let expr = expr.trim();
    if expr.is_empty() {
        return Err(ParseError::Empty);
    }

    let Some(open) = expr.find('[') else {
        if expr.contains(']') {
            return Err(ParseError::Unbalanced {
                expr: expr.to_string(),
            });
        }
        return Ok(vec![Host::from(expr)]);
    };

    let prefix = &expr[..open];
    if prefix.is_empty() {
        return Err(ParseError::MissingPrefix {
            expr: expr.to_string(),
        });
    }
    if prefix.contains(']') {
        return Err(ParseError::Unbalanced {
            expr: expr.to_string(),
        });
    }

    let rest = &expr[open + 1..];
    let Some(close) = rest.find(']') else {
        return Err(ParseError::Unbalanced {
            expr: expr.to_string(),
        });
    };
    let spec = &rest[..close];
    if spec.contains('[') {
        return Err(ParseError::Unbalanced {
            expr: expr.to_string(),
        });
    }
    if close + 1 != rest.len() {
        return Err(ParseError::TrailingText {
            expr: expr.to_string(),
        });
    }
    if spec.trim().is_empty() {
        return Err(ParseError::EmptySpec {
            expr: expr.to_string(),
        });
    }

    let mut hosts = Vec::new();
    for part in spec.split(',') {
        expand_part(expr, prefix, part, &mut hosts)?;
    }
    Ok(hosts)
}

/// Decode a comma-separated list of node-list expressions, as printed by
/// `squeue %N` or `sacct NodeList` for jobs spanning several pools.
pub fn decode_many(list: &str) -> Result<Vec<Host>, ParseError> {
    let list = list.trim();
    if list.is_empty() {
        return Err(ParseError::Empty);
    }

    let mut hosts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;
    for (i, c) in list.char_indices() {
        match c {
            '[' => depth += 1,
            ']' => {
                depth = depth.checked_sub(1).ok_or_else(|| ParseError::Unbalanced {
                    expr: list.to_string(),
                })?;
            }
            ',' if depth == 0 => {
                hosts.extend(decode(&list[start..i])?);
                start = i + 1;
            }
            _ => {}
        }
    }
    if depth != 0 {
        return Err(ParseError::Unbalanced {
            expr: list.to_string(),
        });
    }
    hosts.extend(decode(&list[start..])?);
    Ok(hosts)
}

fn expand_part(
    expr: &str,
    prefix: &str,
    part: &str,
    hosts: &mut Vec<Host>,
) -> Result<(), ParseError> {
    let part = part.trim();
    if part.is_empty() {
        return Err(ParseError::EmptyPart {
            expr: expr.to_string(),
        });
    }

    match part.split_once('-') {
        Some((start, end)) => {
            let first = parse_index(expr, start)?;
            let last = parse_index(expr, end)?;
            if first > last {
                return Err(ParseError::ReversedRange {
                    expr: expr.to_string(),
                    start: start.to_string(),
                    end: end.to_string(),
                });
            }
            if last - first >= MAX_RANGE_LEN {
                return Err(ParseError::TooLarge {
                    expr: expr.to_string(),
                    part: part.to_string(),
                });
            }
            let width = start.len();
            for index in first..=last {
                hosts.push(Host::new(format!("{prefix}{index:0width$}")));
            }
        }
        None => {
            parse_index(expr, part)?;
            hosts.push(Host::new(format!("{prefix}{part}")));
        }
    }
    Ok(())
}

fn parse_index(expr: &str, s: &str) -> Result<u64, ParseError> {
    if s.is_empty() || !s.chars().all(|c| c.is_ascii_digit()) {
        return Err(ParseError::NonNumeric {
            expr: expr.to_string(),
            part: s.to_string(),
        });
    }
    s.parse().map_err(|_| ParseError::NonNumeric {
        expr: expr.to_string(),
        part: s.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(hosts: &[Host]) -> Vec<&str> {
        hosts.iter().map(Host::as_str).collect()
    }

    #[test]
    fn test_decode_ranges_and_singles() {
        let hosts = decode("dg[035-036,042]").unwrap();
        assert_eq!(names(&hosts), vec!["dg035", "dg036", "dg042"]);
    }

    #[test]
    fn test_decode_bare_host() {
        assert_eq!(names(&decode("cn014").unwrap()), vec!["cn014"]);
    }

    #[test]
    fn test_decode_range_count_and_padding() {
        let hosts = decode("dn[008-012]").unwrap();
        assert_eq!(hosts.len(), 12 - 8 + 1);
        assert_eq!(names(&hosts), vec!["dn008", "dn009", "dn010", "dn011", "dn012"]);
        assert!(hosts.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_decode_width_follows_range_start() {
        // Width comes from the start of the range, not the end.
        assert_eq!(names(&decode("xm[8-10]").unwrap()), vec!["xm8", "xm9", "xm10"]);
        assert_eq!(names(&decode("xm[08-10]").unwrap()), vec!["xm08", "xm09", "xm10"]);
    }

    #[test]
    fn test_decode_single_keeps_literal_width() {
        assert_eq!(names(&decode("dg[7,0042]").unwrap()), vec!["dg7", "dg0042"]);
    }

    #[test]
    fn test_decode_overlaps_are_kept() {
        let hosts = decode("dn[001-003,002]").unwrap();
        assert_eq!(names(&hosts), vec!["dn001", "dn002", "dn003", "dn002"]);
    }

    #[test]
    fn test_decode_reversed_range() {
        assert!(matches!(
            decode("dg[036-035]"),
            Err(ParseError::ReversedRange { .. })
        ));
    }

    #[test]
    fn test_decode_malformed() {
        assert_eq!(decode(""), Err(ParseError::Empty));
        assert!(matches!(decode("dg[035"), Err(ParseError::Unbalanced { .. })));
        assert!(matches!(decode("dg035]"), Err(ParseError::Unbalanced { .. })));
        assert!(matches!(decode("dg[[035]]"), Err(ParseError::Unbalanced { .. })));
        assert!(matches!(decode("[035]"), Err(ParseError::MissingPrefix { .. })));
        assert!(matches!(decode("dg[]"), Err(ParseError::EmptySpec { .. })));
        assert!(matches!(decode("dg[035,]"), Err(ParseError::EmptyPart { .. })));
        assert!(matches!(decode("dg[03a]"), Err(ParseError::NonNumeric { .. })));
        assert!(matches!(decode("dg[1-]"), Err(ParseError::NonNumeric { .. })));
        assert!(matches!(decode("dg[035]x"), Err(ParseError::TrailingText { .. })));
        assert!(matches!(decode("dg[0-999999]"), Err(ParseError::TooLarge { .. })));
    }

    #[test]
    fn test_error_names_expression() {
        let err = decode("dg[036-035]").unwrap_err();
        assert!(err.to_string().contains("dg[036-035]"));
    }

    #[test]
    fn test_decode_many() {
        let hosts = decode_many("dn[001-002,005],dg013,xm[1-2]").unwrap();
        assert_eq!(
            names(&hosts),
            vec!["dn001", "dn002", "dn005", "dg013", "xm1", "xm2"]
        );
        assert!(matches!(decode_many("dn[001,dg013"), Err(ParseError::Unbalanced { .. })));
        assert!(matches!(decode_many("dn001,,dg013"), Err(ParseError::Empty)));
    }
}
