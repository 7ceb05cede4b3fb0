//! Memory figures and unit conversion.

/// KiB per GiB, the fixed divisor used for resident set sizes.
const KIB_PER_GB: f64 = 1024.0 * 1024.0;

/// MiB per GiB.
const MB_PER_GB: f64 = 1024.0;

/// Parse a memory figure from `sinfo` ("4G", "1000M", "4096K", "4096")
/// to megabytes. A bare number is already in megabytes.
///
/// Returns None for empty strings and placeholders.
pub fn parse_memory_mb(s: &str) -> Option<u64> {
    let s = s.trim();
    if s.is_empty() || s == "-" || s == "N/A" {
        return None;
    }

    if let Some(stripped) = s.strip_suffix('T') {
        stripped.parse::<u64>().ok().map(|v| v * 1024 * 1024)
    } else if let Some(stripped) = s.strip_suffix('G') {
        stripped.parse::<u64>().ok().map(|v| v * 1024)
    } else if let Some(stripped) = s.strip_suffix('M') {
        stripped.parse::<u64>().ok()
    } else if let Some(stripped) = s.strip_suffix('K') {
        stripped.parse::<u64>().ok().map(|v| v / 1024)
    } else {
        s.parse::<u64>().ok()
    }
}

/// Convert a resident set size in KiB (as printed by `ps -o rss`) to GB.
pub fn kib_to_gb(kib: f64) -> f64 {
    kib / KIB_PER_GB
}

/// Convert megabytes (as printed by `sinfo`) to GB.
pub fn mb_to_gb(mb: f64) -> f64 {
    mb / MB_PER_GB
}
