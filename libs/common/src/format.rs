//! Human-readable byte sizes

const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];

/// Format a byte count with base-1024 units.
///
/// Picks the largest unit (up to GB) whose scaled value is at least 1 and
/// rounds to two decimals, dropping trailing zeros: `1536` becomes `"1.5 KB"`.
/// Zero is rendered as `"0 Bytes"`.
pub fn format_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0 Bytes".to_string();
    }

    let mut unit = 0;
    let mut divisor = 1u64;
    while unit + 1 < UNITS.len() && bytes / divisor >= 1024 {
        divisor *= 1024;
        unit += 1;
    }

    let scaled = bytes as f64 / divisor as f64;
    let rounded = (scaled * 100.0).round() / 100.0;

    format!("{} {}", rounded, UNITS[unit])
}
