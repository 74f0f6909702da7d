// Display formatting for byte counts, rates, uptime and timestamps

use chrono::NaiveDateTime;

static BYTE_UNITS: [&str; 6] = ["B", "KB", "MB", "GB", "TB", "PB"];
/// Rates stop at GB/s.
static RATE_UNITS: [&str; 4] = ["B/s", "KB/s", "MB/s", "GB/s"];

/// Timestamp layout of every output line.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

fn scale(mut value: f64, units: &'static [&'static str]) -> (f64, &'static str) {
    if !value.is_finite() || value <= 0.0 {
        value = 0.0;
    }
    let mut i = 0;
    while value >= 1024.0 && i < units.len() - 1 {
        value /= 1024.0;
        i += 1;
    }
    (value, units[i])
}

/// Scale a byte count down by 1024 until it is below 1024 or the largest unit (PB) is reached.
pub fn scale_bytes(bytes: u64) -> (f64, &'static str) {
    scale(bytes as f64, &BYTE_UNITS)
}

/// e.g. `1536` -> `"1.5KB"`.
pub fn fmt_bytes(bytes: u64) -> String {
    let (v, unit) = scale_bytes(bytes);
    format!("{:.1}{}", v, unit)
}

/// Like [`fmt_bytes`] with a `/s` suffix, capped at GB/s. Negative and non-finite rates render as zero.
pub fn fmt_rate(bytes_per_sec: f64) -> String {
    let (v, unit) = scale(bytes_per_sec, &RATE_UNITS);
    format!("{:.1}{}", v, unit)
}

/// `Nd HH:MM:SS` from a millisecond tick count.
pub fn fmt_uptime(ms: u64) -> String {
    let secs = ms / 1000;
    let days = secs / 86_400;
    let hours = (secs % 86_400) / 3600;
    let minutes = (secs % 3600) / 60;
    let seconds = secs % 60;
    format!("{}d {:02}:{:02}:{:02}", days, hours, minutes, seconds)
}

pub fn fmt_timestamp(ts: &NaiveDateTime) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}
