// Byte, rate, uptime and timestamp formatting tests

use chrono::NaiveDate;
use perfsampler::format::*;

#[test]
fn test_scale_bytes_stays_below_1024() {
    for bytes in [1u64, 1023, 1024, 1536, 10 * 1024 * 1024, u64::MAX / 3, u64::MAX] {
        let (value, unit) = scale_bytes(bytes);
        let power = ["B", "KB", "MB", "GB", "TB", "PB"]
            .iter()
            .position(|u| *u == unit)
            .unwrap();
        assert!(value >= 1.0, "{} -> {} {}", bytes, value, unit);
        if unit != "PB" {
            assert!(value < 1024.0, "{} -> {} {}", bytes, value, unit);
        }
        let restored = value * 1024f64.powi(power as i32);
        assert!(((restored - bytes as f64) / bytes as f64).abs() < 1e-9);
    }
}

#[test]
fn test_fmt_bytes() {
    assert_eq!(fmt_bytes(0), "0.0B");
    assert_eq!(fmt_bytes(1023), "1023.0B");
    assert_eq!(fmt_bytes(1536), "1.5KB");
    assert_eq!(fmt_bytes(16 * 1024 * 1024 * 1024), "16.0GB");
    assert_eq!(fmt_bytes(5 * 1024u64.pow(5)), "5.0PB");
    assert_eq!(fmt_bytes(2048 * 1024u64.pow(5)), "2048.0PB");
}

#[test]
fn test_fmt_rate_caps_at_gb() {
    assert_eq!(fmt_rate(512.0), "512.0B/s");
    assert_eq!(fmt_rate(10.0 * 1024.0), "10.0KB/s");
    assert_eq!(fmt_rate(1024.0 * 1024.0), "1.0MB/s");
    assert_eq!(fmt_rate(1024f64.powi(4)), "1024.0GB/s");
}

#[test]
fn test_fmt_rate_negative_and_non_finite_render_zero() {
    assert_eq!(fmt_rate(-5.0), "0.0B/s");
    assert_eq!(fmt_rate(-0.0), "0.0B/s");
    assert_eq!(fmt_rate(f64::NAN), "0.0B/s");
    assert_eq!(fmt_rate(f64::INFINITY), "0.0B/s");
}

#[test]
fn test_fmt_uptime() {
    assert_eq!(fmt_uptime(0), "0d 00:00:00");
    assert_eq!(fmt_uptime(999), "0d 00:00:00");
    assert_eq!(fmt_uptime(90_061_000), "1d 01:01:01");
    assert_eq!(fmt_uptime(45 * 86_400_000 + 23 * 3_600_000 + 59 * 60_000 + 59_000), "45d 23:59:59");
}

#[test]
fn test_fmt_timestamp() {
    let ts = NaiveDate::from_ymd_opt(2024, 1, 5)
        .unwrap()
        .and_hms_milli_opt(7, 3, 9, 870)
        .unwrap();
    assert_eq!(fmt_timestamp(&ts), "2024-01-05 07:03:09");
}
