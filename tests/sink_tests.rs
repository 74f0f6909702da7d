// Line sink tests: daily file naming, append order and fan-out

mod common;

use chrono::NaiveDate;
use common::MemorySink;
use perfsampler::models::{MetricLine, MetricTag};
use perfsampler::sink::{DailyFileSink, FanoutSink, LineSink};
use std::sync::Arc;

fn line(day: u32, second: u32, tag: MetricTag, fields: &str) -> MetricLine {
    let ts = NaiveDate::from_ymd_opt(2025, 6, day)
        .unwrap()
        .and_hms_opt(23, 59, second)
        .unwrap();
    MetricLine::new(ts, tag, fields)
}

struct FailingSink;

impl LineSink for FailingSink {
    fn write_lines(&self, _lines: &[MetricLine]) -> std::io::Result<()> {
        Err(std::io::Error::other("disk full"))
    }
}

#[test]
fn test_daily_file_sink_creates_directory_and_names_by_date() {
    let dir = tempfile::TempDir::new().unwrap();
    let nested = dir.path().join("logs").join("perf");
    let sink = DailyFileSink::create(&nested, "performance").unwrap();
    assert!(nested.is_dir());
    assert_eq!(
        sink.path_for(NaiveDate::from_ymd_opt(2025, 6, 9).unwrap()),
        nested.join("performance_20250609.log")
    );
}

#[test]
fn test_daily_file_sink_appends_in_order() {
    let dir = tempfile::TempDir::new().unwrap();
    let sink = DailyFileSink::create(dir.path(), "performance").unwrap();

    sink.write_lines(&[
        line(9, 1, MetricTag::Cpu, "usage=1.0%"),
        line(9, 1, MetricTag::Ram, "used=1.0GB total=2.0GB (50.0%)"),
    ])
    .unwrap();
    sink.write_lines(&[line(9, 6, MetricTag::Gpu, "usage=0.0%")])
        .unwrap();

    let content =
        std::fs::read_to_string(dir.path().join("performance_20250609.log")).unwrap();
    assert_eq!(
        content,
        "2025-06-09 23:59:01 | CPU | usage=1.0%\n\
         2025-06-09 23:59:01 | RAM | used=1.0GB total=2.0GB (50.0%)\n\
         2025-06-09 23:59:06 | GPU | usage=0.0%\n"
    );
}

#[test]
fn test_daily_file_sink_rolls_over_by_tick_date() {
    let dir = tempfile::TempDir::new().unwrap();
    let sink = DailyFileSink::create(dir.path(), "host").unwrap();
    sink.write_lines(&[line(9, 58, MetricTag::Cpu, "usage=1.0%")])
        .unwrap();
    sink.write_lines(&[line(10, 3, MetricTag::Cpu, "usage=2.0%")])
        .unwrap();
    assert!(dir.path().join("host_20250609.log").exists());
    assert!(dir.path().join("host_20250610.log").exists());
}

#[test]
fn test_daily_file_sink_ignores_empty_batch() {
    let dir = tempfile::TempDir::new().unwrap();
    let sink = DailyFileSink::create(dir.path(), "performance").unwrap();
    sink.write_lines(&[]).unwrap();
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn test_fanout_sink_writes_every_sink_and_reports_failure() {
    let memory = Arc::new(MemorySink::default());
    struct Shared(Arc<MemorySink>);
    impl LineSink for Shared {
        fn write_lines(&self, lines: &[MetricLine]) -> std::io::Result<()> {
            self.0.write_lines(lines)
        }
    }

    let fanout = FanoutSink::new(vec![Box::new(FailingSink), Box::new(Shared(memory.clone()))]);
    let err = fanout
        .write_lines(&[line(9, 0, MetricTag::Net, "none")])
        .unwrap_err();
    assert_eq!(err.to_string(), "disk full");
    assert_eq!(
        *memory.lines.lock().unwrap(),
        vec!["2025-06-09 23:59:00 | NET | none".to_string()]
    );
}
