// Line sinks: daily log file, stdout, fan-out

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;

use crate::models::MetricLine;

/// Destination for the lines of one tick. Writes are append-only and keep line order.
pub trait LineSink: Send + Sync {
    fn write_lines(&self, lines: &[MetricLine]) -> std::io::Result<()>;
}

fn render(lines: &[MetricLine]) -> String {
    let mut out = String::new();
    for line in lines {
        out.push_str(&line.to_string());
        out.push('\n');
    }
    out
}

/// Appends to `{directory}/{prefix}_{yyyyMMdd}.log`, dated by the tick timestamp.
#[derive(Debug, Clone)]
pub struct DailyFileSink {
    directory: PathBuf,
    prefix: String,
}

impl DailyFileSink {
    /// Creates the directory if needed. Failing here is fatal for the caller.
    pub fn create(directory: impl AsRef<Path>, prefix: &str) -> anyhow::Result<Self> {
        let directory = directory.as_ref().to_path_buf();
        std::fs::create_dir_all(&directory).map_err(|e| {
            anyhow::anyhow!("cannot create log directory {}: {}", directory.display(), e)
        })?;
        Ok(Self {
            directory,
            prefix: prefix.to_string(),
        })
    }

    pub fn path_for(&self, date: NaiveDate) -> PathBuf {
        self.directory
            .join(format!("{}_{}.log", self.prefix, date.format("%Y%m%d")))
    }
}

impl LineSink for DailyFileSink {
    fn write_lines(&self, lines: &[MetricLine]) -> std::io::Result<()> {
        let Some(first) = lines.first() else {
            return Ok(());
        };
        let path = self.path_for(first.timestamp.date());
        let mut f = OpenOptions::new().create(true).append(true).open(path)?;
        f.write_all(render(lines).as_bytes())
    }
}

pub struct StdoutSink;

impl LineSink for StdoutSink {
    fn write_lines(&self, lines: &[MetricLine]) -> std::io::Result<()> {
        let mut out = std::io::stdout().lock();
        out.write_all(render(lines).as_bytes())?;
        out.flush()
    }
}

/// Writes to every inner sink; reports the first error after trying all of them.
pub struct FanoutSink {
    sinks: Vec<Box<dyn LineSink>>,
}

impl FanoutSink {
    pub fn new(sinks: Vec<Box<dyn LineSink>>) -> Self {
        Self { sinks }
    }
}

impl LineSink for FanoutSink {
    fn write_lines(&self, lines: &[MetricLine]) -> std::io::Result<()> {
        let mut first_err = None;
        for sink in &self.sinks {
            if let Err(e) = sink.write_lines(lines) {
                first_err.get_or_insert(e);
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
