// Output line: `<timestamp> | <METRIC_TAG> | key=value ...`

use chrono::NaiveDateTime;
use std::fmt;

use crate::format::fmt_timestamp;

/// Metric tag of one output line. The string forms are part of the log contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricTag {
    Cpu,
    CpuAll,
    Ram,
    Disk,
    DiskPhys,
    DiskAll,
    Net,
    NetAll,
    Gpu,
}

impl MetricTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricTag::Cpu => "CPU",
            MetricTag::CpuAll => "CPU_ALL",
            MetricTag::Ram => "RAM",
            MetricTag::Disk => "DISK",
            MetricTag::DiskPhys => "DISK_PHYS",
            MetricTag::DiskAll => "DISK_ALL",
            MetricTag::Net => "NET",
            MetricTag::NetAll => "NET_ALL",
            MetricTag::Gpu => "GPU",
        }
    }
}

impl fmt::Display for MetricTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One rendered metric record. `Display` produces the exact wire line (no newline).
#[derive(Debug, Clone, PartialEq)]
pub struct MetricLine {
    pub timestamp: NaiveDateTime,
    pub tag: MetricTag,
    pub fields: String,
}

impl MetricLine {
    pub fn new(timestamp: NaiveDateTime, tag: MetricTag, fields: impl Into<String>) -> Self {
        Self {
            timestamp,
            tag,
            fields: fields.into(),
        }
    }
}

impl fmt::Display for MetricLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} | {} | {}",
            fmt_timestamp(&self.timestamp),
            self.tag,
            self.fields
        )
    }
}
