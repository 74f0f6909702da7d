// Counter families and live counter handles

use std::fmt;

use crate::correlate::parse_leading_index;

/// Counter names as exposed by the host counter subsystem.
pub mod metric {
    pub const PROCESSOR_TIME: &str = "% Processor Time";
    pub const IDLE_TIME: &str = "% Idle Time";
    pub const DISK_READ_BYTES: &str = "Disk Read Bytes/sec";
    pub const DISK_WRITE_BYTES: &str = "Disk Write Bytes/sec";
    pub const BYTES_RECEIVED: &str = "Bytes Received/sec";
    pub const BYTES_SENT: &str = "Bytes Sent/sec";
    pub const UTILIZATION: &str = "Utilization Percentage";
}

/// A family of countable entities known to the counter subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CounterFamily {
    Processor,
    PhysicalDisk,
    NetworkInterface,
    GpuEngine,
}

impl CounterFamily {
    /// Category name used by the counter subsystem (e.g. "PhysicalDisk").
    pub fn category(&self) -> &'static str {
        match self {
            CounterFamily::Processor => "Processor",
            CounterFamily::PhysicalDisk => "PhysicalDisk",
            CounterFamily::NetworkInterface => "Network Interface",
            CounterFamily::GpuEngine => "GPU Engine",
        }
    }
}

impl fmt::Display for CounterFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.category())
    }
}

/// Reference to one live counter stream, e.g. "% Idle Time" of physical disk "0 C:".
///
/// Handles are created by a [`crate::sources::CounterSource`] and never mutated;
/// the source keeps whatever per-stream state it needs keyed by [`CounterHandle::id`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CounterHandle {
    id: u64,
    family: CounterFamily,
    metric: String,
    instance: String,
    index: Option<u32>,
}

impl CounterHandle {
    pub fn new(
        id: u64,
        family: CounterFamily,
        metric: impl Into<String>,
        instance: impl Into<String>,
    ) -> Self {
        let instance = instance.into();
        let index = parse_leading_index(&instance);
        Self {
            id,
            family,
            metric: metric.into(),
            instance,
            index,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn family(&self) -> CounterFamily {
        self.family
    }

    pub fn metric(&self) -> &str {
        &self.metric
    }

    /// Raw instance name as assigned by the counter subsystem.
    pub fn instance(&self) -> &str {
        &self.instance
    }

    /// Leading numeric entity index of the instance name, when it has one.
    pub fn index(&self) -> Option<u32> {
        self.index
    }
}

impl fmt::Display for CounterHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})\\{}", self.family, self.instance, self.metric)
    }
}
