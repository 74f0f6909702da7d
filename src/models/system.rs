// Processor topology, memory status and process totals

/// One processor package (socket).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ProcessorRecord {
    pub current_mhz: f64,
    pub max_mhz: f64,
    pub cores: u32,
    pub logical: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MemoryStatus {
    pub total_physical: u64,
    pub available_physical: u64,
}

impl MemoryStatus {
    pub fn used(&self) -> u64 {
        self.total_physical.saturating_sub(self.available_physical)
    }

    pub fn used_percent(&self) -> f64 {
        if self.total_physical > 0 {
            (self.used() as f64 / self.total_physical as f64) * 100.0
        } else {
            0.0
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProcessTotals {
    pub processes: u64,
    pub threads: u64,
    pub handles: u64,
}
