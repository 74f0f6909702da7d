// Capability interfaces consumed by the sampler: counters, inventory, memory, processes

use std::sync::Arc;

use crate::error::SourceError;
use crate::models::{
    AdapterRecord, CounterFamily, CounterHandle, DiskDriveRecord, LogicalDiskLink, MemoryStatus,
    PartitionRecord, ProcessTotals, ProcessorRecord, VolumeSpace,
};

/// Host counter subsystem.
pub trait CounterSource: Send + Sync {
    /// Instance names currently exposed for `family`, aggregate instances included.
    /// Returns [`SourceError::Unsupported`] when the family does not exist on this host.
    fn list_instances(&self, family: CounterFamily) -> Result<Vec<String>, SourceError>;

    fn create_counter(
        &self,
        family: CounterFamily,
        metric: &str,
        instance: &str,
    ) -> Result<CounterHandle, SourceError>;

    /// Current value of a counter. Rate counters return an undefined value on the first
    /// read after creation.
    fn read_value(&self, handle: &CounterHandle) -> Result<f64, SourceError>;
}

/// Hardware inventory and association records, independent of counter naming.
pub trait InventorySource: Send + Sync {
    /// One record per processor package.
    fn processors(&self) -> Result<Vec<ProcessorRecord>, SourceError>;

    fn disk_partitions(&self) -> Result<Vec<PartitionRecord>, SourceError>;

    fn logical_disk_links(&self) -> Result<Vec<LogicalDiskLink>, SourceError>;

    fn disk_drives(&self) -> Result<Vec<DiskDriveRecord>, SourceError>;

    /// Adapter configurations; includes adapters that are not IP-enabled.
    fn network_adapters(&self) -> Result<Vec<AdapterRecord>, SourceError>;

    /// Free and total space of a volume (drive letter or mount point).
    /// Returns [`SourceError::NotReady`] when the volume is offline.
    fn volume_space(&self, volume: &str) -> Result<VolumeSpace, SourceError>;
}

pub trait MemorySource: Send + Sync {
    fn query(&self) -> Result<MemoryStatus, SourceError>;
}

pub trait ProcessSource: Send + Sync {
    fn totals(&self) -> Result<ProcessTotals, SourceError>;

    /// Milliseconds since boot.
    fn uptime_ms(&self) -> Result<u64, SourceError>;
}

/// The four capabilities bundled for the sampler and worker.
#[derive(Clone)]
pub struct HostSources {
    pub counters: Arc<dyn CounterSource>,
    pub inventory: Arc<dyn InventorySource>,
    pub memory: Arc<dyn MemorySource>,
    pub processes: Arc<dyn ProcessSource>,
}

impl HostSources {
    /// Use one value for every capability (e.g. a [`crate::sysinfo_repo::SysinfoRepo`]).
    pub fn from_single<T>(source: Arc<T>) -> Self
    where
        T: CounterSource + InventorySource + MemorySource + ProcessSource + 'static,
    {
        Self {
            counters: source.clone(),
            inventory: source.clone(),
            memory: source.clone(),
            processes: source,
        }
    }
}
