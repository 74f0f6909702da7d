// Disk inventory records: partitions, volume associations, drives, volume space

/// One partition and the physical disk it lives on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionRecord {
    /// Partition identifier, e.g. "Disk #0, Partition #1".
    pub device_id: String,
    pub disk_index: u32,
}

/// Association of a logical volume with a partition.
///
/// Both ends are opaque object paths; the quoted substring inside each one is the key,
/// e.g. `...DiskPartition.DeviceID="Disk #0, Partition #1"` and `...LogicalDisk.DeviceID="C:"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogicalDiskLink {
    /// Partition side.
    pub antecedent: String,
    /// Volume side.
    pub dependent: String,
}

/// Physical drive metadata used for media-type classification.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DiskDriveRecord {
    pub index: u32,
    pub media_type: String,
    pub model: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VolumeSpace {
    pub free: u64,
    pub total: u64,
}
