// Shared test helpers: in-memory capability fakes

#![allow(dead_code)]

use perfsampler::error::SourceError;
use perfsampler::models::*;
use perfsampler::sink::LineSink;
use perfsampler::sources::{
    CounterSource, HostSources, InventorySource, MemorySource, ProcessSource,
};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// Value every counter returns on its first read, standing in for an undefined rate.
pub const GARBAGE: f64 = 123_456.0;

pub const ENGINE_3D_A: &str = "pid_100_luid_0x0_0x1_phys_0_eng_0_engtype_3D";
pub const ENGINE_3D_B: &str = "pid_200_luid_0x0_0x1_phys_0_eng_1_engtype_3D";
pub const ENGINE_COPY: &str = "pid_100_luid_0x0_0x1_phys_0_eng_2_engtype_Copy";

#[derive(Default)]
pub struct FakeCounters {
    instances: HashMap<CounterFamily, Vec<String>>,
    values: HashMap<(String, String), f64>,
    failing: HashSet<(String, String)>,
    failing_create: HashSet<(String, String)>,
    next_id: AtomicU64,
    reads: Mutex<HashMap<(String, String), usize>>,
}

impl FakeCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn family(mut self, family: CounterFamily, instances: &[&str]) -> Self {
        self.instances
            .insert(family, instances.iter().map(|s| s.to_string()).collect());
        self
    }

    pub fn value(mut self, metric: &str, instance: &str, v: f64) -> Self {
        self.values.insert((metric.into(), instance.into()), v);
        self
    }

    pub fn failing(mut self, metric: &str, instance: &str) -> Self {
        self.failing.insert((metric.into(), instance.into()));
        self
    }

    pub fn failing_create(mut self, metric: &str, instance: &str) -> Self {
        self.failing_create.insert((metric.into(), instance.into()));
        self
    }

    pub fn reads_of(&self, metric: &str, instance: &str) -> usize {
        self.reads
            .lock()
            .unwrap()
            .get(&(metric.to_string(), instance.to_string()))
            .copied()
            .unwrap_or(0)
    }
}

impl CounterSource for FakeCounters {
    fn list_instances(&self, family: CounterFamily) -> Result<Vec<String>, SourceError> {
        self.instances
            .get(&family)
            .cloned()
            .ok_or_else(|| SourceError::Unsupported(family.to_string()))
    }

    fn create_counter(
        &self,
        family: CounterFamily,
        metric: &str,
        instance: &str,
    ) -> Result<CounterHandle, SourceError> {
        if self
            .failing_create
            .contains(&(metric.to_string(), instance.to_string()))
        {
            return Err(SourceError::Read("create failed".into()));
        }
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        Ok(CounterHandle::new(id, family, metric, instance))
    }

    fn read_value(&self, handle: &CounterHandle) -> Result<f64, SourceError> {
        let key = (handle.metric().to_string(), handle.instance().to_string());
        let count = {
            let mut reads = self.reads.lock().unwrap();
            let c = reads.entry(key.clone()).or_insert(0);
            *c += 1;
            *c
        };
        if self.failing.contains(&key) {
            return Err(SourceError::Read("forced failure".into()));
        }
        if count == 1 {
            return Ok(GARBAGE);
        }
        self.values
            .get(&key)
            .copied()
            .ok_or_else(|| SourceError::Read(format!("no value for {:?}", key)))
    }
}

#[derive(Default)]
pub struct FakeInventory {
    pub processors: Vec<ProcessorRecord>,
    pub partitions: Vec<PartitionRecord>,
    pub links: Vec<LogicalDiskLink>,
    pub drives: Vec<DiskDriveRecord>,
    pub adapters: Vec<AdapterRecord>,
    /// `None` marks a volume that is not ready.
    pub volumes: HashMap<String, Option<VolumeSpace>>,
    pub fail_partitions: bool,
    pub fail_processors: bool,
}

impl InventorySource for FakeInventory {
    fn processors(&self) -> Result<Vec<ProcessorRecord>, SourceError> {
        if self.fail_processors {
            return Err(SourceError::Unsupported("processor inventory".into()));
        }
        Ok(self.processors.clone())
    }

    fn disk_partitions(&self) -> Result<Vec<PartitionRecord>, SourceError> {
        if self.fail_partitions {
            return Err(SourceError::Unsupported("partition inventory".into()));
        }
        Ok(self.partitions.clone())
    }

    fn logical_disk_links(&self) -> Result<Vec<LogicalDiskLink>, SourceError> {
        Ok(self.links.clone())
    }

    fn disk_drives(&self) -> Result<Vec<DiskDriveRecord>, SourceError> {
        Ok(self.drives.clone())
    }

    fn network_adapters(&self) -> Result<Vec<AdapterRecord>, SourceError> {
        Ok(self.adapters.clone())
    }

    fn volume_space(&self, volume: &str) -> Result<VolumeSpace, SourceError> {
        match self.volumes.get(volume) {
            Some(Some(space)) => Ok(*space),
            Some(None) => Err(SourceError::NotReady(volume.into())),
            None => Err(SourceError::Read(format!("no volume {}", volume))),
        }
    }
}

pub struct FakeHost {
    pub memory: Option<MemoryStatus>,
    pub totals: ProcessTotals,
    pub uptime_ms: u64,
}

impl Default for FakeHost {
    fn default() -> Self {
        Self {
            memory: Some(MemoryStatus {
                total_physical: 16 * 1024 * 1024 * 1024,
                available_physical: 4 * 1024 * 1024 * 1024,
            }),
            totals: ProcessTotals {
                processes: 250,
                threads: 3100,
                handles: 98000,
            },
            uptime_ms: 90_061_000,
        }
    }
}

impl MemorySource for FakeHost {
    fn query(&self) -> Result<MemoryStatus, SourceError> {
        self.memory
            .ok_or_else(|| SourceError::Read("memory status".into()))
    }
}

impl ProcessSource for FakeHost {
    fn totals(&self) -> Result<ProcessTotals, SourceError> {
        Ok(self.totals)
    }

    fn uptime_ms(&self) -> Result<u64, SourceError> {
        Ok(self.uptime_ms)
    }
}

pub fn host(counters: Arc<FakeCounters>, inventory: FakeInventory) -> HostSources {
    let fake_host = Arc::new(FakeHost::default());
    HostSources {
        counters,
        inventory: Arc::new(inventory),
        memory: fake_host.clone(),
        processes: fake_host,
    }
}

pub fn partition_link(partition: &str, volume: &str) -> LogicalDiskLink {
    LogicalDiskLink {
        antecedent: format!(
            "\\\\HOST\\root\\cimv2:Win32_DiskPartition.DeviceID=\"{}\"",
            partition
        ),
        dependent: format!("\\\\HOST\\root\\cimv2:Win32_LogicalDisk.DeviceID=\"{}\"", volume),
    }
}

/// Two disks (C: on 0, D: and E: on 1), one NIC, two 3D engines and a copy engine.
pub fn workstation_counters() -> FakeCounters {
    FakeCounters::new()
        .family(CounterFamily::Processor, &["_Total", "0", "1"])
        .family(CounterFamily::PhysicalDisk, &["0 C:", "1 D: E:", "_Total"])
        .family(
            CounterFamily::NetworkInterface,
            &["Intel[R] Ethernet Connection I219-V"],
        )
        .family(
            CounterFamily::GpuEngine,
            &[ENGINE_3D_A, ENGINE_3D_B, ENGINE_COPY],
        )
        .value(metric::PROCESSOR_TIME, "_Total", 37.5)
        .value(metric::IDLE_TIME, "0 C:", 75.0)
        .value(metric::DISK_READ_BYTES, "0 C:", 1024.0)
        .value(metric::DISK_WRITE_BYTES, "0 C:", 2048.0)
        .value(metric::IDLE_TIME, "1 D: E:", 25.0)
        .value(metric::DISK_READ_BYTES, "1 D: E:", 1024.0 * 1024.0)
        .value(metric::DISK_WRITE_BYTES, "1 D: E:", 0.0)
        .value(
            metric::BYTES_RECEIVED,
            "Intel[R] Ethernet Connection I219-V",
            10.0 * 1024.0,
        )
        .value(
            metric::BYTES_SENT,
            "Intel[R] Ethernet Connection I219-V",
            512.0,
        )
        .value(metric::UTILIZATION, ENGINE_3D_A, 40.0)
        .value(metric::UTILIZATION, ENGINE_3D_B, 70.0)
        .value(metric::UTILIZATION, ENGINE_COPY, 90.0)
}

pub fn workstation_inventory() -> FakeInventory {
    let gib = 1024 * 1024 * 1024;
    FakeInventory {
        processors: vec![ProcessorRecord {
            current_mhz: 2900.0,
            max_mhz: 3600.0,
            cores: 6,
            logical: 12,
        }],
        partitions: vec![
            PartitionRecord {
                device_id: "Disk #0, Partition #1".into(),
                disk_index: 0,
            },
            PartitionRecord {
                device_id: "Disk #1, Partition #0".into(),
                disk_index: 1,
            },
            PartitionRecord {
                device_id: "Disk #1, Partition #1".into(),
                disk_index: 1,
            },
        ],
        links: vec![
            partition_link("Disk #0, Partition #1", "C:"),
            partition_link("Disk #1, Partition #0", "D:"),
            partition_link("Disk #1, Partition #1", "E:"),
        ],
        drives: vec![
            DiskDriveRecord {
                index: 0,
                media_type: "Fixed hard disk media".into(),
                model: "Samsung SSD 970 EVO Plus 1TB".into(),
            },
            DiskDriveRecord {
                index: 1,
                media_type: "Fixed hard disk media".into(),
                model: "ST2000DM008-2FR102".into(),
            },
        ],
        adapters: vec![AdapterRecord {
            description: "Intel(R) Ethernet Connection I219-V".into(),
            connection_id: "Ethernet".into(),
            ip_enabled: true,
            addresses: vec!["fe80::1".into(), "192.168.1.20".into()],
        }],
        volumes: HashMap::from([
            (
                "C:".to_string(),
                Some(VolumeSpace {
                    free: 100 * gib,
                    total: 500 * gib,
                }),
            ),
            (
                "D:".to_string(),
                Some(VolumeSpace {
                    free: gib,
                    total: 2 * gib,
                }),
            ),
            ("E:".to_string(), None),
        ]),
        fail_partitions: false,
        fail_processors: false,
    }
}

/// Collects every written line, for worker tests.
#[derive(Default)]
pub struct MemorySink {
    pub lines: Mutex<Vec<String>>,
}

impl LineSink for MemorySink {
    fn write_lines(&self, lines: &[MetricLine]) -> std::io::Result<()> {
        let mut out = self.lines.lock().unwrap();
        out.extend(lines.iter().map(|l| l.to_string()));
        Ok(())
    }
}
