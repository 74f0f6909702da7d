// Host capabilities via sysinfo, plus Linux /proc and /sys readers

mod linux;
pub mod rate;

use crate::discovery::{GPU_3D_MARKER, TOTAL_INSTANCE};
use crate::error::SourceError;
use crate::models::*;
use crate::sources::{CounterSource, InventorySource, MemorySource, ProcessSource};
use rate::RateTracker;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Instant;
use sysinfo::{Disks, Networks, ProcessesToUpdate, System};
use tracing::instrument;

fn lock<'a, T>(m: &'a Mutex<T>, what: &'static str) -> Result<MutexGuard<'a, T>, SourceError> {
    m.lock().map_err(|_| SourceError::Poisoned(what))
}

/// Partition identifier in the "Disk #N, Partition #M" form used by volume associations.
fn partition_id(disk_index: u32, partition: u32) -> String {
    format!("Disk #{}, Partition #{}", disk_index, partition)
}

/// GPU engine instance name for a DRM card: "card0" -> "card0_engtype_3d".
fn gpu_instance(card: &str) -> String {
    format!("{}_{}", card, GPU_3D_MARKER)
}

/// One volume link per partition from /proc/mounts content. A partition mounted more
/// than once (bind mounts, subvolumes) keeps its shortest mount point, the first on a tie.
fn mount_links(layout: &[(u32, String, String)], mounts: &str) -> Vec<LogicalDiskLink> {
    let mut chosen: Vec<(&str, String)> = Vec::new();
    for (source, mount_point) in linux::parse_mounts(mounts) {
        let Some(device) = source.strip_prefix("/dev/") else {
            continue;
        };
        if mount_point.contains('"') {
            continue;
        }
        let Some((_, _, part_id)) = layout.iter().find(|(_, name, _)| name == device) else {
            continue;
        };
        match chosen.iter_mut().find(|(id, _)| *id == part_id.as_str()) {
            Some(entry) if mount_point.len() < entry.1.len() => entry.1 = mount_point,
            Some(_) => {}
            None => chosen.push((part_id.as_str(), mount_point)),
        }
    }
    chosen
        .into_iter()
        .map(|(part_id, mount_point)| LogicalDiskLink {
            antecedent: format!("DiskPartition.DeviceID=\"{}\"", part_id),
            dependent: format!("LogicalDisk.DeviceID=\"{}\"", mount_point),
        })
        .collect()
}

/// Device part of a disk instance name: "0 sda" -> "sda".
fn disk_device(instance: &str) -> &str {
    instance
        .trim_start()
        .split_once(' ')
        .map(|(_, dev)| dev.trim())
        .unwrap_or(instance)
}

/// sysinfo-backed implementation of every capability the sampler needs.
///
/// Rate counters are derived from cumulative totals; each handle keeps its own
/// baseline, so the first read after creation has nothing to compare against and
/// returns 0.
pub struct SysinfoRepo {
    sys: Mutex<System>,
    disks: Mutex<Disks>,
    networks: Mutex<Networks>,
    rates: Mutex<RateTracker>,
    next_id: AtomicU64,
}

impl Default for SysinfoRepo {
    fn default() -> Self {
        Self::new()
    }
}

impl SysinfoRepo {
    pub fn new() -> Self {
        let mut sys = System::new_all();
        sys.refresh_all();
        let disks = Disks::new_with_refreshed_list();
        let networks = Networks::new_with_refreshed_list();
        Self {
            sys: Mutex::new(sys),
            disks: Mutex::new(disks),
            networks: Mutex::new(networks),
            rates: Mutex::new(RateTracker::new()),
            next_id: AtomicU64::new(1),
        }
    }

    fn rate(&self, handle: &CounterHandle, cumulative: u64) -> Result<f64, SourceError> {
        let mut rates = lock(&self.rates, "rate tracker")?;
        Ok(rates
            .observe(handle.id(), cumulative, Instant::now())
            .unwrap_or(0.0))
    }

    fn unknown(handle: &CounterHandle) -> SourceError {
        SourceError::UnknownInstance {
            family: handle.family().to_string(),
            instance: handle.instance().to_string(),
        }
    }

    fn read_processor(&self, handle: &CounterHandle) -> Result<f64, SourceError> {
        let mut sys = lock(&self.sys, "sysinfo")?;
        sys.refresh_cpu_all();
        if handle.instance() == TOTAL_INSTANCE {
            return Ok(sys.global_cpu_usage() as f64);
        }
        handle
            .index()
            .and_then(|i| sys.cpus().get(i as usize))
            .map(|c| c.cpu_usage() as f64)
            .ok_or_else(|| Self::unknown(handle))
    }

    fn read_disk(&self, handle: &CounterHandle) -> Result<f64, SourceError> {
        let stats = linux::read_diskstats()
            .ok_or_else(|| SourceError::Unsupported(handle.family().to_string()))?;
        let counters = stats
            .get(disk_device(handle.instance()))
            .ok_or_else(|| SourceError::NotReady(handle.instance().to_string()))?;
        match handle.metric() {
            metric::IDLE_TIME => {
                // io_ticks advance by up to 1000 ms per second of wall time
                let busy_ms_per_sec = self.rate(handle, counters.io_ticks_ms)?;
                Ok(100.0 - busy_ms_per_sec / 10.0)
            }
            metric::DISK_READ_BYTES => {
                self.rate(handle, counters.sectors_read.saturating_mul(linux::SECTOR_BYTES))
            }
            metric::DISK_WRITE_BYTES => self.rate(
                handle,
                counters.sectors_written.saturating_mul(linux::SECTOR_BYTES),
            ),
            other => Err(SourceError::Read(format!("unknown disk counter '{}'", other))),
        }
    }

    fn read_network(&self, handle: &CounterHandle) -> Result<f64, SourceError> {
        let total = {
            let mut networks = lock(&self.networks, "sysinfo networks")?;
            networks.refresh(true);
            let data = networks
                .list()
                .get(handle.instance())
                .ok_or_else(|| SourceError::NotReady(handle.instance().to_string()))?;
            match handle.metric() {
                metric::BYTES_RECEIVED => data.total_received(),
                metric::BYTES_SENT => data.total_transmitted(),
                other => {
                    return Err(SourceError::Read(format!(
                        "unknown network counter '{}'",
                        other
                    )));
                }
            }
        };
        self.rate(handle, total)
    }

    fn read_gpu(&self, handle: &CounterHandle) -> Result<f64, SourceError> {
        let card = handle
            .instance()
            .strip_suffix(GPU_3D_MARKER)
            .and_then(|rest| rest.strip_suffix('_'))
            .ok_or_else(|| Self::unknown(handle))?;
        linux::gpu_busy_percent(card)
            .ok_or_else(|| SourceError::Read(format!("{}: busy percent unavailable", card)))
    }

    /// (disk index, partition kernel name, partition id) for every partition of every disk.
    fn partition_layout(&self) -> Result<Vec<(u32, String, String)>, SourceError> {
        let disks = linux::whole_disks()
            .ok_or_else(|| SourceError::Unsupported("disk partition inventory".into()))?;
        let mut out = Vec::new();
        for (index, disk) in (0u32..).zip(disks.iter()) {
            for (name, number) in linux::partitions_of(disk) {
                out.push((index, name, partition_id(index, number)));
            }
        }
        Ok(out)
    }
}

fn counter_supported(family: CounterFamily, name: &str) -> bool {
    match family {
        CounterFamily::Processor => name == metric::PROCESSOR_TIME,
        CounterFamily::PhysicalDisk => matches!(
            name,
            metric::IDLE_TIME | metric::DISK_READ_BYTES | metric::DISK_WRITE_BYTES
        ),
        CounterFamily::NetworkInterface => {
            matches!(name, metric::BYTES_RECEIVED | metric::BYTES_SENT)
        }
        CounterFamily::GpuEngine => name == metric::UTILIZATION,
    }
}

impl CounterSource for SysinfoRepo {
    #[instrument(skip(self), fields(repo = "sysinfo", operation = "list_instances"))]
    fn list_instances(&self, family: CounterFamily) -> Result<Vec<String>, SourceError> {
        match family {
            CounterFamily::Processor => {
                let sys = lock(&self.sys, "sysinfo")?;
                let mut instances = vec![TOTAL_INSTANCE.to_string()];
                instances.extend((0..sys.cpus().len()).map(|i| i.to_string()));
                Ok(instances)
            }
            CounterFamily::PhysicalDisk => {
                let disks = linux::whole_disks()
                    .ok_or_else(|| SourceError::Unsupported(family.to_string()))?;
                Ok(disks
                    .iter()
                    .enumerate()
                    .map(|(i, d)| format!("{} {}", i, d))
                    .collect())
            }
            CounterFamily::NetworkInterface => {
                let mut networks = lock(&self.networks, "sysinfo networks")?;
                networks.refresh(true);
                let mut names: Vec<String> = networks.list().keys().cloned().collect();
                names.sort();
                Ok(names)
            }
            CounterFamily::GpuEngine => {
                let cards = linux::gpu_cards()
                    .ok_or_else(|| SourceError::Unsupported(family.to_string()))?;
                Ok(cards
                    .into_iter()
                    .map(|c| gpu_instance(&c))
                    .collect())
            }
        }
    }

    fn create_counter(
        &self,
        family: CounterFamily,
        metric: &str,
        instance: &str,
    ) -> Result<CounterHandle, SourceError> {
        if !counter_supported(family, metric) {
            return Err(SourceError::Unsupported(format!("{}\\{}", family, metric)));
        }
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        Ok(CounterHandle::new(id, family, metric, instance))
    }

    fn read_value(&self, handle: &CounterHandle) -> Result<f64, SourceError> {
        match handle.family() {
            CounterFamily::Processor => self.read_processor(handle),
            CounterFamily::PhysicalDisk => self.read_disk(handle),
            CounterFamily::NetworkInterface => self.read_network(handle),
            CounterFamily::GpuEngine => self.read_gpu(handle),
        }
    }
}

impl InventorySource for SysinfoRepo {
    #[instrument(skip(self), fields(repo = "sysinfo", operation = "processors"))]
    fn processors(&self) -> Result<Vec<ProcessorRecord>, SourceError> {
        let mut sys = lock(&self.sys, "sysinfo")?;
        sys.refresh_cpu_frequency();
        let current_mhz = sys.cpus().first().map(|c| c.frequency() as f64).unwrap_or(0.0);
        let max_mhz = linux::cpu_max_mhz().unwrap_or(current_mhz);
        let cores = System::physical_core_count().unwrap_or(0) as u32;
        let logical = sys.cpus().len() as u32;
        let sockets = linux::socket_count().unwrap_or(1).max(1);
        Ok((0..sockets)
            .map(|_| ProcessorRecord {
                current_mhz,
                max_mhz,
                cores: cores / sockets,
                logical: logical / sockets,
            })
            .collect())
    }

    #[instrument(skip(self), fields(repo = "sysinfo", operation = "disk_partitions"))]
    fn disk_partitions(&self) -> Result<Vec<PartitionRecord>, SourceError> {
        Ok(self
            .partition_layout()?
            .into_iter()
            .map(|(disk_index, _, device_id)| PartitionRecord {
                device_id,
                disk_index,
            })
            .collect())
    }

    #[instrument(skip(self), fields(repo = "sysinfo", operation = "logical_disk_links"))]
    fn logical_disk_links(&self) -> Result<Vec<LogicalDiskLink>, SourceError> {
        let layout = self.partition_layout()?;
        let mounts = linux::read_mounts()?;
        Ok(mount_links(&layout, &mounts))
    }

    #[instrument(skip(self), fields(repo = "sysinfo", operation = "disk_drives"))]
    fn disk_drives(&self) -> Result<Vec<DiskDriveRecord>, SourceError> {
        let disks = linux::whole_disks()
            .ok_or_else(|| SourceError::Unsupported("disk drive inventory".into()))?;
        Ok((0u32..)
            .zip(disks.iter())
            .map(|(index, disk)| DiskDriveRecord {
                index,
                media_type: match linux::rotational(disk) {
                    Some(false) => "Solid state drive (SSD)".into(),
                    Some(true) => "Fixed hard disk media".into(),
                    None => String::new(),
                },
                model: linux::disk_model(disk).unwrap_or_default(),
            })
            .collect())
    }

    #[instrument(skip(self), fields(repo = "sysinfo", operation = "network_adapters"))]
    fn network_adapters(&self) -> Result<Vec<AdapterRecord>, SourceError> {
        let mut networks = lock(&self.networks, "sysinfo networks")?;
        networks.refresh(true);
        let mut adapters: Vec<AdapterRecord> = networks
            .list()
            .iter()
            .map(|(name, data)| AdapterRecord {
                description: name.clone(),
                connection_id: String::new(),
                ip_enabled: !data.ip_networks().is_empty(),
                addresses: data
                    .ip_networks()
                    .iter()
                    .map(|n| n.addr.to_string())
                    .collect(),
            })
            .collect();
        adapters.sort_by(|a, b| a.description.cmp(&b.description));
        Ok(adapters)
    }

    fn volume_space(&self, volume: &str) -> Result<VolumeSpace, SourceError> {
        let mut disks = lock(&self.disks, "sysinfo disks")?;
        disks.refresh(true);
        disks
            .list()
            .iter()
            .find(|d| d.mount_point() == Path::new(volume))
            .map(|d| VolumeSpace {
                free: d.available_space(),
                total: d.total_space(),
            })
            .ok_or_else(|| SourceError::NotReady(volume.to_string()))
    }
}

impl MemorySource for SysinfoRepo {
    fn query(&self) -> Result<MemoryStatus, SourceError> {
        let mut sys = lock(&self.sys, "sysinfo")?;
        sys.refresh_memory();
        Ok(MemoryStatus {
            total_physical: sys.total_memory(),
            available_physical: sys.available_memory(),
        })
    }
}

impl ProcessSource for SysinfoRepo {
    fn totals(&self) -> Result<ProcessTotals, SourceError> {
        let mut sys = lock(&self.sys, "sysinfo")?;
        sys.refresh_processes(ProcessesToUpdate::All, true);
        let processes = sys.processes().len() as u64;
        let threads = sys
            .processes()
            .values()
            .map(|p| 1 + p.tasks().map(|t| t.len()).unwrap_or(0) as u64)
            .sum();
        Ok(ProcessTotals {
            processes,
            threads,
            handles: linux::open_handle_count().unwrap_or(0),
        })
    }

    fn uptime_ms(&self) -> Result<u64, SourceError> {
        Ok(System::uptime().saturating_mul(1000))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disk_device_strips_index() {
        assert_eq!(disk_device("0 sda"), "sda");
        assert_eq!(disk_device("  12 nvme0n1"), "nvme0n1");
        assert_eq!(disk_device("sdb"), "sdb");
    }

    #[test]
    fn partition_ids_match_association_form() {
        assert_eq!(partition_id(0, 1), "Disk #0, Partition #1");
    }

    #[test]
    fn gpu_instances_round_trip_to_card_names() {
        let instance = gpu_instance("card1");
        assert!(crate::discovery::is_trackable(CounterFamily::GpuEngine, &instance));
        let card = instance
            .strip_suffix(GPU_3D_MARKER)
            .and_then(|rest| rest.strip_suffix('_'));
        assert_eq!(card, Some("card1"));
    }

    fn sda_layout() -> Vec<(u32, String, String)> {
        vec![
            (0, "sda1".to_string(), partition_id(0, 1)),
            (0, "sda2".to_string(), partition_id(0, 2)),
        ]
    }

    #[test]
    fn partition_mounted_twice_yields_one_volume() {
        let mounts = "\
/dev/sda2 /var/snap ext4 rw 0 0
/dev/sda2 / ext4 rw 0 0
/dev/sda1 /boot/efi vfat rw 0 0
/dev/sda2 /home/user/bind ext4 rw 0 0
tmpfs /run tmpfs rw 0 0
";
        let links = mount_links(&sda_layout(), mounts);
        assert_eq!(links.len(), 2);
        assert_eq!(links[0].dependent, "LogicalDisk.DeviceID=\"/\"");
        assert_eq!(links[1].dependent, "LogicalDisk.DeviceID=\"/boot/efi\"");

        let partitions: Vec<PartitionRecord> = sda_layout()
            .into_iter()
            .map(|(disk_index, _, device_id)| PartitionRecord {
                device_id,
                disk_index,
            })
            .collect();
        let volumes = crate::correlate::resolve_disk_volumes(&partitions, &links);
        assert_eq!(volumes[&0], vec!["/".to_string(), "/boot/efi".to_string()]);
    }

    #[test]
    fn unreadable_mount_table_is_an_io_error() {
        let dir = std::env::temp_dir().join("perfsampler-no-such-dir");
        let read = || -> Result<String, SourceError> {
            Ok(std::fs::read_to_string(dir.join("mounts"))?)
        };
        let err = read().unwrap_err();
        assert!(matches!(err, SourceError::Io(_)));
        assert!(!err.is_not_ready());
    }

    #[test]
    fn unknown_devices_and_quoted_mount_points_are_skipped() {
        let mounts = "/dev/sdb1 /mnt/usb ext4 rw 0 0\n/dev/sda1 /mnt/a\"b ext4 rw 0 0\n";
        assert!(mount_links(&sda_layout(), mounts).is_empty());
    }

    #[test]
    fn counters_outside_their_family_are_rejected() {
        let repo = SysinfoRepo::new();
        let err = repo
            .create_counter(CounterFamily::PhysicalDisk, metric::BYTES_SENT, "0 sda")
            .unwrap_err();
        assert!(matches!(err, SourceError::Unsupported(_)));
        let handle = repo
            .create_counter(CounterFamily::Processor, metric::PROCESSOR_TIME, "_Total")
            .unwrap();
        assert_eq!(handle.instance(), "_Total");
        assert_eq!(handle.index(), None);
    }

    #[test]
    fn processor_total_reads_a_percentage() {
        let repo = SysinfoRepo::new();
        let handle = repo
            .create_counter(CounterFamily::Processor, metric::PROCESSOR_TIME, "_Total")
            .unwrap();
        let v = repo.read_value(&handle).unwrap();
        assert!(v.is_finite());
    }
}
