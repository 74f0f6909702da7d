// Static entity topology, discovered and correlated once at startup

use std::collections::BTreeSet;

use tracing::{debug, info, instrument};

use crate::correlate::{
    DiskVolumeMap, DriveMediaResolver, IdentityResolver, MediaType, SubstringAddressResolver,
    disk_volume_map, parse_leading_index,
};
use crate::discovery::{TOTAL_INSTANCE, discover};
use crate::models::{CounterFamily, CounterHandle, metric};
use crate::reader::SampleReader;
use crate::sources::{CounterSource, HostSources};

/// One physical disk.
#[derive(Debug, Clone)]
pub struct DiskEntity {
    pub index: u32,
    pub instance: String,
    /// Volume letters (or mount points) on this disk; may be empty.
    pub volumes: Vec<String>,
    pub idle: CounterHandle,
    pub read_bps: CounterHandle,
    pub write_bps: CounterHandle,
    pub media_type: MediaType,
}

/// One network adapter.
#[derive(Debug, Clone)]
pub struct NicEntity {
    pub instance: String,
    pub rx: CounterHandle,
    pub tx: CounterHandle,
    pub ipv4: Option<String>,
}

/// One GPU 3D engine instance.
#[derive(Debug, Clone)]
pub struct GpuEngineEntity {
    pub instance: String,
    pub utilization: CounterHandle,
}

/// Every tracked entity with its counters already created and warmed up.
/// Never changes after construction; the sampler only borrows it.
#[derive(Debug, Clone, Default)]
pub struct Topology {
    pub cpu: Option<CounterHandle>,
    /// Ordered by disk index.
    pub disks: Vec<DiskEntity>,
    pub nics: Vec<NicEntity>,
    pub gpu_engines: Vec<GpuEngineEntity>,
}

impl Topology {
    /// Discover entities from the counter subsystem and resolve their identity from inventory.
    #[instrument(skip(sources))]
    pub fn discover(sources: &HostSources) -> Self {
        let inventory = sources.inventory.as_ref();
        let volumes = disk_volume_map(inventory);
        let media = DriveMediaResolver::from_inventory(inventory);
        let addresses = SubstringAddressResolver::from_inventory(inventory);
        let topology =
            Self::discover_with(sources.counters.as_ref(), &volumes, &media, &addresses);
        info!(
            cpu = topology.cpu.is_some(),
            disks = topology.disks.len(),
            nics = topology.nics.len(),
            gpu_engines = topology.gpu_engines.len(),
            "topology discovered"
        );
        topology
    }

    /// Discovery with explicit correlation inputs, so stricter resolvers can be swapped in.
    pub fn discover_with(
        counters: &dyn CounterSource,
        volumes: &DiskVolumeMap,
        media: &dyn IdentityResolver<u32, Identity = MediaType>,
        addresses: &dyn IdentityResolver<str, Identity = String>,
    ) -> Self {
        let reader = SampleReader::new(counters);
        let create = |family: CounterFamily, metric: &str, instance: &str| {
            match counters.create_counter(family, metric, instance) {
                Ok(handle) => {
                    reader.warm_up(&handle);
                    Some(handle)
                }
                Err(e) => {
                    debug!(%family, metric, instance, error = %e, "counter creation failed");
                    None
                }
            }
        };

        let cpu = create(
            CounterFamily::Processor,
            metric::PROCESSOR_TIME,
            TOTAL_INSTANCE,
        );

        let mut seen = BTreeSet::new();
        let mut disks = Vec::new();
        for instance in discover(counters, CounterFamily::PhysicalDisk) {
            let Some(index) = parse_leading_index(&instance) else {
                debug!(instance, "disk instance without index; not tracked");
                continue;
            };
            if !seen.insert(index) {
                debug!(instance, index, "duplicate disk index; keeping the first instance");
                continue;
            }
            let family = CounterFamily::PhysicalDisk;
            let (Some(idle), Some(read_bps), Some(write_bps)) = (
                create(family, metric::IDLE_TIME, &instance),
                create(family, metric::DISK_READ_BYTES, &instance),
                create(family, metric::DISK_WRITE_BYTES, &instance),
            ) else {
                continue;
            };
            disks.push(DiskEntity {
                index,
                volumes: volumes.get(&index).cloned().unwrap_or_default(),
                media_type: media.resolve(&index).unwrap_or_default(),
                instance,
                idle,
                read_bps,
                write_bps,
            });
        }
        disks.sort_by_key(|d| d.index);

        let mut nics = Vec::new();
        for instance in discover(counters, CounterFamily::NetworkInterface) {
            let family = CounterFamily::NetworkInterface;
            let (Some(rx), Some(tx)) = (
                create(family, metric::BYTES_RECEIVED, &instance),
                create(family, metric::BYTES_SENT, &instance),
            ) else {
                continue;
            };
            let ipv4 = addresses.resolve(instance.as_str());
            nics.push(NicEntity {
                instance,
                rx,
                tx,
                ipv4,
            });
        }

        let gpu_engines = discover(counters, CounterFamily::GpuEngine)
            .into_iter()
            .filter_map(|instance| {
                let utilization =
                    create(CounterFamily::GpuEngine, metric::UTILIZATION, &instance)?;
                Some(GpuEngineEntity {
                    instance,
                    utilization,
                })
            })
            .collect();

        Self {
            cpu,
            disks,
            nics,
            gpu_engines,
        }
    }
}
