// Identity correlation: attach drive letters, media type and IPv4 addresses to counter instances.
//
// Counter instance names and inventory records share no common key, so every join here
// is either relational (partition ids inside quoted object paths) or a best-effort
// string match.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use tracing::{debug, warn};

use crate::models::{AdapterRecord, DiskDriveRecord, LogicalDiskLink, PartitionRecord};
use crate::sources::InventorySource;

/// Disk index -> volume letters (deduplicated, first-seen order).
pub type DiskVolumeMap = BTreeMap<u32, Vec<String>>;

/// Pluggable identity lookup keyed by a raw name or index.
pub trait IdentityResolver<K: ?Sized>: Send + Sync {
    type Identity;

    fn resolve(&self, raw: &K) -> Option<Self::Identity>;
}

/// Contents of the first `"..."` pair in an object path, e.g. `C:` from `...DeviceID="C:"`.
pub fn extract_quoted(path: &str) -> Option<&str> {
    let start = path.find('"')? + 1;
    let len = path[start..].find('"')?;
    let value = &path[start..start + len];
    (!value.is_empty()).then_some(value)
}

/// Leading run of ASCII digits after optional whitespace: `"  12 D:"` -> `Some(12)`.
/// `"_Total"` and other names without leading digits are not trackable.
pub fn parse_leading_index(instance: &str) -> Option<u32> {
    let trimmed = instance.trim_start();
    let end = trimmed
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(trimmed.len());
    if end == 0 {
        return None;
    }
    trimmed[..end].parse().ok()
}

/// Join partition -> disk and volume -> partition into disk -> volumes.
///
/// Partition ids compare case-insensitively; a duplicated partition id keeps its last
/// disk. A volume claimed by two disks stays with the last disk that claimed it and the
/// conflict is logged.
pub fn resolve_disk_volumes(partitions: &[PartitionRecord], links: &[LogicalDiskLink]) -> DiskVolumeMap {
    let part_to_disk: HashMap<String, u32> = partitions
        .iter()
        .filter(|p| !p.device_id.is_empty())
        .map(|p| (p.device_id.to_lowercase(), p.disk_index))
        .collect();

    let mut map = DiskVolumeMap::new();
    let mut owner: HashMap<String, u32> = HashMap::new();

    for link in links {
        let (Some(part_id), Some(volume)) =
            (extract_quoted(&link.antecedent), extract_quoted(&link.dependent))
        else {
            continue;
        };
        let Some(&disk_index) = part_to_disk.get(&part_id.to_lowercase()) else {
            debug!(partition = part_id, volume, "volume link to unknown partition");
            continue;
        };

        if let Some(previous) = owner.insert(volume.to_string(), disk_index)
            && previous != disk_index
        {
            warn!(
                volume,
                previous_disk = previous,
                disk = disk_index,
                "volume mapped to two disks; keeping the later mapping"
            );
            if let Some(list) = map.get_mut(&previous) {
                list.retain(|v| v != volume);
            }
        }

        let list = map.entry(disk_index).or_default();
        if !list.iter().any(|v| v == volume) {
            list.push(volume.to_string());
        }
    }

    map.retain(|_, v| !v.is_empty());
    map
}

/// Query both association relations and build the disk -> volumes map.
/// A failed lookup yields an empty map; disks are still reported, without volume labels.
pub fn disk_volume_map(inventory: &dyn InventorySource) -> DiskVolumeMap {
    let partitions = match inventory.disk_partitions() {
        Ok(p) => p,
        Err(e) => {
            warn!(error = %e, operation = "disk_partitions", "partition lookup failed");
            return DiskVolumeMap::new();
        }
    };
    let links = match inventory.logical_disk_links() {
        Ok(l) => l,
        Err(e) => {
            warn!(error = %e, operation = "logical_disk_links", "volume link lookup failed");
            return DiskVolumeMap::new();
        }
    };
    resolve_disk_volumes(&partitions, &links)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MediaType {
    Ssd,
    Hdd,
    #[default]
    Unknown,
}

impl MediaType {
    /// Priority: media type mentions "ssd", then model mentions "nvme"/"ssd",
    /// then media type mentions "fixed". Model names cover buses that misreport media type.
    pub fn classify(media_type: &str, model: &str) -> Self {
        let media = media_type.to_lowercase();
        let model = model.to_lowercase();
        if media.contains("ssd") || model.contains("nvme") || model.contains("ssd") {
            MediaType::Ssd
        } else if media.contains("fixed") {
            MediaType::Hdd
        } else {
            MediaType::Unknown
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::Ssd => "SSD",
            MediaType::Hdd => "HDD",
            MediaType::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Media type by physical disk index.
#[derive(Debug, Clone, Default)]
pub struct DriveMediaResolver {
    by_index: BTreeMap<u32, MediaType>,
}

impl DriveMediaResolver {
    /// First record per index wins.
    pub fn new(drives: &[DiskDriveRecord]) -> Self {
        let mut by_index = BTreeMap::new();
        for d in drives {
            by_index
                .entry(d.index)
                .or_insert_with(|| MediaType::classify(&d.media_type, &d.model));
        }
        Self { by_index }
    }

    pub fn from_inventory(inventory: &dyn InventorySource) -> Self {
        match inventory.disk_drives() {
            Ok(drives) => Self::new(&drives),
            Err(e) => {
                warn!(error = %e, operation = "disk_drives", "disk drive lookup failed");
                Self::default()
            }
        }
    }
}

impl IdentityResolver<u32> for DriveMediaResolver {
    type Identity = MediaType;

    fn resolve(&self, disk_index: &u32) -> Option<MediaType> {
        self.by_index.get(disk_index).copied()
    }
}

/// Lowercase and apply the counter subsystem's instance-name escaping so inventory names
/// and counter names compare in the same alphabet.
fn normalize_adapter_name(name: &str) -> String {
    name.to_lowercase()
        .chars()
        .map(|c| match c {
            '(' => '[',
            ')' => ']',
            '#' | '/' | '\\' => '_',
            other => other,
        })
        .collect()
}

/// IPv4 by counter instance name, matched by case-insensitive substring containment
/// against adapter descriptions and connection names. The first matching entry in
/// inventory order wins.
#[derive(Debug, Clone, Default)]
pub struct SubstringAddressResolver {
    entries: Vec<(String, String)>,
}

impl SubstringAddressResolver {
    pub fn new(adapters: &[AdapterRecord]) -> Self {
        let mut entries = Vec::new();
        for adapter in adapters.iter().filter(|a| a.ip_enabled) {
            let Some(ipv4) = adapter.addresses.iter().find(|a| !a.contains(':')) else {
                continue;
            };
            for name in [&adapter.description, &adapter.connection_id] {
                if !name.trim().is_empty() {
                    entries.push((normalize_adapter_name(name.trim()), ipv4.clone()));
                }
            }
        }
        Self { entries }
    }

    pub fn from_inventory(inventory: &dyn InventorySource) -> Self {
        match inventory.network_adapters() {
            Ok(adapters) => Self::new(&adapters),
            Err(e) => {
                warn!(error = %e, operation = "network_adapters", "adapter lookup failed");
                Self::default()
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl IdentityResolver<str> for SubstringAddressResolver {
    type Identity = String;

    fn resolve(&self, instance: &str) -> Option<String> {
        let needle = normalize_adapter_name(instance.trim());
        if needle.is_empty() {
            return None;
        }
        self.entries
            .iter()
            .find(|(key, _)| needle.contains(key.as_str()) || key.contains(needle.as_str()))
            .map(|(_, ip)| ip.clone())
    }
}
