// Linux-specific helpers: /proc/diskstats, /sys/block, /proc/mounts, cpufreq, DRM busy%.

use std::collections::HashMap;

/// Cumulative per-device counters from /proc/diskstats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(super) struct DiskCounters {
    pub sectors_read: u64,
    pub sectors_written: u64,
    /// Milliseconds spent doing I/O.
    pub io_ticks_ms: u64,
}

/// Bytes per diskstats sector, independent of the device's real sector size.
pub(super) const SECTOR_BYTES: u64 = 512;

/// Parse /proc/diskstats content into device -> counters. Malformed lines are skipped.
pub(super) fn parse_diskstats(content: &str) -> HashMap<String, DiskCounters> {
    let mut out = HashMap::new();
    for line in content.lines() {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 14 {
            continue;
        }
        let field = |i: usize| parts[i].parse::<u64>().unwrap_or(0);
        out.insert(
            parts[2].to_string(),
            DiskCounters {
                sectors_read: field(5),
                sectors_written: field(9),
                io_ticks_ms: field(12),
            },
        );
    }
    out
}

pub(super) fn read_diskstats() -> Option<HashMap<String, DiskCounters>> {
    #[cfg(target_os = "linux")]
    {
        let content = std::fs::read_to_string("/proc/diskstats").ok()?;
        Some(parse_diskstats(&content))
    }
    #[cfg(not(target_os = "linux"))]
    None
}

/// Loop, ram and zram devices are not physical disks.
pub(super) fn is_virtual_device(name: &str) -> bool {
    name.starts_with("loop") || name.starts_with("ram") || name.starts_with("zram")
}

/// Whole block devices (no partitions), sorted by name. Position in the list is the disk index.
pub(super) fn whole_disks() -> Option<Vec<String>> {
    #[cfg(target_os = "linux")]
    {
        let stats = read_diskstats()?;
        let mut disks: Vec<String> = stats
            .into_keys()
            .filter(|name| !is_virtual_device(name))
            .filter(|name| std::path::Path::new("/sys/block").join(name).exists())
            .collect();
        disks.sort();
        Some(disks)
    }
    #[cfg(not(target_os = "linux"))]
    None
}

/// Partitions of a whole disk as (kernel name, partition number), sorted by number.
pub(super) fn partitions_of(disk: &str) -> Vec<(String, u32)> {
    let mut parts = Vec::new();
    let dir = std::path::Path::new("/sys/block").join(disk);
    if let Ok(entries) = std::fs::read_dir(&dir) {
        for entry in entries.flatten() {
            let number = std::fs::read_to_string(entry.path().join("partition"))
                .ok()
                .and_then(|s| s.trim().parse::<u32>().ok());
            if let Some(number) = number {
                parts.push((entry.file_name().to_string_lossy().into_owned(), number));
            }
        }
    }
    parts.sort_by_key(|(_, n)| *n);
    parts
}

/// Undo the octal escaping /proc/mounts applies to spaces, tabs and backslashes.
pub(super) fn unescape_mount_field(field: &str) -> String {
    let bytes = field.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        let code = (bytes[i] == b'\\' && i + 3 < bytes.len())
            .then(|| &bytes[i + 1..i + 4])
            .filter(|digits| digits.iter().all(|b| (b'0'..=b'7').contains(b)))
            .map(|d| u32::from(d[0] - b'0') * 64 + u32::from(d[1] - b'0') * 8 + u32::from(d[2] - b'0'))
            .and_then(|code| u8::try_from(code).ok());
        if let Some(code) = code {
            out.push(code);
            i += 4;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// (source device, mount point) pairs from /proc/mounts content.
pub(super) fn parse_mounts(content: &str) -> Vec<(String, String)> {
    content
        .lines()
        .filter_map(|line| {
            let mut fields = line.split_whitespace();
            let source = fields.next()?;
            let target = fields.next()?;
            Some((unescape_mount_field(source), unescape_mount_field(target)))
        })
        .collect()
}

pub(super) fn read_mounts() -> std::io::Result<String> {
    std::fs::read_to_string("/proc/mounts")
}

/// `Some(true)` for spinning media, from /sys/block/<disk>/queue/rotational.
pub(super) fn rotational(disk: &str) -> Option<bool> {
    #[cfg(target_os = "linux")]
    {
        let v = std::fs::read_to_string(format!("/sys/block/{}/queue/rotational", disk)).ok()?;
        match v.trim() {
            "0" => Some(false),
            "1" => Some(true),
            _ => None,
        }
    }
    #[cfg(not(target_os = "linux"))]
    {
        let _ = disk;
        None
    }
}

pub(super) fn disk_model(disk: &str) -> Option<String> {
    #[cfg(target_os = "linux")]
    {
        let v = std::fs::read_to_string(format!("/sys/block/{}/device/model", disk)).ok()?;
        let v = v.trim();
        if v.is_empty() {
            return None;
        }
        Some(v.to_string())
    }
    #[cfg(not(target_os = "linux"))]
    {
        let _ = disk;
        None
    }
}

/// Maximum clock of cpu0 in MHz from cpufreq (reported in kHz).
pub(super) fn cpu_max_mhz() -> Option<f64> {
    #[cfg(target_os = "linux")]
    {
        let v = std::fs::read_to_string("/sys/devices/system/cpu/cpu0/cpufreq/cpuinfo_max_freq")
            .ok()?;
        let khz = v.trim().parse::<u64>().ok()?;
        Some(khz as f64 / 1000.0)
    }
    #[cfg(not(target_os = "linux"))]
    None
}

/// Number of distinct "physical id" entries in /proc/cpuinfo content; `None` when absent.
pub(super) fn count_sockets(cpuinfo: &str) -> Option<u32> {
    let ids: std::collections::BTreeSet<&str> = cpuinfo
        .lines()
        .filter(|l| l.starts_with("physical id"))
        .filter_map(|l| l.split(':').nth(1).map(str::trim))
        .collect();
    if ids.is_empty() {
        None
    } else {
        Some(ids.len() as u32)
    }
}

pub(super) fn socket_count() -> Option<u32> {
    #[cfg(target_os = "linux")]
    {
        let content = std::fs::read_to_string("/proc/cpuinfo").ok()?;
        count_sockets(&content)
    }
    #[cfg(not(target_os = "linux"))]
    None
}

/// DRM cards that report a busy percentage (amdgpu and some others), e.g. "card0".
/// `None` when the DRM class is absent.
pub(super) fn gpu_cards() -> Option<Vec<String>> {
    #[cfg(target_os = "linux")]
    {
        let entries = std::fs::read_dir("/sys/class/drm").ok()?;
        let mut cards: Vec<String> = entries
            .flatten()
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .filter(|name| name.starts_with("card") && !name.contains('-'))
            .filter(|name| {
                std::path::Path::new("/sys/class/drm")
                    .join(name)
                    .join("device/gpu_busy_percent")
                    .exists()
            })
            .collect();
        cards.sort();
        Some(cards)
    }
    #[cfg(not(target_os = "linux"))]
    None
}

pub(super) fn gpu_busy_percent(card: &str) -> Option<f64> {
    #[cfg(target_os = "linux")]
    {
        let v = std::fs::read_to_string(format!("/sys/class/drm/{}/device/gpu_busy_percent", card))
            .ok()?;
        v.trim().parse::<f64>().ok()
    }
    #[cfg(not(target_os = "linux"))]
    {
        let _ = card;
        None
    }
}

/// Open file descriptors across all readable processes; the closest Linux analogue of a
/// system handle count.
pub(super) fn open_handle_count() -> Option<u64> {
    #[cfg(target_os = "linux")]
    {
        let entries = std::fs::read_dir("/proc").ok()?;
        let total = entries
            .flatten()
            .filter(|e| e.file_name().to_string_lossy().bytes().all(|b| b.is_ascii_digit()))
            .filter_map(|e| std::fs::read_dir(e.path().join("fd")).ok())
            .map(|fds| fds.count() as u64)
            .sum();
        Some(total)
    }
    #[cfg(not(target_os = "linux"))]
    None
}
