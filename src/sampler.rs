// One sampling tick: read every tracked entity and render metric lines

use chrono::NaiveDateTime;
use tracing::debug;

use crate::error::SourceError;
use crate::format::{fmt_bytes, fmt_rate, fmt_uptime};
use crate::models::{MetricLine, MetricTag, ProcessTotals, ProcessorRecord, VolumeSpace};
use crate::reader::{Sample, SampleReader, active_from_idle, clamp_percent};
use crate::sources::HostSources;
use crate::topology::{DiskEntity, Topology};

/// Placeholder for identity that could not be resolved.
pub const UNRESOLVED: &str = "-";

/// Per-disk reading for one tick.
struct DiskReading {
    active: f64,
    read: f64,
    write: f64,
}

/// Lifecycle of the sampling driver. The loop ends on shutdown or after one tick in run-once mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamplerState {
    Idle,
    Discovering,
    WarmingUp,
    Sampling,
    Emitting,
}

pub struct Sampler {
    sources: HostSources,
}

impl Sampler {
    pub fn new(sources: HostSources) -> Self {
        Self { sources }
    }

    pub fn sources(&self) -> &HostSources {
        &self.sources
    }

    /// Read all entities once and render one line per metric per entity plus the
    /// aggregate lines. No entity failure aborts the tick.
    pub fn sample_tick(&self, topology: &Topology, timestamp: NaiveDateTime) -> Vec<MetricLine> {
        let reader = SampleReader::new(self.sources.counters.as_ref());
        let mut lines = Vec::new();
        let mut emit = |tag: MetricTag, fields: String| {
            lines.push(MetricLine::new(timestamp, tag, fields));
        };

        self.cpu_lines(&reader, topology, &mut emit);
        self.ram_line(&mut emit);
        self.disk_lines(&reader, topology, &mut emit);
        net_lines(&reader, topology, &mut emit);
        gpu_line(&reader, topology, &mut emit);

        lines
    }

    fn cpu_lines(
        &self,
        reader: &SampleReader<'_>,
        topology: &Topology,
        emit: &mut impl FnMut(MetricTag, String),
    ) {
        let usage = topology
            .cpu
            .as_ref()
            .map(|h| reader.read_percent(h).or_zero())
            .unwrap_or(0.0);

        let processors = self.sources.inventory.processors().unwrap_or_else(|e| {
            debug!(error = %e, operation = "processors", "processor lookup failed");
            Vec::new()
        });
        let first = processors.first().copied().unwrap_or_default();
        let ProcessorRecord {
            current_mhz,
            max_mhz,
            ..
        } = first;
        let cores: u32 = processors.iter().map(|p| p.cores).sum();
        let logical: u32 = processors.iter().map(|p| p.logical).sum();
        emit(
            MetricTag::Cpu,
            format!(
                "usage={:.1}% speed={:.2}GHz base={:.2}GHz sockets={} cores={} logical={}",
                usage,
                current_mhz / 1000.0,
                max_mhz / 1000.0,
                processors.len(),
                cores,
                logical
            ),
        );

        let totals = self.sources.processes.totals().unwrap_or_else(|e| {
            debug!(error = %e, operation = "process_totals", "process totals failed");
            ProcessTotals::default()
        });
        let uptime_ms = self.sources.processes.uptime_ms().unwrap_or_else(|e| {
            debug!(error = %e, operation = "uptime", "uptime failed");
            0
        });
        emit(
            MetricTag::CpuAll,
            format!(
                "processes={} threads={} handles={} uptime={}",
                totals.processes,
                totals.threads,
                totals.handles,
                fmt_uptime(uptime_ms)
            ),
        );
    }

    fn ram_line(&self, emit: &mut impl FnMut(MetricTag, String)) {
        let mem = self.sources.memory.query().unwrap_or_else(|e| {
            debug!(error = %e, operation = "memory_query", "memory status failed");
            Default::default()
        });
        emit(
            MetricTag::Ram,
            format!(
                "used={} total={} ({:.1}%)",
                fmt_bytes(mem.used()),
                fmt_bytes(mem.total_physical),
                mem.used_percent()
            ),
        );
    }

    fn disk_lines(
        &self,
        reader: &SampleReader<'_>,
        topology: &Topology,
        emit: &mut impl FnMut(MetricTag, String),
    ) {
        let mut total_active = 0.0;
        let mut total_read = 0.0;
        let mut total_write = 0.0;
        let mut healthy = 0usize;

        for disk in &topology.disks {
            let vols = if disk.volumes.is_empty() {
                UNRESOLVED.to_string()
            } else {
                disk.volumes.join(",")
            };
            let Some(r) = read_disk(reader, disk) else {
                emit(
                    MetricTag::DiskPhys,
                    format!(
                        "disk={} vols={} status=error type={}",
                        disk.index, vols, disk.media_type
                    ),
                );
                continue;
            };
            healthy += 1;
            total_active += r.active;
            total_read += r.read;
            total_write += r.write;

            let spaces: Vec<(&str, Result<VolumeSpace, SourceError>)> = disk
                .volumes
                .iter()
                .map(|v| (v.as_str(), self.sources.inventory.volume_space(v)))
                .collect();
            let (sum_free, sum_total) = spaces
                .iter()
                .filter_map(|(_, s)| s.as_ref().ok())
                .fold((0u64, 0u64), |(f, t), s| {
                    (f.saturating_add(s.free), t.saturating_add(s.total))
                });

            emit(
                MetricTag::DiskPhys,
                format!(
                    "disk={} vols={} active={:.1}% read={} write={} free={}/{} type={}",
                    disk.index,
                    vols,
                    r.active,
                    fmt_rate(r.read),
                    fmt_rate(r.write),
                    fmt_bytes(sum_free),
                    fmt_bytes(sum_total),
                    disk.media_type
                ),
            );

            for (volume, space) in spaces {
                match space {
                    Ok(s) => emit(
                        MetricTag::Disk,
                        format!(
                            "drive={} active={:.1}% read={} write={} free={}/{}",
                            volume,
                            r.active,
                            fmt_rate(r.read),
                            fmt_rate(r.write),
                            fmt_bytes(s.free),
                            fmt_bytes(s.total)
                        ),
                    ),
                    Err(e) => {
                        let status = if e.is_not_ready() { "not_ready" } else { "error" };
                        debug!(volume, error = %e, "volume space unavailable");
                        emit(
                            MetricTag::Disk,
                            format!("drive={} status={}", volume, status),
                        );
                    }
                }
            }
        }

        if healthy > 0 {
            emit(
                MetricTag::DiskAll,
                format!(
                    "active={:.1}% read={} write={}",
                    total_active / healthy as f64,
                    fmt_rate(total_read),
                    fmt_rate(total_write)
                ),
            );
        }
    }
}

/// All three disk counters, or `None` when any of them failed this tick.
fn read_disk(reader: &SampleReader<'_>, disk: &DiskEntity) -> Option<DiskReading> {
    let idle = reader.read_percent(&disk.idle).value()?;
    let read = reader.read_rate(&disk.read_bps).value()?;
    let write = reader.read_rate(&disk.write_bps).value()?;
    Some(DiskReading {
        active: active_from_idle(idle),
        read,
        write,
    })
}

fn net_lines(
    reader: &SampleReader<'_>,
    topology: &Topology,
    emit: &mut impl FnMut(MetricTag, String),
) {
    if topology.nics.is_empty() {
        emit(MetricTag::Net, "none".to_string());
        return;
    }
    let mut total_up = 0.0;
    let mut total_down = 0.0;
    for nic in &topology.nics {
        let ip = nic.ipv4.as_deref().unwrap_or(UNRESOLVED);
        match (reader.read_rate(&nic.rx), reader.read_rate(&nic.tx)) {
            (Sample::Ok(rx), Sample::Ok(tx)) => {
                total_down += rx;
                total_up += tx;
                emit(
                    MetricTag::Net,
                    format!(
                        "{} up={} down={} ip={}",
                        nic.instance,
                        fmt_rate(tx),
                        fmt_rate(rx),
                        ip
                    ),
                );
            }
            _ => emit(
                MetricTag::Net,
                format!("{} status=error ip={}", nic.instance, ip),
            ),
        }
    }
    emit(
        MetricTag::NetAll,
        format!("up={} down={}", fmt_rate(total_up), fmt_rate(total_down)),
    );
}

/// Sum of all 3D engine utilizations (engines run in parallel), clamped to `[0, 100]`.
pub fn gpu_usage(engine_utilizations: impl IntoIterator<Item = f64>) -> f64 {
    clamp_percent(engine_utilizations.into_iter().sum())
}

fn gpu_line(
    reader: &SampleReader<'_>,
    topology: &Topology,
    emit: &mut impl FnMut(MetricTag, String),
) {
    let usage = gpu_usage(
        topology
            .gpu_engines
            .iter()
            .map(|g| reader.read_or_zero(&g.utilization)),
    );
    emit(MetricTag::Gpu, format!("usage={:.1}%", usage));
}
