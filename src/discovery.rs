// Entity discovery: per-family instance lists from the counter subsystem

use tracing::{debug, info, instrument};

use crate::error::SourceError;
use crate::models::CounterFamily;
use crate::sources::CounterSource;

/// Name of the aggregate instance most families expose.
pub const TOTAL_INSTANCE: &str = "_Total";

/// Marker in GPU engine instance names for 3D engines. Copy and video engines are ignored.
pub const GPU_3D_MARKER: &str = "engtype_3d";

/// Whether `instance` is tracked per entity for `family`.
pub fn is_trackable(family: CounterFamily, instance: &str) -> bool {
    if instance.eq_ignore_ascii_case(TOTAL_INSTANCE) {
        return false;
    }
    match family {
        CounterFamily::GpuEngine => instance.to_lowercase().contains(GPU_3D_MARKER),
        _ => true,
    }
}

/// Instances of `family` worth tracking individually. An unsupported family, or any
/// other listing failure, yields an empty list.
#[instrument(skip(source, family), fields(family = %family))]
pub fn discover(source: &dyn CounterSource, family: CounterFamily) -> Vec<String> {
    let instances = match source.list_instances(family) {
        Ok(i) => i,
        Err(SourceError::Unsupported(what)) => {
            info!(%what, "counter family unsupported; reporting none");
            return Vec::new();
        }
        Err(e) => {
            info!(error = %e, "instance listing failed; reporting none");
            return Vec::new();
        }
    };
    let tracked: Vec<String> = instances
        .into_iter()
        .filter(|i| is_trackable(family, i))
        .collect();
    debug!(count = tracked.len(), "instances discovered");
    tracked
}
