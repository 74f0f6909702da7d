// Domain models: counter handles, inventory records, host status and output lines

mod counter;
mod line;
mod network;
mod storage;
mod system;

pub use counter::{CounterFamily, CounterHandle, metric};
pub use line::{MetricLine, MetricTag};
pub use network::AdapterRecord;
pub use storage::{DiskDriveRecord, LogicalDiskLink, PartitionRecord, VolumeSpace};
pub use system::{MemoryStatus, ProcessTotals, ProcessorRecord};
