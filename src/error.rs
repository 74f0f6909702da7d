// Capability errors shared by every data source

use thiserror::Error;

/// Failure reported by a counter, inventory, memory or process source.
///
/// The sampler never propagates these out of a tick; each call site decides
/// whether a failure renders as zero, a status line, or an empty list.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The counter family or inventory class does not exist on this host.
    #[error("{0} is not supported on this host")]
    Unsupported(String),

    /// The entity exists but cannot be queried right now (e.g. an offline volume).
    #[error("{0} is not ready")]
    NotReady(String),

    #[error("unknown {family} instance '{instance}'")]
    UnknownInstance { family: String, instance: String },

    #[error("counter read failed: {0}")]
    Read(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0} lock poisoned")]
    Poisoned(&'static str),
}

impl SourceError {
    pub fn is_not_ready(&self) -> bool {
        matches!(self, SourceError::NotReady(_))
    }
}
