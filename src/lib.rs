// Library for tests to access modules

pub mod config;
pub mod correlate;
pub mod discovery;
pub mod error;
pub mod format;
pub mod models;
pub mod reader;
pub mod sampler;
pub mod sink;
pub mod sources;
pub mod sysinfo_repo;
pub mod topology;
pub mod version;
pub mod worker;
