use serde::Deserialize;

const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub sampling: SamplingConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SamplingConfig {
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    /// Delay between counter creation and the first reported sample.
    #[serde(default = "default_warmup_ms")]
    pub warmup_ms: u64,
    /// Take one sample and exit instead of looping.
    #[serde(default)]
    pub run_once: bool,
}

/// Smallest accepted interval and warm-up, in milliseconds. Never below 1.
pub fn min_sample_gap_ms() -> u64 {
    u64::try_from(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL.as_millis())
        .unwrap_or(u64::MAX)
        .max(1)
}

fn default_interval_ms() -> u64 {
    5000
}

fn default_warmup_ms() -> u64 {
    1000
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            warmup_ms: default_warmup_ms(),
            run_once: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_directory")]
    pub directory: String,
    /// Log files are named `{prefix}_{yyyyMMdd}.log`.
    #[serde(default = "default_prefix")]
    pub prefix: String,
    /// Echo every line to stdout as well.
    #[serde(default)]
    pub stdout: bool,
}

fn default_directory() -> String {
    "logs".into()
}

fn default_prefix() -> String {
    "performance".into()
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: default_directory(),
            prefix: default_prefix(),
            stdout: false,
        }
    }
}

impl AppConfig {
    /// Load from `$CONFIG_FILE`, else `config.toml`. Defaults apply when `CONFIG_FILE`
    /// is unset and `config.toml` does not exist.
    pub fn load() -> anyhow::Result<Self> {
        let path = match std::env::var("CONFIG_FILE") {
            Ok(p) => p,
            Err(_) => {
                if !std::path::Path::new(DEFAULT_CONFIG_PATH).exists() {
                    tracing::info!("no {} found; using defaults", DEFAULT_CONFIG_PATH);
                    let config = AppConfig::default();
                    config.validate()?;
                    return Ok(config);
                }
                DEFAULT_CONFIG_PATH.into()
            }
        };
        let s = std::fs::read_to_string(&path)
            .map_err(|e| anyhow::anyhow!("config {}: {}", path, e))?;
        Self::load_from_str(&s)
    }

    /// Parse and validate config from a string (e.g. for tests).
    pub fn load_from_str(s: &str) -> anyhow::Result<Self> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        // Rate and percentage counters need at least this much time between two reads.
        let floor_ms = min_sample_gap_ms();
        anyhow::ensure!(
            self.sampling.interval_ms >= floor_ms,
            "sampling.interval_ms must be >= {} ms, got {}",
            floor_ms,
            self.sampling.interval_ms
        );
        anyhow::ensure!(
            self.sampling.warmup_ms >= floor_ms,
            "sampling.warmup_ms must be >= {} ms, got {}",
            floor_ms,
            self.sampling.warmup_ms
        );
        anyhow::ensure!(
            !self.output.directory.trim().is_empty(),
            "output.directory must be non-empty"
        );
        anyhow::ensure!(
            !self.output.prefix.trim().is_empty(),
            "output.prefix must be non-empty"
        );
        anyhow::ensure!(
            !self.output.prefix.contains(['/', '\\']),
            "output.prefix must not contain path separators, got {:?}",
            self.output.prefix
        );
        Ok(())
    }
}
