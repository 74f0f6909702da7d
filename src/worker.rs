// Background sampling worker: discover once, warm up, then sample and emit on a fixed interval.
// Counter and inventory calls block, so discovery, sampling and sink writes run on the
// blocking pool, one at a time.

use crate::config::SamplingConfig;
use crate::sampler::{Sampler, SamplerState};
use crate::sink::LineSink;
use crate::sources::HostSources;
use crate::topology::Topology;
use std::sync::Arc;
use tokio::time::{Duration, interval};
use tracing::instrument;

/// Sources, sink, and shutdown for the worker.
pub struct WorkerDeps {
    pub sources: HostSources,
    pub sink: Arc<dyn LineSink>,
    pub shutdown_rx: tokio::sync::oneshot::Receiver<()>,
}

/// Worker timing config.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub interval_ms: u64,
    pub warmup_ms: u64,
    /// Stop after the first emitted tick.
    pub run_once: bool,
}

impl From<&SamplingConfig> for WorkerConfig {
    fn from(c: &SamplingConfig) -> Self {
        Self {
            interval_ms: c.interval_ms,
            warmup_ms: c.warmup_ms,
            run_once: c.run_once,
        }
    }
}

fn enter(state: &mut SamplerState, next: SamplerState) {
    tracing::trace!(from = ?*state, to = ?next, "sampler state");
    *state = next;
}

/// Spawns the sampling loop. Resolves with the number of ticks emitted once the loop
/// stops (shutdown signal, run-once mode, or a failed discovery task).
pub fn spawn(deps: WorkerDeps, config: WorkerConfig) -> tokio::task::JoinHandle<u64> {
    tokio::spawn(async move { run(deps, config).await })
}

#[instrument(skip_all, fields(interval_ms = config.interval_ms, run_once = config.run_once))]
async fn run(deps: WorkerDeps, config: WorkerConfig) -> u64 {
    let WorkerDeps {
        sources,
        sink,
        mut shutdown_rx,
    } = deps;
    let WorkerConfig {
        interval_ms,
        warmup_ms,
        run_once,
    } = config;

    let mut state = SamplerState::Idle;
    let sampler = Arc::new(Sampler::new(sources));
    let mut ticks_emitted: u64 = 0;

    enter(&mut state, SamplerState::Discovering);
    let discover_sampler = sampler.clone();
    let topology = match tokio::task::spawn_blocking(move || {
        Topology::discover(discover_sampler.sources())
    })
    .await
    {
        Ok(t) => Arc::new(t),
        Err(e) => {
            tracing::error!(error = %e, operation = "discover", "discovery task failed");
            return ticks_emitted;
        }
    };

    enter(&mut state, SamplerState::WarmingUp);
    tokio::select! {
        _ = tokio::time::sleep(Duration::from_millis(warmup_ms)) => {}
        _ = &mut shutdown_rx => {
            tracing::debug!("Worker shutting down during warm-up");
            return ticks_emitted;
        }
    }

    let mut tick = interval(Duration::from_millis(interval_ms));
    tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = tick.tick() => {
                enter(&mut state, SamplerState::Sampling);
                let timestamp = chrono::Local::now().naive_local();
                let tick_sampler = sampler.clone();
                let tick_topology = topology.clone();
                let lines = match tokio::task::spawn_blocking(move || {
                    tick_sampler.sample_tick(&tick_topology, timestamp)
                })
                .await
                {
                    Ok(lines) => lines,
                    Err(e) => {
                        tracing::warn!(error = %e, operation = "sample_tick", "sampling task failed");
                        continue;
                    }
                };

                enter(&mut state, SamplerState::Emitting);
                let line_count = lines.len();
                let tick_sink = sink.clone();
                match tokio::task::spawn_blocking(move || tick_sink.write_lines(&lines)).await {
                    Ok(Ok(())) => {
                        ticks_emitted += 1;
                        tracing::debug!(operation = "emit", lines = line_count, "tick emitted");
                    }
                    Ok(Err(e)) => {
                        tracing::warn!(error = %e, operation = "emit", "writing metric lines failed");
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, operation = "emit", "emit task failed");
                    }
                }

                if run_once {
                    break;
                }
            }
            _ = &mut shutdown_rx => {
                tracing::debug!("Worker shutting down");
                break;
            }
        }
    }
    ticks_emitted
}
