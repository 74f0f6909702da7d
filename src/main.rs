use anyhow::Result;
use perfsampler::*;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::FormatTime;

struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(
            w,
            "{}",
            chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z")
        )
    }
}

fn build_sink(output: &config::OutputConfig) -> Result<Arc<dyn sink::LineSink>> {
    let file = sink::DailyFileSink::create(&output.directory, &output.prefix)?;
    if output.stdout {
        Ok(Arc::new(sink::FanoutSink::new(vec![
            Box::new(file),
            Box::new(sink::StdoutSink),
        ])))
    } else {
        Ok(Arc::new(file))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_timer(LocalTimer)
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let app_config = config::AppConfig::load()?;
    tracing::info!(
        name = version::NAME,
        version = version::VERSION,
        interval_ms = app_config.sampling.interval_ms,
        directory = %app_config.output.directory,
        "starting"
    );

    let sink = build_sink(&app_config.output)?;
    let repo = tokio::task::spawn_blocking(sysinfo_repo::SysinfoRepo::new).await?;
    let sources = sources::HostSources::from_single(Arc::new(repo));

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
    let mut worker_handle = worker::spawn(
        worker::WorkerDeps {
            sources,
            sink,
            shutdown_rx,
        },
        worker::WorkerConfig::from(&app_config.sampling),
    );

    tokio::select! {
        result = &mut worker_handle => {
            let ticks = result?;
            tracing::info!(ticks, "sampling finished");
        }
        _ = async {
            #[cfg(unix)]
            {
                let mut sigterm = match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                    Ok(s) => s,
                    Err(_) => {
                        let _ = tokio::signal::ctrl_c().await;
                        return;
                    }
                };
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = sigterm.recv() => {}
                }
            }
            #[cfg(not(unix))]
            {
                let _ = tokio::signal::ctrl_c().await;
            }
        } => {
            tracing::info!("Received shutdown signal");
            let _ = shutdown_tx.send(());
            let ticks = worker_handle.await?;
            tracing::info!(ticks, "sampling stopped");
        }
    }

    Ok(())
}
