use anyhow::Result;
use tasksend::config::Config;
use tasksend::runner;
use tasksend::shutdown::Shutdown;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("tasksend=info")),
        )
        .init();

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.toml".to_string());
    info!("Loading config from {}", config_path);

    let config = Config::from_file(&config_path)?;
    info!(
        "Replaying {} against {}:{}",
        config.tasks.file.display(),
        config.server.host,
        config.server.port
    );

    let shutdown = Shutdown::new();
    shutdown.listen_for_signals();

    let report = runner::execute(&config, shutdown).await?;
    info!(
        "Sent {} tasks, {} answered in {:.1}s ({:?}, drain {:?})",
        report.tasks_sent,
        report.results.len(),
        report.elapsed.as_secs_f64(),
        report.stop,
        report.drain
    );

    Ok(())
}
