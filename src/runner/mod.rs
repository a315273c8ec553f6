use crate::config::Config;
use crate::connection;
use crate::pacer::{Pacer, PacerSettings, RunReport, Schedule};
use crate::results;
use crate::session::Session;
use crate::shutdown::Shutdown;
use crate::tasks::TaskSet;
use anyhow::{Context, Result};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::info;

/// Runs one complete replay: prepare tasks, connect, pace, drain, persist.
///
/// The tasks file is fully prepared before the connection is opened, so a
/// bad file never touches the server.
pub async fn execute(config: &Config, shutdown: Shutdown) -> Result<RunReport> {
    // one generator for the shuffle and then the arrival schedule
    let mut rng = StdRng::seed_from_u64(config.tasks.seed);
    let tasks = TaskSet::load(&config.tasks, &mut rng)?;

    let stream = connection::connect(&config.server.host, config.server.port).await?;
    let (reader, writer) = stream.into_split();
    let session = Session::start(reader, writer, config.load.stats_window);

    let schedule = Schedule::new(session.run_start(), config.load.mean_qps, rng)?
        .with_hiccup_threshold(config.load.hiccup_threshold());
    let pacer = Pacer::new(PacerSettings::from(&config.load), schedule, session, shutdown);

    let report = pacer.run(&tasks).await?;

    results::save(&config.output.results_file, &report.results).with_context(|| {
        format!(
            "failed to save results to {}",
            config.output.results_file.display()
        )
    })?;
    info!(
        "Saved {} results to {}",
        report.results.len(),
        config.output.results_file.display()
    );

    Ok(report)
}
