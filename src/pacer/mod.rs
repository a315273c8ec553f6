pub mod schedule;

pub use schedule::{Schedule, Slot};

use crate::config::LoadConfig;
use crate::error::RunError;
use crate::results::TaskResult;
use crate::session::Session;
use crate::shutdown::Shutdown;
use crate::tasks::TaskSet;
use rand::Rng;
use std::time::Duration;
use tokio::time::{self, Instant};
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct PacerSettings {
    pub mean_qps: f64,
    pub run_time: Duration,
    pub progress_interval: Duration,
    pub drain_poll: Duration,
}

impl From<&LoadConfig> for PacerSettings {
    fn from(config: &LoadConfig) -> Self {
        Self {
            mean_qps: config.mean_qps,
            run_time: config.run_time(),
            progress_interval: config.progress_interval(),
            drain_poll: config.drain_poll(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    BudgetExhausted,
    Interrupted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainOutcome {
    /// Every sent task got its response.
    Completed,
    /// A second stop request ended the wait with responses outstanding.
    Abandoned,
}

#[derive(Debug)]
pub struct RunReport {
    pub results: Vec<TaskResult>,
    pub tasks_sent: u64,
    pub stop: StopReason,
    pub drain: DrainOutcome,
    pub elapsed: Duration,
}

/// Drives a session: paces tasks onto it until the run time is used up or a
/// stop is requested, then waits for outstanding responses.
pub struct Pacer<R> {
    settings: PacerSettings,
    schedule: Schedule<R>,
    session: Session,
    shutdown: Shutdown,
}

impl<R: Rng> Pacer<R> {
    pub fn new(
        settings: PacerSettings,
        schedule: Schedule<R>,
        session: Session,
        shutdown: Shutdown,
    ) -> Self {
        Self {
            settings,
            schedule,
            session,
            shutdown,
        }
    }

    pub async fn run(mut self, tasks: &TaskSet) -> Result<RunReport, RunError> {
        info!("Mean QPS {}", self.settings.mean_qps);

        let stop = self.send_tasks(tasks).await?;
        match stop {
            StopReason::Interrupted => info!("Stop requested, no more tasks will be sent"),
            // the next interrupt abandons the drain
            StopReason::BudgetExhausted => self.shutdown.request_stop(),
        }
        info!("{:8.1} sec: Done sending tasks...", self.elapsed_secs());

        let drain = self.drain().await?;
        info!("{:8.1} sec: Done...", self.elapsed_secs());

        let tasks_sent = self.session.tasks_sent();
        let elapsed = self.session.run_start().elapsed();
        let results = self.session.finish().await;
        if drain == DrainOutcome::Abandoned {
            warn!(
                "Drain abandoned: {} of {} tasks never got a response",
                tasks_sent - results.len() as u64,
                tasks_sent
            );
        }

        Ok(RunReport {
            results,
            tasks_sent,
            stop,
            drain,
            elapsed,
        })
    }

    /// Cycles through `tasks` until the run time is used up or a stop is
    /// requested.
    async fn send_tasks(&mut self, tasks: &TaskSet) -> Result<StopReason, RunError> {
        let run_start = self.session.run_start();
        let mut last_progress = run_start;

        loop {
            for task in tasks.as_slice() {
                let now = Instant::now();
                if now.duration_since(run_start) > self.settings.run_time {
                    return Ok(StopReason::BudgetExhausted);
                }
                if self.shutdown.is_stop_requested() {
                    return Ok(StopReason::Interrupted);
                }

                if now.duration_since(last_progress) > self.settings.progress_interval {
                    self.log_progress(now).await;
                    last_progress = now;
                }

                let started_at = match self.schedule.next_slot(Instant::now()) {
                    Slot::OnTime(target) => {
                        let woke = tokio::select! {
                            biased;
                            err = self.session.worker_failure() => return Err(err),
                            _ = self.shutdown.stop_requested() => false,
                            _ = time::sleep_until(target) => true,
                        };
                        if !woke {
                            return Ok(StopReason::Interrupted);
                        }
                        Instant::now()
                    }
                    Slot::Late { target, lag, warn } => {
                        if warn {
                            warn!("hiccup {:.1} msec", lag.as_secs_f64() * 1000.0);
                        }
                        target
                    }
                };

                if let Err(e) = self.session.send(started_at, task) {
                    // the dispatcher is gone; report why it stopped
                    debug!("Could not queue task: {}", e);
                    return Err(self.session.worker_failure().await);
                }
            }
            debug!("Finished a pass over {} tasks, starting over", tasks.len());
        }
    }

    /// Polls until every sent task was answered or the drain is abandoned.
    async fn drain(&mut self) -> Result<DrainOutcome, RunError> {
        loop {
            if self.session.in_flight() == 0 {
                return Ok(DrainOutcome::Completed);
            }

            tokio::select! {
                biased;
                _ = self.shutdown.drain_abandoned() => return Ok(DrainOutcome::Abandoned),
                _ = time::sleep(self.settings.drain_poll) => {}
                err = self.session.worker_failure() => {
                    // a hang-up right after the last response is not a failure
                    if self.session.in_flight() == 0 {
                        debug!("Worker stopped after the drain finished: {}", err);
                        return Ok(DrainOutcome::Completed);
                    }
                    return Err(err);
                }
            }
        }
    }

    async fn log_progress(&self, now: Instant) {
        let elapsed = now.duration_since(self.session.run_start()).as_secs_f64();
        let pct_done = (100.0 * elapsed / self.settings.run_time.as_secs_f64()).min(100.0);
        let qps = self.session.tasks_sent() as f64 / elapsed;
        let (latency_ms, queue_time_ms) = self.session.rolling_means().await;

        info!(
            "{:6.1} s: {:5.1}%: {:5.1} qps; {:6.1}/{:6.1} ms [{}, {}]",
            elapsed,
            pct_done,
            qps,
            latency_ms,
            queue_time_ms,
            self.session.queue_depth(),
            self.session.in_flight()
        );
    }

    fn elapsed_secs(&self) -> f64 {
        self.session.run_start().elapsed().as_secs_f64()
    }
}
