use super::in_flight::SharedInFlight;
use crate::error::RunError;
use crate::protocol::{Correlation, FRAME_LEN};
use crate::results::{SharedResults, TaskResult};
use crate::stats::SharedLiveStats;
use std::io;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::time::Instant;
use tracing::warn;

/// Owns the inbound half of the connection. Matches response frames to
/// in-flight requests and records their latency.
pub struct Collector<R> {
    reader: R,
    matcher: Matcher,
}

struct Matcher {
    in_flight: SharedInFlight,
    stats: SharedLiveStats,
    results: SharedResults,
    run_start: Instant,
}

impl<R: AsyncRead + Unpin> Collector<R> {
    pub fn new(
        reader: R,
        in_flight: SharedInFlight,
        stats: SharedLiveStats,
        results: SharedResults,
        run_start: Instant,
    ) -> Self {
        Self {
            reader,
            matcher: Matcher {
                in_flight,
                stats,
                results,
                run_start,
            },
        }
    }

    /// Reads frames until the connection fails or the server hangs up.
    pub async fn run(mut self) -> Result<(), RunError> {
        let mut frame = [0u8; FRAME_LEN];

        loop {
            match self.reader.read_exact(&mut frame).await {
                Ok(_) => {}
                Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                    return Err(RunError::ConnectionClosed);
                }
                Err(e) => return Err(e.into()),
            }
            let received_at = Instant::now();

            match Correlation::parse(&frame) {
                Ok(correlation) => {
                    self.matcher.record(correlation, received_at).await;
                }
                Err(e) => {
                    warn!(
                        "Ignoring malformed response {:?}: {}",
                        String::from_utf8_lossy(&frame),
                        e
                    );
                }
            }
        }
    }
}

impl Matcher {
    async fn record(&self, correlation: Correlation, received_at: Instant) {
        let Some(pending) = self.in_flight.get(correlation.task_id) else {
            warn!("Ignoring response for unknown task id {}", correlation.task_id);
            return;
        };

        let latency_ms = received_at.duration_since(pending.started_at).as_secs_f64() * 1000.0;
        {
            let mut stats = self.stats.lock().await;
            stats.queue_time_ms.add(correlation.queue_time_ms);
            stats.latency_ms.add(latency_ms);
        }

        self.results.lock().await.push(TaskResult {
            task_id: correlation.task_id,
            start_offset_secs: pending.started_at.duration_since(self.run_start).as_secs_f64(),
            task: pending.task.text().to_string(),
            latency_ms,
            queue_time_ms: correlation.queue_time_ms,
        });

        // only now may the drain see the table shrink
        self.in_flight.remove(correlation.task_id);
    }
}
