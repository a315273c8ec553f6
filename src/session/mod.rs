pub mod collector;
pub mod dispatcher;
pub mod in_flight;

pub use collector::Collector;
pub use dispatcher::{DispatchQueue, Dispatcher};
pub use in_flight::{InFlightTable, PendingRequest, SharedInFlight};

use crate::error::RunError;
use crate::results::{self, SharedResults, TaskResult};
use crate::stats::{LiveStats, SharedLiveStats};
use crate::tasks::Task;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error};

type WorkerHandle = JoinHandle<Result<(), RunError>>;

/// Shared state of one run over one connection, plus the dispatcher and
/// collector tasks working on it.
pub struct Session {
    queue: DispatchQueue,
    in_flight: SharedInFlight,
    stats: SharedLiveStats,
    results: SharedResults,
    run_start: Instant,
    next_task_id: u64,
    dispatcher_task: WorkerHandle,
    collector_task: WorkerHandle,
}

impl Session {
    /// Spawns the dispatcher on `writer` and the collector on `reader`.
    /// The run's clock starts here.
    pub fn start<R, W>(reader: R, writer: W, stats_window: usize) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let run_start = Instant::now();
        let in_flight: SharedInFlight = Arc::new(InFlightTable::new());
        let stats: SharedLiveStats = Arc::new(Mutex::new(LiveStats::new(stats_window)));
        let results: SharedResults = Arc::new(Mutex::new(Vec::new()));

        let (queue, dispatcher) = dispatcher::channel(writer);
        let dispatcher_task = tokio::spawn(async move {
            let outcome = dispatcher.run().await;
            if let Err(e) = &outcome {
                error!("Dispatcher stopped: {}", e);
            }
            outcome
        });

        let collector = Collector::new(
            reader,
            in_flight.clone(),
            stats.clone(),
            results.clone(),
            run_start,
        );
        let collector_task = tokio::spawn(async move {
            let outcome = collector.run().await;
            if let Err(e) = &outcome {
                error!("Collector stopped: {}", e);
            }
            outcome
        });

        Self {
            queue,
            in_flight,
            stats,
            results,
            run_start,
            next_task_id: 0,
            dispatcher_task,
            collector_task,
        }
    }

    pub fn run_start(&self) -> Instant {
        self.run_start
    }

    /// Registers `task` as in flight since `started_at` and queues it for
    /// sending. Returns the task id.
    pub fn send(&mut self, started_at: Instant, task: &Task) -> Result<u64, RunError> {
        let task_id = self.next_task_id;
        self.next_task_id += 1;

        // the response may arrive before push returns, so register first
        self.in_flight.insert(
            task_id,
            PendingRequest {
                started_at,
                task: task.clone(),
            },
        );
        self.queue.push(task.clone())?;
        Ok(task_id)
    }

    pub fn tasks_sent(&self) -> u64 {
        self.next_task_id
    }

    pub fn queue_depth(&self) -> usize {
        self.queue.depth()
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// Rolling mean latency and queue time, in milliseconds.
    pub async fn rolling_means(&self) -> (f64, f64) {
        let stats = self.stats.lock().await;
        (stats.latency_ms.get(), stats.queue_time_ms.get())
    }

    /// Resolves once either worker has stopped. Neither stops on its own
    /// while the run is healthy, so the result is always an error.
    ///
    /// Must not be polled again after it resolved.
    pub async fn worker_failure(&mut self) -> RunError {
        let (worker, joined) = tokio::select! {
            joined = &mut self.dispatcher_task => ("dispatcher", joined),
            joined = &mut self.collector_task => ("collector", joined),
        };

        match joined {
            Ok(Err(e)) => e,
            Ok(Ok(())) => RunError::WorkerStopped(worker),
            Err(e) => RunError::WorkerPanicked {
                worker,
                reason: e.to_string(),
            },
        }
    }

    /// Stops both workers and hands back the results sorted by start time.
    pub async fn finish(self) -> Vec<TaskResult> {
        let Session {
            queue,
            results,
            dispatcher_task,
            collector_task,
            ..
        } = self;

        drop(queue);
        dispatcher_task.abort();
        collector_task.abort();
        debug!("Workers stopped");

        let mut results = std::mem::take(&mut *results.lock().await);
        results::sort_by_start(&mut results);
        results
    }
}
