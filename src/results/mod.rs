use crate::error::ResultsError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

/// One matched response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskResult {
    pub task_id: u64,
    /// Seconds between the start of the run and the task's recorded start.
    pub start_offset_secs: f64,
    pub task: String,
    pub latency_ms: f64,
    pub queue_time_ms: f64,
}

impl fmt::Display for TaskResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:8.3} sec: latency {:8.1} msec; queue msec {:.1}; task {}",
            self.start_offset_secs, self.latency_ms, self.queue_time_ms, self.task
        )
    }
}

pub type SharedResults = Arc<Mutex<Vec<TaskResult>>>;

pub fn sort_by_start(results: &mut [TaskResult]) {
    results.sort_by(|a, b| a.start_offset_secs.total_cmp(&b.start_offset_secs));
}

pub fn save(path: &Path, results: &[TaskResult]) -> Result<(), ResultsError> {
    let bytes = bincode::serialize(results)?;
    std::fs::write(path, bytes).map_err(|source| ResultsError::Io {
        path: path.to_path_buf(),
        source,
    })
}

pub fn load(path: &Path) -> Result<Vec<TaskResult>, ResultsError> {
    let bytes = std::fs::read(path).map_err(|source| ResultsError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(bincode::deserialize(&bytes)?)
}
