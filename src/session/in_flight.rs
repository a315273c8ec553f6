use crate::tasks::Task;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::time::Instant;

#[derive(Debug, Clone)]
pub struct PendingRequest {
    pub started_at: Instant,
    pub task: Task,
}

/// Requests sent but not yet answered, keyed by task id.
///
/// The pacer is the only inserter and the collector the only remover;
/// everyone else only looks at `len`.
#[derive(Debug, Default)]
pub struct InFlightTable {
    entries: DashMap<u64, PendingRequest>,
}

impl InFlightTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, task_id: u64, request: PendingRequest) {
        self.entries.insert(task_id, request);
    }

    pub fn get(&self, task_id: u64) -> Option<PendingRequest> {
        self.entries.get(&task_id).map(|entry| entry.value().clone())
    }

    pub fn remove(&self, task_id: u64) -> Option<PendingRequest> {
        self.entries.remove(&task_id).map(|(_, request)| request)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

pub type SharedInFlight = Arc<InFlightTable>;
