use crate::error::RunError;
use crate::tasks::Task;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tracing::debug;

/// Producer side of the dispatcher's queue. Pushing never blocks.
#[derive(Debug, Clone)]
pub struct DispatchQueue {
    tx: mpsc::UnboundedSender<Task>,
    depth: Arc<AtomicUsize>,
}

impl DispatchQueue {
    pub fn push(&self, task: Task) -> Result<(), RunError> {
        self.depth.fetch_add(1, Ordering::Relaxed);
        self.tx.send(task).map_err(|_| {
            self.depth.fetch_sub(1, Ordering::Relaxed);
            RunError::WorkerStopped("dispatcher")
        })
    }

    /// Tasks pushed but not yet picked up by the dispatcher.
    pub fn depth(&self) -> usize {
        self.depth.load(Ordering::Relaxed)
    }
}

/// Owns the outbound half of the connection and writes queued tasks to it
/// one at a time.
pub struct Dispatcher<W> {
    writer: W,
    rx: mpsc::UnboundedReceiver<Task>,
    depth: Arc<AtomicUsize>,
}

pub fn channel<W>(writer: W) -> (DispatchQueue, Dispatcher<W>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let depth = Arc::new(AtomicUsize::new(0));

    let queue = DispatchQueue {
        tx,
        depth: depth.clone(),
    };
    let dispatcher = Dispatcher { writer, rx, depth };
    (queue, dispatcher)
}

impl<W: AsyncWrite + Unpin> Dispatcher<W> {
    /// Runs until the queue is closed, or until a write fails.
    pub async fn run(mut self) -> Result<(), RunError> {
        while let Some(task) = self.rx.recv().await {
            self.depth.fetch_sub(1, Ordering::Relaxed);
            self.write_task(&task).await?;
        }

        debug!("Dispatch queue closed");
        Ok(())
    }

    async fn write_task(&mut self, task: &Task) -> Result<(), RunError> {
        let mut remaining = task.as_bytes();

        while !remaining.is_empty() {
            let sent = self.writer.write(remaining).await?;
            if sent == 0 {
                return Err(RunError::ZeroWrite {
                    task: task.text().to_string(),
                });
            }
            remaining = &remaining[sent..];
        }

        self.writer.flush().await?;
        Ok(())
    }
}
