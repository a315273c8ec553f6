use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Failures while turning the tasks file into a replayable task set.
/// All of them happen before any connection is opened.
#[derive(Debug, Error)]
pub enum PrepareError {
    #[error("failed to read tasks file '{path}': {source}")]
    Io { path: PathBuf, source: io::Error },

    #[error("task on line {line} is {len} bytes (max {max}): {text}")]
    TaskTooLong {
        line: usize,
        len: usize,
        max: usize,
        text: String,
    },

    #[error("no tasks left to send after pruning")]
    NoTasks,
}

/// Failures of the send/receive engine. Every variant ends the run.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("failed to connect to {addr}: {source}")]
    Connect { addr: String, source: io::Error },

    #[error("failed to send task \"{task}\": connection accepted zero bytes")]
    ZeroWrite { task: String },

    #[error("server closed the connection")]
    ConnectionClosed,

    #[error("connection I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("invalid mean QPS {0}")]
    InvalidRate(f64),

    #[error("{0} worker stopped unexpectedly")]
    WorkerStopped(&'static str),

    #[error("{worker} worker panicked: {reason}")]
    WorkerPanicked { worker: &'static str, reason: String },
}

/// A response frame that does not look like `<taskID>:<queueTimeMS>`.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FrameError {
    #[error("frame is not valid UTF-8")]
    NotUtf8,

    #[error("frame has no ':' separator")]
    MissingSeparator,

    #[error("bad task id {0:?}")]
    BadTaskId(String),

    #[error("bad queue time {0:?}")]
    BadQueueTime(String),

    #[error("encoded frame is {0} bytes, longer than a frame")]
    TooLong(usize),
}

#[derive(Debug, Error)]
pub enum ResultsError {
    #[error("results file I/O failed for '{path}': {source}")]
    Io { path: PathBuf, source: io::Error },

    #[error("results encoding failed: {0}")]
    Codec(#[from] bincode::Error),
}
