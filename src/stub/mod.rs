//! A minimal server speaking the replay protocol, for local runs and tests.
//!
//! Every fixed-width task read from a connection is answered at once with a
//! `<n>:<queue_time_ms>` frame, where `n` counts tasks on that connection
//! from zero.

use crate::protocol::{Correlation, TASK_WIDTH};
use std::io;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpListener;
use tracing::{debug, error};

pub async fn serve(listener: TcpListener, queue_time_ms: f64) -> io::Result<()> {
    loop {
        let (socket, peer) = listener.accept().await?;
        debug!("New connection from {}", peer);

        tokio::spawn(async move {
            match handle_client(socket, queue_time_ms).await {
                Ok(answered) => debug!("Connection from {} closed after {} tasks", peer, answered),
                Err(e) => error!("Error handling connection from {}: {}", peer, e),
            }
        });
    }
}

/// Answers tasks until the client hangs up. Returns how many were answered.
pub async fn handle_client<S>(mut socket: S, queue_time_ms: f64) -> io::Result<u64>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut task = [0u8; TASK_WIDTH];
    let mut next_id = 0u64;

    loop {
        match socket.read_exact(&mut task).await {
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(next_id),
            Err(e) => return Err(e),
        }

        let frame = Correlation {
            task_id: next_id,
            queue_time_ms,
        }
        .encode()
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        socket.write_all(&frame).await?;
        next_id += 1;
    }
}
