use crate::error::RunError;
use socket2::{SockRef, TcpKeepalive};
use std::time::Duration;
use tokio::net::TcpStream;
use tracing::{debug, info};

/// Opens the single connection a run uses. No read or write timeouts are
/// set: a stalled server shows up as a stalled run.
pub async fn connect(host: &str, port: u16) -> Result<TcpStream, RunError> {
    debug!("Connecting to {}:{}", host, port);
    let stream = TcpStream::connect((host, port))
        .await
        .map_err(|source| RunError::Connect {
            addr: format!("{host}:{port}"),
            source,
        })?;

    configure_socket(&stream)?;
    info!("Connected to {}", stream.peer_addr()?);

    Ok(stream)
}

fn configure_socket(stream: &TcpStream) -> Result<(), RunError> {
    let sock_ref = SockRef::from(stream);

    let keepalive = TcpKeepalive::new()
        .with_time(Duration::from_secs(30)) // probe after 30 seconds of idle
        .with_interval(Duration::from_secs(10));
    sock_ref.set_tcp_keepalive(&keepalive)?;

    // tasks are small; don't let Nagle hold them back
    stream.set_nodelay(true)?;

    Ok(())
}
