use tasksend::stub;
use tokio::net::TcpListener;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter("tasksend=debug,info")
        .init();

    let port: u16 = std::env::args()
        .nth(1)
        .and_then(|p| p.parse().ok())
        .unwrap_or(7777);
    let queue_time_ms: f64 = std::env::args()
        .nth(2)
        .and_then(|q| q.parse().ok())
        .unwrap_or(0.0);

    let listener = TcpListener::bind(format!("127.0.0.1:{}", port)).await?;
    info!("Stub server listening on port {}", port);

    stub::serve(listener, queue_time_ms).await?;
    Ok(())
}
