//! `teleop-bench` – run a stand-in robot on the local machine.
//!
//! ```text
//! teleop-bench [PORT]
//! ```
//!
//! The port falls back to `$PORT`, then to `8080`. Set
//! `TELEOP_BENCH_SILENT=1` to stop sending heartbeats.

use teleop_bench::{BenchServer, DEFAULT_PORT};
use tracing::error;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let port = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("PORT").ok())
        .and_then(|raw| raw.parse::<u16>().ok())
        .unwrap_or(DEFAULT_PORT);

    let mut server = BenchServer::new().with_port(port);
    if std::env::var("TELEOP_BENCH_SILENT").is_ok_and(|v| v == "1") {
        server = server.without_heartbeat();
    }

    match server.bind().await {
        Ok(bench) => bench.run().await,
        Err(e) => {
            error!(error = %e, "bench robot failed to start");
            std::process::exit(1);
        }
    }
}
