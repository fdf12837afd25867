//! `teleop-bench` – Stand-in robot for bench testing the operator console
//!
//! Boots a lightweight HTTP + WebSocket server (default port `8080`) that
//! answers both link transports the way robot firmware does:
//!
//! | Request | Answer |
//! |---|---|
//! | `PUT /control` | `200` with the HTTP reply after a short delay |
//! | WebSocket upgrade on `/ws` | `Connected: N`, then one ack per packet |
//! | anything else | `404 Not found` |
//!
//! Open sockets also receive a `heartbeat` frame on a fixed interval, so
//! the console's liveness watchdog can be exercised by turning it off.
//!
//! # Usage
//!
//! ```rust,no_run
//! use teleop_bench::BenchServer;
//!
//! #[tokio::main]
//! async fn main() {
//!     let bench = BenchServer::new()
//!         .with_port(8080)
//!         .bind()
//!         .await
//!         .expect("bench bind failed");
//!     bench.run().await;
//! }
//! ```

pub mod server;

pub use server::{BenchError, BenchServer, BoundBench, DEFAULT_PORT, Received};
