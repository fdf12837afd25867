//! [`BenchServer`] – HTTP + WebSocket stand-in for a robot.
//!
//! Listens on `0.0.0.0:8080` (configurable via [`BenchServer::with_port`]).
//!
//! * `PUT` on the control path → 200 OK with the HTTP reply.
//! * WebSocket upgrades on the socket path → greeting, acks and heartbeats.
//! * Everything else → 404.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tokio_tungstenite::accept_hdr_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::header::SEC_WEBSOCKET_PROTOCOL;
use tokio_tungstenite::tungstenite::http::{HeaderValue, StatusCode};
use tracing::{debug, info, warn};

/// Default TCP port for the bench server.
pub const DEFAULT_PORT: u16 = 8080;

/// Payload of the periodic liveness frame.
pub const HEARTBEAT: &str = "heartbeat";

/// Request bodies above this size are truncated.
const MAX_BODY: usize = 64 * 1024;

#[derive(Error, Debug)]
pub enum BenchError {
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
}

// ---------------------------------------------------------------------------
// BenchServer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct Settings {
    control_path: String,
    socket_path: String,
    protocol: String,
    http_reply: String,
    http_delay: Duration,
    socket_reply: String,
    socket_delay: Duration,
    heartbeat: Option<Duration>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            control_path: "/control".to_string(),
            socket_path: "/ws".to_string(),
            protocol: "arduino".to_string(),
            http_reply: "Hello world".to_string(),
            http_delay: Duration::from_millis(50),
            socket_reply: "ok".to_string(),
            socket_delay: Duration::from_millis(5),
            heartbeat: Some(Duration::from_millis(500)),
        }
    }
}

/// Builder for a bench robot.
///
/// # Example
///
/// ```rust,no_run
/// use std::time::Duration;
/// use teleop_bench::BenchServer;
///
/// # async fn demo() -> Result<(), teleop_bench::BenchError> {
/// let bench = BenchServer::new()
///     .with_port(0)
///     .with_http_delay(Duration::from_millis(200))
///     .without_heartbeat()
///     .bind()
///     .await?;
/// println!("robot at {}", bench.local_addr());
/// tokio::spawn(bench.run());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct BenchServer {
    addr: SocketAddr,
    settings: Settings,
}

impl Default for BenchServer {
    fn default() -> Self {
        Self::new()
    }
}

impl BenchServer {
    /// Listen on `0.0.0.0` and the [`DEFAULT_PORT`].
    pub fn new() -> Self {
        Self {
            addr: SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT)),
            settings: Settings::default(),
        }
    }

    /// Override the listening port (builder-style). `0` picks a free port.
    pub fn with_port(mut self, port: u16) -> Self {
        self.addr.set_port(port);
        self
    }

    /// Override the full listening address (builder-style).
    pub fn with_addr(mut self, addr: SocketAddr) -> Self {
        self.addr = addr;
        self
    }

    /// Body and delay of the answer to each `PUT`.
    pub fn with_http_reply(mut self, reply: impl Into<String>) -> Self {
        self.settings.http_reply = reply.into();
        self
    }

    pub fn with_http_delay(mut self, delay: Duration) -> Self {
        self.settings.http_delay = delay;
        self
    }

    /// Text and delay of the ack sent for each socket packet.
    pub fn with_socket_reply(mut self, reply: impl Into<String>) -> Self {
        self.settings.socket_reply = reply.into();
        self
    }

    pub fn with_socket_delay(mut self, delay: Duration) -> Self {
        self.settings.socket_delay = delay;
        self
    }

    /// Sub-protocol token echoed during the WebSocket handshake.
    pub fn with_protocol(mut self, protocol: impl Into<String>) -> Self {
        self.settings.protocol = protocol.into();
        self
    }

    pub fn with_heartbeat(mut self, every: Duration) -> Self {
        self.settings.heartbeat = Some(every);
        self
    }

    /// Never send heartbeat frames.
    pub fn without_heartbeat(mut self) -> Self {
        self.settings.heartbeat = None;
        self
    }

    /// Return the configured port.
    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Bind the listener without accepting yet.
    ///
    /// # Errors
    ///
    /// Returns [`BenchError::Bind`] if the TCP listener cannot bind.
    pub async fn bind(self) -> Result<BoundBench, BenchError> {
        let addr = self.addr;
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| BenchError::Bind { addr, source })?;
        let local_addr = listener.local_addr()?;
        Ok(BoundBench {
            listener,
            local_addr,
            settings: Arc::new(self.settings),
            received: Arc::new(Received::default()),
        })
    }
}

// ---------------------------------------------------------------------------
// Received packets
// ---------------------------------------------------------------------------

/// Everything the bench has been sent, shared with every connection task.
#[derive(Debug, Default)]
pub struct Received {
    packets: Mutex<Vec<String>>,
    sockets: AtomicUsize,
}

impl Received {
    /// All packets received so far, over both transports, in arrival order.
    pub fn packets(&self) -> Vec<String> {
        self.packets.lock().map(|p| p.clone()).unwrap_or_default()
    }

    pub fn last(&self) -> Option<String> {
        self.packets.lock().ok().and_then(|p| p.last().cloned())
    }

    /// Number of sockets accepted so far.
    pub fn sockets(&self) -> usize {
        self.sockets.load(Ordering::SeqCst)
    }

    fn record(&self, packet: String) {
        let Ok(mut packets) = self.packets.lock() else {
            return;
        };
        if packets.last() != Some(&packet) {
            info!(packet = %packet, "packet changed");
        }
        packets.push(packet);
    }

    fn next_socket_id(&self) -> usize {
        self.sockets.fetch_add(1, Ordering::SeqCst)
    }
}

// ---------------------------------------------------------------------------
// BoundBench
// ---------------------------------------------------------------------------

/// A bench robot with its listener bound.
pub struct BoundBench {
    listener: TcpListener,
    local_addr: SocketAddr,
    settings: Arc<Settings>,
    received: Arc<Received>,
}

impl BoundBench {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Handle to the packet log; stays valid after [`BoundBench::run`] takes `self`.
    pub fn received(&self) -> Arc<Received> {
        Arc::clone(&self.received)
    }

    /// Accept connections forever, dispatching each one as either a
    /// WebSocket session (when the request carries `Upgrade: websocket`) or
    /// a plain HTTP exchange.
    pub async fn run(self) {
        info!(addr = %self.local_addr, "bench robot listening");
        loop {
            match self.listener.accept().await {
                Ok((stream, peer)) => {
                    let settings = Arc::clone(&self.settings);
                    let received = Arc::clone(&self.received);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(stream, peer, settings, received).await {
                            warn!(%peer, error = %e, "client error");
                        }
                    });
                }
                Err(e) => warn!(error = %e, "accept error"),
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Per-connection handler
// ---------------------------------------------------------------------------

async fn handle_connection(
    stream: TcpStream,
    peer: SocketAddr,
    settings: Arc<Settings>,
    received: Arc<Received>,
) -> Result<(), BenchError> {
    // `peek` leaves the request in place for whichever handler runs next.
    let mut buf = [0u8; 1024];
    let n = stream.peek(&mut buf).await?;

    let header_preview = String::from_utf8_lossy(&buf[..n]);
    let is_ws_upgrade = header_preview.lines().any(|line| {
        let line = line.to_ascii_lowercase();
        line.starts_with("upgrade:") && line.contains("websocket")
    });

    if is_ws_upgrade {
        handle_ws(stream, peer, &settings, &received).await
    } else {
        serve_http(stream, &settings, &received).await
    }
}

// ---------------------------------------------------------------------------
// Plain HTTP: the polling endpoint
// ---------------------------------------------------------------------------

async fn serve_http(
    stream: TcpStream,
    settings: &Settings,
    received: &Received,
) -> Result<(), BenchError> {
    let mut reader = BufReader::new(stream);

    let mut request_line = String::new();
    reader.read_line(&mut request_line).await?;
    let mut parts = request_line.split_whitespace();
    let method = parts.next().unwrap_or_default().to_string();
    let path = parts.next().unwrap_or_default().to_string();

    let mut content_length = 0usize;
    loop {
        let mut line = String::new();
        if reader.read_line(&mut line).await? == 0 {
            break;
        }
        let line = line.trim_end();
        if line.is_empty() {
            break;
        }
        if let Some((name, value)) = line.split_once(':')
            && name.trim().eq_ignore_ascii_case("content-length")
        {
            content_length = value.trim().parse().unwrap_or(0);
        }
    }

    let mut body = vec![0u8; content_length.min(MAX_BODY)];
    reader.read_exact(&mut body).await?;

    let (status, reply) = if method == "PUT" && path == settings.control_path {
        received.record(String::from_utf8_lossy(&body).into_owned());
        tokio::time::sleep(settings.http_delay).await;
        ("200 OK", settings.http_reply.as_str())
    } else {
        debug!(%method, %path, "unknown route");
        ("404 Not Found", "Not found")
    };

    let response = format!(
        "HTTP/1.1 {status}\r\n\
         Content-Type: text/plain; charset=utf-8\r\n\
         Content-Length: {}\r\n\
         Connection: close\r\n\
         \r\n\
         {reply}",
        reply.len()
    );
    let stream = reader.get_mut();
    stream.write_all(response.as_bytes()).await?;
    stream.shutdown().await?;
    Ok(())
}

// ---------------------------------------------------------------------------
// WebSocket: the socket endpoint
// ---------------------------------------------------------------------------

async fn handle_ws(
    stream: TcpStream,
    peer: SocketAddr,
    settings: &Settings,
    received: &Received,
) -> Result<(), BenchError> {
    let socket_path = settings.socket_path.clone();
    let protocol = settings.protocol.clone();
    let ws_stream = accept_hdr_async(stream, move |req: &Request, mut response: Response| {
        if req.uri().path() != socket_path {
            let mut refused = ErrorResponse::new(Some("Not found".to_string()));
            *refused.status_mut() = StatusCode::NOT_FOUND;
            return Err(refused);
        }
        let offered = req
            .headers()
            .get(SEC_WEBSOCKET_PROTOCOL)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.split(',').any(|p| p.trim() == protocol));
        if offered && let Ok(value) = HeaderValue::from_str(&protocol) {
            response.headers_mut().insert(SEC_WEBSOCKET_PROTOCOL, value);
        }
        Ok(response)
    })
    .await?;

    let id = received.next_socket_id();
    info!(%peer, id, "socket connected");

    let (mut ws_tx, mut ws_rx) = ws_stream.split();
    ws_tx
        .send(Message::Text(format!("Connected: {id}").into()))
        .await?;

    let mut heartbeat = settings.heartbeat.map(|every| {
        let mut interval = tokio::time::interval_at(Instant::now() + every, every);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        interval
    });

    loop {
        tokio::select! {
            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        received.record(text.to_string());
                        tokio::time::sleep(settings.socket_delay).await;
                        if ws_tx.send(Message::Text(settings.socket_reply.clone().into())).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(_)) => break,
                    _ => {}
                }
            }
            _ = tick(&mut heartbeat) => {
                if ws_tx.send(Message::Text(HEARTBEAT.into())).await.is_err() {
                    break;
                }
            }
        }
    }

    info!(%peer, id, "socket closed");
    Ok(())
}

async fn tick(interval: &mut Option<Interval>) {
    match interval {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
