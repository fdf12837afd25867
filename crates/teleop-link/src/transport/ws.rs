use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

use futures_util::{SinkExt, StreamExt};
use teleop_types::{LinkError, ReadyState};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::handshake::client::Request;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tracing::{debug, warn};

use crate::socket::{DuplexSocket, SocketConnector, SocketEvent, SocketEvents};

const CONNECTING: u8 = 0;
const OPEN: u8 = 1;
const CLOSING: u8 = 2;
const CLOSED: u8 = 3;

fn decode(state: u8) -> ReadyState {
    match state {
        CONNECTING => ReadyState::Connecting,
        OPEN => ReadyState::Open,
        CLOSING => ReadyState::Closing,
        CLOSED => ReadyState::Closed,
        _ => ReadyState::Unknown,
    }
}

enum Outbound {
    Frame(String),
    Close,
}

/// Opens WebSocket connections on a background task.
///
/// Must be used from inside a tokio runtime.
#[derive(Debug, Clone, Copy, Default)]
pub struct WsConnector;

impl SocketConnector for WsConnector {
    fn open(&self, url: &str, protocol: &str) -> (Box<dyn DuplexSocket>, SocketEvents) {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let ready = Arc::new(AtomicU8::new(CONNECTING));

        tokio::spawn(run_socket(
            url.to_string(),
            protocol.to_string(),
            Arc::clone(&ready),
            event_tx,
            outbound_rx,
        ));

        let socket = WsSocket {
            ready,
            outbound: outbound_tx,
        };
        (Box::new(socket), event_rx)
    }
}

struct WsSocket {
    ready: Arc<AtomicU8>,
    outbound: mpsc::UnboundedSender<Outbound>,
}

impl DuplexSocket for WsSocket {
    fn ready_state(&self) -> ReadyState {
        decode(self.ready.load(Ordering::SeqCst))
    }

    fn send(&mut self, text: &str) -> Result<(), LinkError> {
        self.outbound
            .send(Outbound::Frame(text.to_string()))
            .map_err(|_| LinkError::Socket("socket task has exited".to_string()))
    }

    fn close(&mut self) {
        self.ready.store(CLOSING, Ordering::SeqCst);
        let _ = self.outbound.send(Outbound::Close);
    }
}

fn build_request(url: &str, protocol: &str) -> Result<Request, String> {
    let mut request = url.into_client_request().map_err(|e| e.to_string())?;
    let value = HeaderValue::from_str(protocol).map_err(|e| e.to_string())?;
    request.headers_mut().insert("Sec-WebSocket-Protocol", value);
    Ok(request)
}

async fn run_socket(
    url: String,
    protocol: String,
    ready: Arc<AtomicU8>,
    events: mpsc::UnboundedSender<SocketEvent>,
    mut outbound: mpsc::UnboundedReceiver<Outbound>,
) {
    let connected = match build_request(&url, &protocol) {
        Ok(request) => connect_async(request).await.map_err(|e| e.to_string()),
        Err(e) => Err(e),
    };
    let stream = match connected {
        Ok((stream, _response)) => stream,
        Err(e) => {
            warn!(url = %url, error = %e, "socket connect failed");
            ready.store(CLOSED, Ordering::SeqCst);
            let _ = events.send(SocketEvent::Error(e));
            let _ = events.send(SocketEvent::Closed);
            return;
        }
    };

    // A close requested while the handshake was in flight wins.
    if ready
        .compare_exchange(CONNECTING, OPEN, Ordering::SeqCst, Ordering::SeqCst)
        .is_err()
    {
        ready.store(CLOSED, Ordering::SeqCst);
        return;
    }
    debug!(url = %url, "socket connected");
    let _ = events.send(SocketEvent::Open);

    let (mut write, mut read) = stream.split();
    loop {
        tokio::select! {
            frame = read.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    if events.send(SocketEvent::Message(text.to_string())).is_err() {
                        break;
                    }
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    let _ = events.send(SocketEvent::Error(e.to_string()));
                    break;
                }
            },
            out = outbound.recv() => match out {
                Some(Outbound::Frame(text)) => {
                    if let Err(e) = write.send(Message::Text(text.into())).await {
                        let _ = events.send(SocketEvent::Error(e.to_string()));
                        break;
                    }
                }
                Some(Outbound::Close) | None => {
                    ready.store(CLOSING, Ordering::SeqCst);
                    let _ = write.send(Message::Close(None)).await;
                    break;
                }
            },
        }
    }

    ready.store(CLOSED, Ordering::SeqCst);
    let _ = events.send(SocketEvent::Closed);
}
