//! Persistent-socket link.
//!
//! One duplex text stream is opened on `start()`. The link is `Connected`
//! while the stream is open, pushes each packet as soon as it is set, and
//! treats any close it did not ask for as a lost connection.
//!
//! While the link sits in `Error` and is still enabled, a fresh socket is
//! opened after the backoff interval. With a liveness timeout configured, a
//! connected socket that stays silent (no data, no heartbeat) for that long
//! is failed with [`LinkError::HeartbeatTimeout`].

use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use teleop_types::{LinkError, LinkState, ReadyState};
use tokio::sync::mpsc;
use tokio::time::{Instant, Sleep};
use tracing::{debug, info, trace};

use crate::connection::LinkEvent;
use crate::state::LinkCore;

/// Reserved inbound payload that only proves the peer is alive.
pub const HEARTBEAT: &str = "heartbeat";

/// Something that happened on an open (or opening) socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SocketEvent {
    Open,
    Message(String),
    Error(String),
    Closed,
}

pub type SocketEvents = mpsc::UnboundedReceiver<SocketEvent>;

/// Write half of a duplex text socket.
pub trait DuplexSocket: Send {
    fn ready_state(&self) -> ReadyState;

    /// Queue one text frame. Only meaningful while [`ReadyState::Open`].
    fn send(&mut self, text: &str) -> Result<(), LinkError>;

    fn close(&mut self);
}

/// Opens sockets. Events for the new socket arrive on the returned channel,
/// starting with [`SocketEvent::Open`] or [`SocketEvent::Error`].
pub trait SocketConnector: Send + Sync {
    fn open(&self, url: &str, protocol: &str) -> (Box<dyn DuplexSocket>, SocketEvents);
}

// ----------------------------------------------------------------------------
// SocketLink
// ----------------------------------------------------------------------------

/// The socket state machine without any I/O scheduling.
#[derive(Default)]
pub struct SocketLink {
    core: LinkCore,
    socket: Option<Box<dyn DuplexSocket>>,
    last_send: Option<Instant>,
}

impl SocketLink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn core(&self) -> &LinkCore {
        &self.core
    }

    pub fn core_mut(&mut self) -> &mut LinkCore {
        &mut self.core
    }

    pub fn has_socket(&self) -> bool {
        self.socket.is_some()
    }

    /// Returns `false` when the link is already running.
    pub fn begin(&mut self) -> bool {
        if self.core.is_enabled() {
            return false;
        }
        self.core.set_enabled(true);
        self.core.set_state(LinkState::Connecting);
        true
    }

    /// Adopt a freshly opened socket, closing any previous one.
    pub fn attach(&mut self, socket: Box<dyn DuplexSocket>) {
        self.release_socket();
        self.socket = Some(socket);
    }

    pub fn on_open(&mut self) {
        info!("socket open");
        self.core.set_state(LinkState::Connected);
    }

    pub fn on_error(&mut self, message: String) {
        self.core.fail(LinkError::Socket(message));
    }

    pub fn on_message(&mut self, text: String, now: Instant) {
        if text == HEARTBEAT {
            trace!("heartbeat");
            return;
        }
        if let Some(sent) = self.last_send {
            self.core.record_ping(now.saturating_duration_since(sent));
        }
        self.core.set_response_data(Some(text));
    }

    /// A close we did not initiate. Already-failed links stay as they are.
    pub fn on_close(&mut self) {
        if self.core.state() != LinkState::Error && self.core.is_enabled() {
            self.core.fail(LinkError::ConnectionLost);
        }
        self.socket = None;
    }

    pub fn on_silence(&mut self, timeout: Duration) {
        if self.core.state() == LinkState::Connected {
            self.core.fail(LinkError::HeartbeatTimeout(timeout));
            self.release_socket();
        }
    }

    /// Store `packet` and push it right away when connected.
    ///
    /// A socket that is not open for writing turns the link to `Error`
    /// instead of silently dropping the frame.
    pub fn set_robot_data(&mut self, packet: String, now: Instant) {
        self.core.store_packet(packet);
        if self.core.state() != LinkState::Connected {
            return;
        }
        let Some(socket) = self.socket.as_mut() else {
            return;
        };
        match socket.ready_state() {
            ReadyState::Open => match socket.send(self.core.data_packet()) {
                Ok(()) => self.last_send = Some(now),
                Err(e) => self.core.fail(e),
            },
            other => self.core.fail(LinkError::InvalidSocketState(other)),
        }
    }

    pub fn stop(&mut self) {
        self.core.set_enabled(false);
        self.release_socket();
        self.last_send = None;
        self.core.set_state(LinkState::Disconnected);
        self.core.set_response_data(None);
    }

    fn release_socket(&mut self) {
        if let Some(mut socket) = self.socket.take()
            && matches!(socket.ready_state(), ReadyState::Open | ReadyState::Connecting)
        {
            socket.close();
        }
    }
}

// ----------------------------------------------------------------------------
// SocketConnection
// ----------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind {
    Liveness,
    Reconnect,
}

/// [`SocketLink`] driven by a [`SocketConnector`] and the tokio timer.
pub struct SocketConnection {
    link: SocketLink,
    connector: Arc<dyn SocketConnector>,
    url: String,
    protocol: String,
    backoff: Duration,
    liveness: Option<Duration>,
    events: Option<SocketEvents>,
    timer: Option<(TimerKind, Pin<Box<Sleep>>)>,
}

impl SocketConnection {
    pub fn new(
        connector: Arc<dyn SocketConnector>,
        url: impl Into<String>,
        protocol: impl Into<String>,
        backoff: Duration,
        liveness: Option<Duration>,
    ) -> Self {
        Self {
            link: SocketLink::new(),
            connector,
            url: url.into(),
            protocol: protocol.into(),
            backoff,
            liveness,
            events: None,
            timer: None,
        }
    }

    pub fn core(&self) -> &LinkCore {
        self.link.core()
    }

    pub fn core_mut(&mut self) -> &mut LinkCore {
        self.link.core_mut()
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn start(&mut self) {
        if self.link.begin() {
            self.open();
        }
    }

    pub fn stop(&mut self) {
        self.link.stop();
        self.events = None;
        self.timer = None;
    }

    pub fn set_robot_data(&mut self, packet: String) {
        self.link.set_robot_data(packet, Instant::now());
        self.after_transition();
    }

    pub fn fail(&mut self, error: LinkError) {
        self.link.core_mut().fail(error);
        self.after_transition();
    }

    /// Wait for the next socket event or timer. Cancel safe.
    pub async fn next_event(&mut self) -> LinkEvent {
        tokio::select! {
            event = recv_event(&mut self.events) => match event {
                Some(event) => LinkEvent::Socket(event),
                None => {
                    self.events = None;
                    LinkEvent::Socket(SocketEvent::Closed)
                }
            },
            kind = timer_elapsed(&mut self.timer) => {
                self.timer = None;
                LinkEvent::TimerElapsed(kind)
            }
        }
    }

    pub fn handle_event(&mut self, event: LinkEvent) {
        match event {
            LinkEvent::Socket(SocketEvent::Open) => {
                self.link.on_open();
                self.arm_liveness();
            }
            LinkEvent::Socket(SocketEvent::Message(text)) => {
                self.link.on_message(text, Instant::now());
                self.arm_liveness();
            }
            LinkEvent::Socket(SocketEvent::Error(message)) => self.link.on_error(message),
            LinkEvent::Socket(SocketEvent::Closed) => self.link.on_close(),
            LinkEvent::TimerElapsed(TimerKind::Liveness) => {
                if let Some(timeout) = self.liveness {
                    self.link.on_silence(timeout);
                    self.events = None;
                }
            }
            LinkEvent::TimerElapsed(TimerKind::Reconnect) => {
                if self.link.core().is_enabled() && self.link.core().state() == LinkState::Error {
                    debug!(url = %self.url, "reconnecting socket");
                    self.open();
                }
            }
            LinkEvent::PollDue | LinkEvent::PollCompleted(_) => {}
        }
        self.after_transition();
    }

    fn open(&mut self) {
        let (socket, events) = self.connector.open(&self.url, &self.protocol);
        self.link.attach(socket);
        self.events = Some(events);
        self.timer = None;
    }

    fn arm_liveness(&mut self) {
        if let Some(timeout) = self.liveness
            && self.link.core().state() == LinkState::Connected
        {
            self.timer = Some((TimerKind::Liveness, Box::pin(tokio::time::sleep(timeout))));
        }
    }

    fn after_transition(&mut self) {
        let core = self.link.core();
        if !core.is_enabled() || core.state() != LinkState::Error {
            if matches!(self.timer, Some((TimerKind::Reconnect, _))) {
                self.timer = None;
            }
            return;
        }
        if !matches!(self.timer, Some((TimerKind::Reconnect, _))) {
            self.timer = Some((
                TimerKind::Reconnect,
                Box::pin(tokio::time::sleep(self.backoff)),
            ));
        }
    }
}

async fn recv_event(events: &mut Option<SocketEvents>) -> Option<SocketEvent> {
    match events {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

async fn timer_elapsed(timer: &mut Option<(TimerKind, Pin<Box<Sleep>>)>) -> TimerKind {
    match timer {
        Some((kind, sleep)) => {
            sleep.as_mut().await;
            *kind
        }
        None => std::future::pending().await,
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Socket whose ready state and outbox are shared with the test.
    #[derive(Clone, Default)]
    pub(crate) struct MockSocket {
        pub state: Arc<Mutex<Option<ReadyState>>>,
        pub sent: Arc<Mutex<Vec<String>>>,
        pub closes: Arc<AtomicUsize>,
    }

    impl MockSocket {
        pub fn set_ready(&self, state: ReadyState) {
            *self.state.lock().unwrap() = Some(state);
        }
    }

    impl DuplexSocket for MockSocket {
        fn ready_state(&self) -> ReadyState {
            let state = *self.state.lock().unwrap();
            state.unwrap_or(ReadyState::Connecting)
        }

        fn send(&mut self, text: &str) -> Result<(), LinkError> {
            self.sent.lock().unwrap().push(text.to_string());
            Ok(())
        }

        fn close(&mut self) {
            self.closes.fetch_add(1, Ordering::SeqCst);
            self.set_ready(ReadyState::Closed);
        }
    }

    /// Hands out one shared [`MockSocket`] and keeps each event sender.
    #[derive(Default)]
    pub(crate) struct MockConnector {
        pub socket: MockSocket,
        pub senders: Mutex<Vec<mpsc::UnboundedSender<SocketEvent>>>,
        pub opened: Mutex<Vec<(String, String)>>,
    }

    impl MockConnector {
        pub fn emit(&self, event: SocketEvent) {
            if let Some(tx) = self.senders.lock().unwrap().last() {
                let _ = tx.send(event);
            }
        }

        pub fn opens(&self) -> usize {
            self.opened.lock().unwrap().len()
        }
    }

    impl SocketConnector for MockConnector {
        fn open(&self, url: &str, protocol: &str) -> (Box<dyn DuplexSocket>, SocketEvents) {
            let (tx, rx) = mpsc::unbounded_channel();
            self.socket.set_ready(ReadyState::Connecting);
            self.senders.lock().unwrap().push(tx);
            self.opened
                .lock()
                .unwrap()
                .push((url.to_string(), protocol.to_string()));
            (Box::new(self.socket.clone()), rx)
        }
    }

    fn open_link() -> (SocketLink, MockSocket) {
        let socket = MockSocket::default();
        let mut link = SocketLink::new();
        assert!(link.begin());
        link.attach(Box::new(socket.clone()));
        socket.set_ready(ReadyState::Open);
        link.on_open();
        (link, socket)
    }

    // ------------------------------------------------------------------
    // SocketLink
    // ------------------------------------------------------------------

    #[test]
    fn begin_enters_connecting() {
        let mut link = SocketLink::new();
        assert!(link.begin());
        assert_eq!(link.core().state(), LinkState::Connecting);
        assert!(!link.begin());
    }

    #[test]
    fn packet_is_pushed_immediately_when_connected_and_open() {
        let (mut link, socket) = open_link();
        link.set_robot_data("{\"leftMotor\":\"0\"}".to_string(), Instant::now());
        assert_eq!(*socket.sent.lock().unwrap(), vec!["{\"leftMotor\":\"0\"}"]);
        assert_eq!(link.core().state(), LinkState::Connected);
    }

    #[test]
    fn packet_while_not_connected_is_stored_without_error() {
        let socket = MockSocket::default();
        let mut link = SocketLink::new();
        link.begin();
        link.attach(Box::new(socket.clone()));
        link.set_robot_data("1:2:3".to_string(), Instant::now());
        assert!(socket.sent.lock().unwrap().is_empty());
        assert_eq!(link.core().state(), LinkState::Connecting);
        assert_eq!(link.core().data_packet(), "1:2:3");
        assert!(link.core().last_error().is_none());
    }

    #[test]
    fn closing_socket_turns_send_into_invalid_state_error() {
        let (mut link, socket) = open_link();
        socket.set_ready(ReadyState::Closing);
        link.set_robot_data("x".to_string(), Instant::now());
        assert_eq!(link.core().state(), LinkState::Error);
        assert_eq!(
            link.core().last_error(),
            Some(&LinkError::InvalidSocketState(ReadyState::Closing))
        );
        assert!(socket.sent.lock().unwrap().is_empty());
    }

    #[test]
    fn message_records_response_and_ping_since_last_send() {
        let (mut link, _socket) = open_link();
        let sent_at = Instant::now();
        link.set_robot_data("p".to_string(), sent_at);
        link.on_message("ok".to_string(), sent_at + Duration::from_millis(12));
        assert_eq!(link.core().response_data(), Some("ok"));
        assert_eq!(link.core().ping(), Some(Duration::from_millis(12)));
    }

    #[test]
    fn heartbeat_does_not_touch_response_data() {
        let (mut link, _socket) = open_link();
        link.on_message("ok".to_string(), Instant::now());
        link.on_message(HEARTBEAT.to_string(), Instant::now());
        assert_eq!(link.core().response_data(), Some("ok"));
    }

    #[test]
    fn unexpected_close_is_a_lost_connection() {
        let (mut link, _socket) = open_link();
        link.on_message("ok".to_string(), Instant::now());
        link.on_close();
        assert_eq!(link.core().state(), LinkState::Error);
        assert_eq!(link.core().last_error(), Some(&LinkError::ConnectionLost));
        assert_eq!(link.core().response_data(), None);
        assert!(!link.has_socket());
    }

    #[test]
    fn close_after_error_keeps_the_original_error() {
        let (mut link, _socket) = open_link();
        link.on_error("reset by peer".to_string());
        link.on_close();
        assert_eq!(
            link.core().last_error(),
            Some(&LinkError::Socket("reset by peer".to_string()))
        );
    }

    #[test]
    fn stop_closes_open_socket_and_disconnects() {
        let (mut link, socket) = open_link();
        link.on_message("ok".to_string(), Instant::now());
        link.stop();
        link.stop();
        assert_eq!(socket.closes.load(Ordering::SeqCst), 1);
        assert_eq!(link.core().state(), LinkState::Disconnected);
        assert_eq!(link.core().response_data(), None);
    }

    // ------------------------------------------------------------------
    // SocketConnection
    // ------------------------------------------------------------------

    fn connection(
        liveness: Option<Duration>,
    ) -> (SocketConnection, Arc<MockConnector>) {
        let connector = Arc::new(MockConnector::default());
        let conn = SocketConnection::new(
            connector.clone(),
            "ws://robot/ws",
            "arduino",
            Duration::from_millis(1000),
            liveness,
        );
        (conn, connector)
    }

    async fn pump(conn: &mut SocketConnection) {
        let event = conn.next_event().await;
        conn.handle_event(event);
    }

    #[tokio::test(start_paused = true)]
    async fn start_opens_the_configured_endpoint() {
        let (mut conn, connector) = connection(None);
        conn.start();
        conn.start();
        assert_eq!(
            *connector.opened.lock().unwrap(),
            vec![("ws://robot/ws".to_string(), "arduino".to_string())]
        );
        connector.socket.set_ready(ReadyState::Open);
        connector.emit(SocketEvent::Open);
        pump(&mut conn).await;
        assert_eq!(conn.core().state(), LinkState::Connected);
    }

    #[tokio::test(start_paused = true)]
    async fn lost_socket_reconnects_after_backoff() {
        let (mut conn, connector) = connection(None);
        conn.start();
        connector.socket.set_ready(ReadyState::Open);
        connector.emit(SocketEvent::Open);
        pump(&mut conn).await;

        connector.emit(SocketEvent::Closed);
        pump(&mut conn).await;
        assert_eq!(conn.core().state(), LinkState::Error);

        let failed_at = Instant::now();
        while connector.opens() < 2 {
            pump(&mut conn).await;
        }
        assert!(Instant::now() - failed_at >= Duration::from_millis(1000));

        connector.socket.set_ready(ReadyState::Open);
        connector.emit(SocketEvent::Open);
        pump(&mut conn).await;
        assert_eq!(conn.core().state(), LinkState::Connected);
    }

    #[tokio::test(start_paused = true)]
    async fn silent_socket_fails_liveness() {
        let (mut conn, connector) = connection(Some(Duration::from_millis(2000)));
        conn.start();
        connector.socket.set_ready(ReadyState::Open);
        connector.emit(SocketEvent::Open);
        pump(&mut conn).await;

        tokio::time::sleep(Duration::from_millis(1500)).await;
        connector.emit(SocketEvent::Message(HEARTBEAT.to_string()));
        pump(&mut conn).await;
        assert_eq!(conn.core().state(), LinkState::Connected);

        let event = conn.next_event().await;
        assert_eq!(event, LinkEvent::TimerElapsed(TimerKind::Liveness));
        conn.handle_event(event);
        assert_eq!(conn.core().state(), LinkState::Error);
        assert_eq!(
            conn.core().last_error(),
            Some(&LinkError::HeartbeatTimeout(Duration::from_millis(2000)))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn stop_cancels_reconnect() {
        let (mut conn, connector) = connection(None);
        conn.start();
        connector.emit(SocketEvent::Error("refused".to_string()));
        pump(&mut conn).await;
        assert_eq!(conn.core().state(), LinkState::Error);
        conn.stop();
        assert_eq!(conn.core().state(), LinkState::Disconnected);

        let waited = tokio::time::timeout(Duration::from_secs(5), conn.next_event()).await;
        assert!(waited.is_err());
        assert_eq!(connector.opens(), 1);
    }
}
