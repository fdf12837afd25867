//! The uniform [`Connection`] front for both link strategies.
//!
//! A `Connection` is driven by its owner on a single task:
//!
//! ```text
//! loop {
//!     let event = connection.next_event().await;   // cancel safe
//!     connection.handle_event(event);              // runs to completion
//! }
//! ```
//!
//! `next_event` may sit inside a `tokio::select!` next to other sources.
//! Every in-flight request, socket channel and timer lives inside the
//! connection, so a dropped `next_event` future loses nothing.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use teleop_types::{LinkError, LinkState};

use crate::config::{LinkConfig, TransportKind};
use crate::state::LinkCore;
use crate::observer::SubscriptionId;
use crate::polling::PollingConnection;
use crate::socket::{SocketConnection, SocketEvent, TimerKind};
use crate::transport::{HttpTransport, WsConnector};

/// Something the connection has to react to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEvent {
    /// The delay before the next poll elapsed.
    PollDue,
    /// A poll attempt finished.
    PollCompleted(Result<String, LinkError>),
    /// The socket reported something.
    Socket(SocketEvent),
    /// A socket timer (liveness or reconnect) fired.
    TimerElapsed(TimerKind),
}

pub enum Connection {
    Polling(PollingConnection),
    Socket(SocketConnection),
}

impl Connection {
    /// Build the production transport selected by `config`.
    pub fn from_config(config: &LinkConfig) -> Self {
        match config.transport {
            TransportKind::Polling => Connection::Polling(PollingConnection::new(
                Arc::new(HttpTransport::new(config.control_url())),
                config.poll_schedule(),
            )),
            TransportKind::Socket => Connection::Socket(SocketConnection::new(
                Arc::new(WsConnector),
                config.socket_url(),
                config.protocol.clone(),
                config.backoff(),
                config.liveness_timeout(),
            )),
        }
    }

    pub fn transport(&self) -> TransportKind {
        match self {
            Connection::Polling(_) => TransportKind::Polling,
            Connection::Socket(_) => TransportKind::Socket,
        }
    }

    fn core(&self) -> &LinkCore {
        match self {
            Connection::Polling(c) => c.core(),
            Connection::Socket(c) => c.core(),
        }
    }

    fn core_mut(&mut self) -> &mut LinkCore {
        match self {
            Connection::Polling(c) => c.core_mut(),
            Connection::Socket(c) => c.core_mut(),
        }
    }

    /// Enter `Connecting` and begin talking to the robot. No-op while running.
    pub fn start(&mut self) {
        match self {
            Connection::Polling(c) => c.start(),
            Connection::Socket(c) => c.start(),
        }
    }

    /// Force `Disconnected` and clear the response. Idempotent.
    pub fn stop(&mut self) {
        match self {
            Connection::Polling(c) => c.stop(),
            Connection::Socket(c) => c.stop(),
        }
    }

    /// Buffer `packet` as the outbound payload. Polling sends it on the next
    /// attempt; a connected socket sends it now.
    ///
    /// Never fails: problems move the link to `Error` instead.
    pub fn set_robot_data(&mut self, packet: impl Into<String>) {
        let packet = packet.into();
        match self {
            Connection::Polling(c) => c.set_robot_data(packet),
            Connection::Socket(c) => c.set_robot_data(packet),
        }
    }

    /// Serialize `value` as JSON and buffer it like [`Self::set_robot_data`].
    pub fn set_robot_data_json<T: Serialize + ?Sized>(&mut self, value: &T) {
        match serde_json::to_string(value) {
            Ok(packet) => self.set_robot_data(packet),
            Err(e) => self.fail(LinkError::Serialization(e.to_string())),
        }
    }

    fn fail(&mut self, error: LinkError) {
        match self {
            Connection::Polling(c) => c.fail(error),
            Connection::Socket(c) => c.fail(error),
        }
    }

    pub fn state(&self) -> LinkState {
        self.core().state()
    }

    pub fn is_enabled(&self) -> bool {
        self.core().is_enabled()
    }

    pub fn last_error(&self) -> Option<&LinkError> {
        self.core().last_error()
    }

    pub fn response_data(&self) -> Option<&str> {
        self.core().response_data()
    }

    pub fn data_packet(&self) -> &str {
        self.core().data_packet()
    }

    pub fn ping(&self) -> Option<Duration> {
        self.core().ping()
    }

    pub fn on_state_change<F>(&mut self, observer: F) -> SubscriptionId
    where
        F: FnMut(LinkState, LinkState) + Send + 'static,
    {
        self.core_mut().on_state_change(Box::new(observer))
    }

    pub fn on_response_data<F>(&mut self, observer: F) -> SubscriptionId
    where
        F: FnMut(Option<&str>) + Send + 'static,
    {
        self.core_mut().on_response_data(Box::new(observer))
    }

    /// Observe every contained failure, not only the move into `Error`.
    pub fn on_link_error<F>(&mut self, observer: F) -> SubscriptionId
    where
        F: FnMut(&LinkError) + Send + 'static,
    {
        self.core_mut().on_error(Box::new(observer))
    }

    pub fn unsubscribe_state(&mut self, id: SubscriptionId) -> bool {
        self.core_mut().unsubscribe_state(id)
    }

    pub fn unsubscribe_response(&mut self, id: SubscriptionId) -> bool {
        self.core_mut().unsubscribe_response(id)
    }

    pub fn unsubscribe_error(&mut self, id: SubscriptionId) -> bool {
        self.core_mut().unsubscribe_error(id)
    }

    /// Wait for the next transport event. Cancel safe.
    pub async fn next_event(&mut self) -> LinkEvent {
        match self {
            Connection::Polling(c) => c.next_event().await,
            Connection::Socket(c) => c.next_event().await,
        }
    }

    pub fn handle_event(&mut self, event: LinkEvent) {
        match self {
            Connection::Polling(c) => c.handle_event(event),
            Connection::Socket(c) => c.handle_event(event),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::polling::PollSchedule;
    use crate::polling::tests::ScriptedTransport;
    use crate::socket::tests::MockConnector;
    use std::collections::BTreeMap;
    use std::sync::Mutex;
    use teleop_types::ReadyState;

    fn socket_connection() -> (Connection, Arc<MockConnector>) {
        let connector = Arc::new(MockConnector::default());
        let conn = Connection::Socket(SocketConnection::new(
            connector.clone(),
            "ws://robot/ws",
            "arduino",
            Duration::from_millis(1000),
            None,
        ));
        (conn, connector)
    }

    async fn pump(conn: &mut Connection) {
        let event = conn.next_event().await;
        conn.handle_event(event);
    }

    #[test]
    fn from_config_picks_transport() {
        let polling = LinkConfig {
            transport: TransportKind::Polling,
            ..LinkConfig::default()
        };
        assert_eq!(Connection::from_config(&polling).transport(), TransportKind::Polling);
        assert_eq!(
            Connection::from_config(&LinkConfig::default()).transport(),
            TransportKind::Socket
        );
    }

    #[tokio::test(start_paused = true)]
    async fn error_recovery_is_visible_to_state_observers() {
        let transport = Arc::new(ScriptedTransport::new(
            vec![Err(LinkError::Transport("refused".to_string()))],
            Duration::ZERO,
        ));
        let mut conn = Connection::Polling(PollingConnection::new(transport, PollSchedule::default()));
        let recovered = Arc::new(Mutex::new(false));
        let flag = Arc::clone(&recovered);
        conn.on_state_change(move |new, old| {
            if old == LinkState::Error && new != LinkState::Error {
                *flag.lock().unwrap() = true;
            }
        });

        conn.start();
        pump(&mut conn).await;
        assert_eq!(conn.state(), LinkState::Error);
        assert!(!*recovered.lock().unwrap());

        pump(&mut conn).await;
        pump(&mut conn).await;
        assert_eq!(conn.state(), LinkState::Connected);
        assert!(*recovered.lock().unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn stop_always_lands_disconnected_without_response() {
        let (mut conn, connector) = socket_connection();
        conn.stop();
        assert_eq!(conn.state(), LinkState::Disconnected);

        conn.start();
        connector.socket.set_ready(ReadyState::Open);
        connector.emit(SocketEvent::Open);
        pump(&mut conn).await;
        connector.emit(SocketEvent::Message("ok".to_string()));
        pump(&mut conn).await;
        assert_eq!(conn.response_data(), Some("ok"));

        conn.stop();
        assert_eq!(conn.state(), LinkState::Disconnected);
        assert_eq!(conn.response_data(), None);
        assert!(!conn.is_enabled());
    }

    #[tokio::test(start_paused = true)]
    async fn structured_packet_is_serialized_and_sent() {
        let (mut conn, connector) = socket_connection();
        conn.start();
        connector.socket.set_ready(ReadyState::Open);
        connector.emit(SocketEvent::Open);
        pump(&mut conn).await;

        let mut packet = BTreeMap::new();
        packet.insert("leftMotor", "512");
        packet.insert("rightMotor", "-512");
        conn.set_robot_data_json(&packet);
        assert_eq!(
            *connector.socket.sent.lock().unwrap(),
            vec![r#"{"leftMotor":"512","rightMotor":"-512"}"#.to_string()]
        );
    }

    #[test]
    fn unserializable_packet_is_contained_as_error() {
        let (mut conn, _connector) = socket_connection();
        let mut bad = BTreeMap::new();
        bad.insert(vec![1u8], 1);
        conn.set_robot_data_json(&bad);
        assert_eq!(conn.state(), LinkState::Error);
        assert!(matches!(conn.last_error(), Some(LinkError::Serialization(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn response_observer_receives_inbound_payloads() {
        let (mut conn, connector) = socket_connection();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        conn.on_response_data(move |data| sink.lock().unwrap().push(data.map(str::to_string)));
        conn.start();
        connector.socket.set_ready(ReadyState::Open);
        connector.emit(SocketEvent::Open);
        connector.emit(SocketEvent::Message("{\"bumper\":1}".to_string()));
        pump(&mut conn).await;
        pump(&mut conn).await;
        assert_eq!(
            *seen.lock().unwrap(),
            vec![Some("{\"bumper\":1}".to_string())]
        );
    }
}
