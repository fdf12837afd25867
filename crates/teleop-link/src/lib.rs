//! Robot link: one state machine, two transports.
//!
//! The UI only ever sees a [`Connection`] in one of four [`LinkState`]s. How
//! packets reach the robot is a configuration detail:
//!
//! | Strategy | Module | Wire |
//! |---|---|---|
//! | Repeated request | [`polling`] | `PUT <host>/control`, body = packet, 2xx body = response |
//! | Persistent socket | [`socket`] | WebSocket `<host>/ws`, sub-protocol `arduino`, text frames |
//!
//! Transport failures never escape. They are recorded as
//! [`Connection::last_error`] and reported as a transition to
//! [`LinkState::Error`] through [`Connection::on_state_change`].
//!
//! [`LinkState`]: teleop_types::LinkState
//! [`LinkState::Error`]: teleop_types::LinkState::Error

pub mod config;
pub mod connection;
pub mod state;
pub mod observer;
pub mod polling;
pub mod socket;
pub mod transport;

pub use config::{LinkConfig, TransportKind};
pub use connection::{Connection, LinkEvent};
pub use observer::SubscriptionId;
pub use polling::{PollSchedule, PollingConnection};
pub use socket::{HEARTBEAT, SocketConnection, SocketEvent};
