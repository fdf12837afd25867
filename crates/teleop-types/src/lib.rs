use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Lifecycle state of the link to the robot.
///
/// Every transport reports through the same four states so the UI never needs
/// to know which transport is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum LinkState {
    /// Not started, or stopped by the operator.
    #[default]
    Disconnected,
    /// `start()` was called and no exchange has completed yet.
    Connecting,
    /// The last exchange (poll or socket open) succeeded.
    Connected,
    /// The last exchange failed; the transport keeps retrying at the backoff
    /// interval.
    Error,
}

impl fmt::Display for LinkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkState::Disconnected => write!(f, "Disconnected"),
            LinkState::Connecting => write!(f, "Connecting"),
            LinkState::Connected => write!(f, "Connected"),
            LinkState::Error => write!(f, "Error"),
        }
    }
}

/// Write-readiness of a duplex socket, mirroring the four WebSocket ready
/// states plus a catch-all for values a socket implementation cannot map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReadyState {
    Connecting,
    Open,
    Closing,
    Closed,
    Unknown,
}

impl fmt::Display for ReadyState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReadyState::Connecting => write!(f, "CONNECTING"),
            ReadyState::Open => write!(f, "OPEN"),
            ReadyState::Closing => write!(f, "CLOSING"),
            ReadyState::Closed => write!(f, "CLOSED"),
            ReadyState::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

/// Transport-level failures.
///
/// These never escape a `Connection`: they are recorded as `last_error` and
/// surfaced through the `Error` link state.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LinkError {
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Robot answered with HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Transport failure: {0}")]
    Transport(String),

    #[error("Invalid socket state: {0}")]
    InvalidSocketState(ReadyState),

    #[error("Socket error: {0}")]
    Socket(String),

    #[error("Connection lost")]
    ConnectionLost,

    #[error("No heartbeat received for {0:?}")]
    HeartbeatTimeout(Duration),

    #[error("Packet serialization failed: {0}")]
    Serialization(String),
}

/// Setup and configuration errors raised outside the link.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TeleopError {
    #[error("Control already exists: {0}")]
    DuplicateControl(String),

    #[error("Device already exists: {0}")]
    DuplicateDevice(String),

    #[error("Invalid dimension '{0}'")]
    InvalidDimension(String),

    #[error("Unknown device: {0}")]
    UnknownDevice(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Operator loop failed: {0}")]
    Loop(String),
}

/// Category of a problem shown to the operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum IssueKind {
    /// Transport failure, timeout, invalid socket state, serialization.
    Link,
    /// Duplicate names, missing or invalid device configuration.
    Setup,
    /// Malformed inbound payload.
    Data,
    /// The operator loop returned an error.
    Loop,
}

impl fmt::Display for IssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IssueKind::Link => write!(f, "LINK"),
            IssueKind::Setup => write!(f, "SETUP"),
            IssueKind::Data => write!(f, "DATA"),
            IssueKind::Loop => write!(f, "LOOP"),
        }
    }
}

/// A single operator-visible problem. Collected into lists rather than raised.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub kind: IssueKind,
    pub message: String,
}

impl Issue {
    pub fn new(kind: IssueKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn setup(message: impl Into<String>) -> Self {
        Self::new(IssueKind::Setup, message)
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.kind, self.message)
    }
}

/// Identity of one pointer on the touch surface.
///
/// A mouse behaves like a single touch with a reserved identifier so the
/// capture logic never needs a separate code path for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TouchId {
    Mouse,
    Finger(i64),
}

impl fmt::Display for TouchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TouchId::Mouse => write!(f, "mouse"),
            TouchId::Finger(id) => write!(f, "{id}"),
        }
    }
}
