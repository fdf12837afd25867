use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use teleop_types::TeleopError;

use crate::polling::PollSchedule;

/// Which link strategy a session uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    #[default]
    Socket,
    Polling,
}

impl FromStr for TransportKind {
    type Err = TeleopError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "socket" | "websocket" | "ws" => Ok(TransportKind::Socket),
            "polling" | "http" | "ajax" => Ok(TransportKind::Polling),
            other => Err(TeleopError::Config(format!("unknown transport '{other}'"))),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_control_path() -> String {
    "/control".to_string()
}

fn default_socket_path() -> String {
    "/ws".to_string()
}

fn default_protocol() -> String {
    "arduino".to_string()
}

fn default_request_timeout_ms() -> u64 {
    500
}

fn default_poll_interval_ms() -> u64 {
    50
}

fn default_backoff_ms() -> u64 {
    1000
}

/// Where the robot lives and how often to talk to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkConfig {
    #[serde(default)]
    pub transport: TransportKind,
    /// `host:port` of the robot.
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_control_path")]
    pub control_path: String,
    #[serde(default = "default_socket_path")]
    pub socket_path: String,
    /// Sub-protocol token sent when opening the socket.
    #[serde(default = "default_protocol")]
    pub protocol: String,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,
    /// Fail a silent socket after this long. Disabled when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub liveness_timeout_ms: Option<u64>,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            transport: TransportKind::default(),
            host: default_host(),
            control_path: default_control_path(),
            socket_path: default_socket_path(),
            protocol: default_protocol(),
            request_timeout_ms: default_request_timeout_ms(),
            poll_interval_ms: default_poll_interval_ms(),
            backoff_ms: default_backoff_ms(),
            liveness_timeout_ms: None,
        }
    }
}

impl LinkConfig {
    pub fn control_url(&self) -> String {
        format!("http://{}{}", self.host, self.control_path)
    }

    pub fn socket_url(&self) -> String {
        format!("ws://{}{}", self.host, self.socket_path)
    }

    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }

    pub fn liveness_timeout(&self) -> Option<Duration> {
        self.liveness_timeout_ms.map(Duration::from_millis)
    }

    pub fn poll_schedule(&self) -> PollSchedule {
        PollSchedule {
            timeout: Duration::from_millis(self.request_timeout_ms),
            interval: Duration::from_millis(self.poll_interval_ms),
            backoff: self.backoff(),
        }
    }
}
