use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// How device outputs are assembled into one outbound packet.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "format", rename_all = "lowercase")]
pub enum PacketFormat {
    /// `{"<device>": "<value>", ...}`
    #[default]
    Json,
    /// `v1:v2:...` in channel order, `0` for unknown channels.
    Legacy { channels: Vec<String> },
}

/// An assembled packet, ready for the link.
#[derive(Debug, Clone, PartialEq)]
pub enum Packet {
    Json(Map<String, Value>),
    Text(String),
}
