//! Network primitives behind the two link strategies.
//!
//! | Primitive | Trait | Production implementation |
//! |---|---|---|
//! | One request/response exchange | [`RequestTransport`] | [`HttpTransport`] (`reqwest` PUT) |
//! | Persistent duplex text stream | [`SocketConnector`](crate::socket::SocketConnector) | [`WsConnector`] (`tokio-tungstenite`) |

pub mod http;
pub mod ws;

use async_trait::async_trait;
use teleop_types::LinkError;

pub use http::HttpTransport;
pub use ws::WsConnector;

/// Performs one request/response exchange carrying `body`.
///
/// Implementations report success only for a 2xx answer and return its body.
/// Timeouts are applied by the caller.
#[async_trait]
pub trait RequestTransport: Send + Sync {
    async fn put(&self, body: String) -> Result<String, LinkError>;
}
