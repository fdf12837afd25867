use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use teleop_types::LinkError;
use tracing::trace;

use super::RequestTransport;

/// `PUT`s each packet as `text/plain` to a fixed control URL.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    url: String,
}

impl HttpTransport {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl RequestTransport for HttpTransport {
    async fn put(&self, body: String) -> Result<String, LinkError> {
        trace!(url = %self.url, bytes = body.len(), "PUT packet");
        let response = self
            .client
            .put(&self.url)
            .header(CONTENT_TYPE, "text/plain")
            .body(body)
            .send()
            .await
            .map_err(|e| LinkError::Transport(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| LinkError::Transport(e.to_string()))?;

        if status.is_success() {
            Ok(text)
        } else {
            Err(LinkError::Status {
                status: status.as_u16(),
                body: text,
            })
        }
    }
}
