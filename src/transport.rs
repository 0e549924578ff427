//! Outbound chat request and the streamed response body.

use std::future::Future;
use std::pin::Pin;

use bytes::Bytes;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tokio_stream::{Stream, StreamExt};
use tracing::{debug, info};

use crate::config::WidgetConfig;
use crate::error::{Result, WidgetError};

/// Response body as it arrives off the wire.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

/// JSON body of the outbound request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatRequest {
    pub message: String,
}

/// Sends one user message and hands back the response body.
///
/// Implementations must fail with an error for which
/// [`WidgetError::is_request_failure`] holds when no usable body exists.
pub trait Transport {
    fn send(&self, message: &str) -> impl Future<Output = Result<ByteStream>> + Send;
}

/// `reqwest`-backed transport posting to the configured endpoint.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    endpoint_url: String,
}

impl HttpTransport {
    pub fn new(config: &WidgetConfig) -> Self {
        Self::with_client(Client::new(), config)
    }

    pub fn with_client(client: Client, config: &WidgetConfig) -> Self {
        Self {
            client,
            endpoint_url: config.endpoint_url().to_string(),
        }
    }

    pub fn endpoint_url(&self) -> &str {
        &self.endpoint_url
    }
}

impl Transport for HttpTransport {
    async fn send(&self, message: &str) -> Result<ByteStream> {
        let request = ChatRequest {
            message: message.to_string(),
        };

        debug!(url = %self.endpoint_url, len = message.len(), "posting chat message");
        let response = self
            .client
            .post(&self.endpoint_url)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| WidgetError::Request {
                url: self.endpoint_url.clone(),
                detail: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(WidgetError::Status {
                status: status.as_u16(),
                url: self.endpoint_url.clone(),
            });
        }

        // Null-body statuses. A 200 with an empty body still streams (and
        // yields no events).
        if matches!(status, StatusCode::NO_CONTENT | StatusCode::RESET_CONTENT) {
            return Err(WidgetError::NoBody);
        }

        info!(url = %self.endpoint_url, status = status.as_u16(), "response streaming");
        let body = response.bytes_stream().map(|chunk| {
            chunk.map_err(|e| WidgetError::Stream {
                detail: e.to_string(),
            })
        });
        Ok(Box::pin(body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_request_shape() {
        let json = serde_json::to_string(&ChatRequest { message: "hello".into() }).unwrap();
        assert_eq!(json, r#"{"message":"hello"}"#);
    }

    #[test]
    fn test_http_transport_uses_config_endpoint() {
        let cfg = WidgetConfig::new("http://127.0.0.1:9/chat").unwrap();
        let t = HttpTransport::new(&cfg);
        assert_eq!(t.endpoint_url(), "http://127.0.0.1:9/chat");
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_request_failure() {
        // Port 9 (discard) is closed on test hosts; the connect fails fast.
        let cfg = WidgetConfig::new("http://127.0.0.1:9/chat").unwrap();
        let err = match HttpTransport::new(&cfg).send("hi").await {
            Ok(_) => panic!("expected connection failure"),
            Err(e) => e,
        };
        assert!(err.is_request_failure());
        assert!(matches!(err, WidgetError::Request { .. }));
    }
}
