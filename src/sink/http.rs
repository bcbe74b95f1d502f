use std::time::Duration;

use reqwest::Client;
use tracing::{debug, error};

use crate::config::SinkConfig;
use crate::dispatch::iterate_batched_send;
use crate::error::SinkError;
use crate::message::{Message, Part};
use crate::sink::SinkWriter;

const SEND_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConnState {
    Disconnected,
    Connected,
    Closed,
}

/// HTTP sink that delivers each part of a batch as one NDJSON line.
///
/// Parts are posted individually so that a rejection attributes to its exact
/// index; connection-level failures (timeout, refused connection) surface as
/// the fatal error kinds and abort the batch.
pub struct HttpSink {
    client: Client,
    endpoint: String,
    token: String,
    state: ConnState,
}

impl HttpSink {
    /// Create a new sink against `endpoint` with bearer-token auth.
    /// Returns an error if the HTTP client fails to build (e.g., TLS
    /// configuration issues).
    pub fn new(endpoint: String, token: String) -> Result<Self, SinkError> {
        Self::with_timeout(endpoint, token, SEND_TIMEOUT)
    }

    pub fn with_timeout(
        endpoint: String,
        token: String,
        timeout: Duration,
    ) -> Result<Self, SinkError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SinkError::Network(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            endpoint,
            token,
            state: ConnState::Disconnected,
        })
    }

    pub fn from_config(config: &SinkConfig) -> Result<Self, SinkError> {
        Self::with_timeout(
            config.endpoint.clone(),
            config.token.clone(),
            config.timeout(),
        )
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Send one batch through the dispatch loop, one POST per part.
    #[tracing::instrument(
        name = "sink_write",
        skip(self, msg),
        fields(
            endpoint = %self.endpoint,
            parts = msg.len(),
        )
    )]
    async fn send_batch(&self, msg: &Message) -> Result<(), SinkError> {
        debug!(parts = msg.len(), "sending batch to sink");
        iterate_batched_send(msg, move |index, part| self.send_part(index, part)).await
    }

    async fn send_part(&self, index: usize, part: Part) -> Result<(), SinkError> {
        debug!(index, bytes = part.len(), "sending part");

        let response = self
            .client
            .post(&self.endpoint)
            .header("Content-Type", "application/x-ndjson")
            .header("Authorization", format!("Bearer {}", self.token))
            .body(part.into_bytes())
            .send()
            .await
            .map_err(classify_transport_error)?;

        let status = response.status().as_u16();
        if !(200..300).contains(&status) {
            // Try to get response body for better error diagnostics
            let resp_body = response
                .text()
                .await
                .unwrap_or_else(|_| "(failed to read body)".to_string());
            error!(
                endpoint = %self.endpoint,
                index,
                status,
                response_body = %resp_body,
                "sink returned error status"
            );
            return Err(SinkError::Http {
                status,
                endpoint: self.endpoint.clone(),
            });
        }

        Ok(())
    }
}

/// Map a transport failure to the error taxonomy. Elapsed deadlines and
/// refused connections classify as the fatal kinds; everything else is a
/// per-part network error.
fn classify_transport_error(err: reqwest::Error) -> SinkError {
    if err.is_timeout() {
        SinkError::Timeout
    } else if err.is_connect() {
        SinkError::NotConnected
    } else {
        SinkError::Network(err.to_string())
    }
}

#[async_trait::async_trait]
impl SinkWriter for HttpSink {
    async fn connect(&mut self) -> Result<(), SinkError> {
        if self.state == ConnState::Closed {
            return Err(SinkError::Closed);
        }

        let health_url = format!("{}/health", self.endpoint.trim_end_matches('/'));
        let response = self
            .client
            .get(&health_url)
            .send()
            .await
            .map_err(classify_transport_error)?;

        if !response.status().is_success() {
            return Err(SinkError::Network(format!(
                "health probe returned HTTP {}",
                response.status().as_u16()
            )));
        }

        self.state = ConnState::Connected;
        debug!(endpoint = %self.endpoint, "sink connected");
        Ok(())
    }

    async fn write(&mut self, msg: &Message) -> Result<(), SinkError> {
        match self.state {
            ConnState::Closed => return Err(SinkError::Closed),
            ConnState::Disconnected => return Err(SinkError::NotConnected),
            ConnState::Connected => {}
        }

        let result = self.send_batch(msg).await;
        if let Err(ref err) = result {
            // A connection-level failure invalidates the session until the
            // caller reconnects.
            if err.is_fatal() {
                self.state = ConnState::Disconnected;
            }
        }
        result
    }

    async fn close(&mut self) -> Result<(), SinkError> {
        self.state = ConnState::Closed;
        Ok(())
    }
}
