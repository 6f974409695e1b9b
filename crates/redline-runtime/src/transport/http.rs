//! HTTP transport to the agent backend.

use std::time::Duration;

use async_trait::async_trait;
use futures::{StreamExt, TryStreamExt};
use redline_settings::ServerSettings;
use tracing::{debug, instrument};

use super::{AgentTransport, ByteStream, SubmitRequest};
use crate::errors::TransportError;

/// [`AgentTransport`] over plain HTTP POSTs.
///
/// Control endpoints (`setup`, `cancel`, `clear`) are bounded by the request
/// timeout. The prompt request is not: its body streams for as long as the
/// agent works.
pub struct HttpTransport {
    client: reqwest::Client,
    server: ServerSettings,
}

impl HttpTransport {
    /// Build a transport for the configured backend.
    pub fn new(server: ServerSettings) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_millis(server.connect_timeout_ms))
            .build()?;
        Ok(Self { client, server })
    }

    /// Base URL requests are sent to.
    pub fn base_url(&self) -> &str {
        &self.server.base_url
    }

    async fn post_control(&self, path: &str) -> Result<(), TransportError> {
        let response = self
            .client
            .post(self.server.url(path))
            .timeout(Duration::from_millis(self.server.request_timeout_ms))
            .send()
            .await?;
        check_status(path, &response)?;
        debug!(path, status = response.status().as_u16(), "control request ok");
        Ok(())
    }
}

fn check_status(path: &str, response: &reqwest::Response) -> Result<(), TransportError> {
    let status = response.status();
    if status.is_success() {
        Ok(())
    } else {
        Err(TransportError::Status {
            endpoint: path.to_string(),
            status: status.as_u16(),
        })
    }
}

#[async_trait]
impl AgentTransport for HttpTransport {
    #[instrument(skip(self), fields(base_url = %self.server.base_url))]
    async fn setup(&self) -> Result<(), TransportError> {
        self.post_control(&self.server.setup_path).await
    }

    #[instrument(skip_all, fields(query_len = request.query.len()))]
    async fn submit(&self, request: &SubmitRequest) -> Result<ByteStream, TransportError> {
        let path = &self.server.message_path;
        let response = self
            .client
            .post(self.server.url(path))
            .json(request)
            .send()
            .await?;
        check_status(path, &response)?;
        debug!(status = response.status().as_u16(), "prompt accepted, streaming");
        Ok(response.bytes_stream().map_err(TransportError::from).boxed())
    }

    #[instrument(skip(self))]
    async fn cancel(&self) -> Result<(), TransportError> {
        self.post_control(&self.server.cancel_path).await
    }

    #[instrument(skip(self))]
    async fn clear_context(&self) -> Result<(), TransportError> {
        self.post_control(&self.server.clear_path).await
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
