//! HTTP Backend
//!
//! Posts the request body to the chat endpoint and hands the response body
//! to [`EventStream`] for decoding.

use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use tokio_util::sync::CancellationToken;

use super::error::{error_field, TransportError};
use super::request::ChatRequest;
use super::stream::{ByteStream, EventStream};
use super::ChatBackend;
use crate::config::ClientConfig;

/// Chat backend that talks to the relay over HTTP
#[derive(Clone, Debug)]
pub struct HttpBackend {
    /// Full URL of the chat endpoint
    endpoint: String,
    /// HTTP client
    http_client: reqwest::Client,
}

impl HttpBackend {
    /// Create a backend for an endpoint.
    ///
    /// Only connection establishment is bounded by `connect_timeout`; a reply
    /// may stream for as long as the model keeps generating.
    pub fn new(endpoint: impl Into<String>, connect_timeout: Duration) -> anyhow::Result<Self> {
        let http_client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .build()?;

        Ok(Self {
            endpoint: endpoint.into(),
            http_client,
        })
    }

    /// Create from client configuration
    pub fn from_config(config: &ClientConfig) -> anyhow::Result<Self> {
        Self::new(config.endpoint.clone(), config.connect_timeout)
    }

    /// Get the endpoint URL
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Health URL on the same host as the endpoint
    fn health_url(&self) -> Option<reqwest::Url> {
        reqwest::Url::parse(&self.endpoint)
            .and_then(|url| url.join("/health"))
            .ok()
    }

    /// Open the response body
    async fn connect(&self, request: &ChatRequest) -> Result<ByteStream, TransportError> {
        let response = self
            .http_client
            .post(&self.endpoint)
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .json(request)
            .send()
            .await
            .map_err(|e| TransportError::Connect {
                endpoint: self.endpoint.clone(),
                detail: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.bytes().await.unwrap_or_default();
            return Err(TransportError::Status {
                status: status.as_u16(),
                message: error_field(&body),
            });
        }

        let endpoint = self.endpoint.clone();
        let body = response.bytes_stream().map(move |chunk| {
            chunk.map_err(|e| TransportError::Stream {
                endpoint: endpoint.clone(),
                detail: e.to_string(),
            })
        });

        Ok(Box::pin(body))
    }
}

#[async_trait]
impl ChatBackend for HttpBackend {
    fn name(&self) -> &str {
        "HTTP"
    }

    async fn open_stream(&self, request: ChatRequest, cancel: CancellationToken) -> EventStream {
        tracing::debug!(
            endpoint = %self.endpoint,
            messages = request.messages.len(),
            "Opening chat stream"
        );

        let result = tokio::select! {
            biased;
            () = cancel.cancelled() => Err(TransportError::Cancelled),
            result = self.connect(&request) => result,
        };

        match result {
            Ok(body) => EventStream::new(body, cancel),
            Err(e) => {
                tracing::warn!(endpoint = %self.endpoint, error = %e, "Chat request failed");
                EventStream::failed(&e)
            }
        }
    }

    async fn health_check(&self) -> bool {
        let Some(url) = self.health_url() else {
            return false;
        };

        self.http_client
            .get(url)
            .timeout(Duration::from_secs(5))
            .send()
            .await
            .is_ok_and(|r| r.status().is_success())
    }
}
