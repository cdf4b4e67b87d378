//! Ollama Engine
//!
//! Inference engine backed by a local Ollama server.
//!
//! # Ollama API
//!
//! - `/api/generate` - Generate completions (streaming or batch)
//! - `/api/tags` - List available models (used as the health probe)
//!
//! Streaming responses are newline-delimited JSON objects:
//!
//! ```text
//! {"model":"llama3.2","response":"Hel","done":false}
//! {"model":"llama3.2","response":"lo","done":false}
//! {"model":"llama3.2","response":"","done":true,"eval_count":2}
//! ```

use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use serde::Deserialize;
use tokio::sync::mpsc;

use super::{EngineError, EngineEvent, InferenceEngine, QueryOptions};

/// Events buffered between the HTTP reader and the relay
const CHANNEL_CAPACITY: usize = 100;

/// One line of Ollama's generate output
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct GenerateChunk {
    response: Option<String>,
    thinking: Option<String>,
    done: bool,
    error: Option<String>,
}

impl GenerateChunk {
    fn into_events(self) -> Vec<EngineEvent> {
        if let Some(error) = self.error {
            return vec![EngineEvent::Error(error)];
        }

        let mut events = Vec::new();
        if self.thinking.is_some_and(|t| !t.is_empty()) {
            events.push(EngineEvent::Other {
                kind: "thinking".to_string(),
            });
        }
        if let Some(text) = self.response.filter(|t| !t.is_empty()) {
            events.push(EngineEvent::TextDelta(text));
        }
        if self.done {
            events.push(EngineEvent::Result);
        }
        events
    }
}

/// Splits newline-delimited JSON into complete lines
#[derive(Debug, Default)]
struct LineBuffer {
    buffer: Vec<u8>,
}

impl LineBuffer {
    /// Append a chunk and return every line it completes
    fn push(&mut self, chunk: &[u8]) -> Vec<Vec<u8>> {
        self.buffer.extend_from_slice(chunk);

        let mut lines = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            lines.push(line);
        }
        lines
    }

    /// Whatever is left once the stream ends
    fn take_rest(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.buffer)
    }
}

/// Decode one line into engine events; blank and unparseable lines yield none
fn decode_line(line: &[u8]) -> Vec<EngineEvent> {
    let line = line.trim_ascii();
    if line.is_empty() {
        return Vec::new();
    }

    match serde_json::from_slice::<GenerateChunk>(line) {
        Ok(chunk) => chunk.into_events(),
        Err(e) => {
            tracing::warn!(
                error = %e,
                line = %String::from_utf8_lossy(line),
                "Skipping unparseable Ollama output"
            );
            Vec::new()
        }
    }
}

/// Ollama engine client
#[derive(Clone, Debug)]
pub struct OllamaEngine {
    /// Host address
    host: String,
    /// Port number
    port: u16,
    /// Model to generate with
    model: String,
    /// HTTP client
    http_client: reqwest::Client,
}

impl OllamaEngine {
    /// Create a new Ollama engine
    pub fn new(
        host: impl Into<String>,
        port: u16,
        model: impl Into<String>,
    ) -> anyhow::Result<Self> {
        let http_client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            host: host.into(),
            port,
            model: model.into(),
            http_client,
        })
    }

    /// Get the model name
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Get the base URL
    fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }

    /// Get generate endpoint URL
    fn generate_url(&self) -> String {
        format!("{}/api/generate", self.base_url())
    }

    /// Get tags endpoint URL
    fn tags_url(&self) -> String {
        format!("{}/api/tags", self.base_url())
    }

    fn request_body(&self, prompt: &str, options: &QueryOptions) -> serde_json::Value {
        let mut body = serde_json::json!({
            "model": self.model,
            "prompt": prompt,
            "stream": options.streaming_enabled,
        });
        if let Some(ref system) = options.system_prompt {
            body["system"] = serde_json::json!(system);
        }
        body
    }
}

#[async_trait]
impl InferenceEngine for OllamaEngine {
    fn name(&self) -> &str {
        "Ollama"
    }

    async fn health_check(&self) -> bool {
        self.http_client
            .get(self.tags_url())
            .timeout(Duration::from_secs(5))
            .send()
            .await
            .is_ok_and(|r| r.status().is_success())
    }

    async fn query(
        &self,
        prompt: &str,
        options: &QueryOptions,
    ) -> anyhow::Result<mpsc::Receiver<EngineEvent>> {
        if !options.allowed_tools.is_empty() {
            tracing::debug!(
                tools = ?options.allowed_tools,
                "Ollama generate does not support tools; ignoring"
            );
        }

        let response = self
            .http_client
            .post(self.generate_url())
            .json(&self.request_body(prompt, options))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.bytes().await.unwrap_or_default();
            let message = serde_json::from_slice::<GenerateChunk>(&body)
                .ok()
                .and_then(|c| c.error)
                .unwrap_or_else(|| format!("Ollama returned {status}"));
            return Err(EngineError::Rejected {
                status: status.as_u16(),
                message,
            }
            .into());
        }

        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);

        if !options.streaming_enabled {
            let chunk: GenerateChunk = response.json().await?;
            tokio::spawn(async move {
                for event in chunk.into_events() {
                    if tx.send(event).await.is_err() {
                        return;
                    }
                }
            });
            return Ok(rx);
        }

        let mut stream = response.bytes_stream();

        tokio::spawn(async move {
            let mut lines = LineBuffer::default();

            while let Some(chunk) = stream.next().await {
                match chunk {
                    Ok(bytes) => {
                        for line in lines.push(&bytes) {
                            for event in decode_line(&line) {
                                let finished =
                                    matches!(event, EngineEvent::Result | EngineEvent::Error(_));
                                if tx.send(event).await.is_err() {
                                    // Receiver dropped, stop streaming
                                    return;
                                }
                                if finished {
                                    return;
                                }
                            }
                        }
                    }
                    Err(e) => {
                        let _ = tx.send(EngineEvent::Error(e.to_string())).await;
                        return;
                    }
                }
            }

            for event in decode_line(&lines.take_rest()) {
                if tx.send(event).await.is_err() {
                    return;
                }
            }
        });

        Ok(rx)
    }
}
