//! HTTP transport to the completion API

use super::request::CompletionRequest;
use super::stream_decoder::{EventStream, decode_buffered, decode_incremental};
use crate::config::Config;
use crate::error::{ParleyError, ParleyResult};
use async_trait::async_trait;
use serde_json::{Value, json};
use std::path::PathBuf;
use std::time::Duration;

const TOP_K: u32 = 50;
const FREQUENCY_PENALTY: f32 = 1.0;
const MAX_ERROR_BODY: usize = 500;

/// How the API delivers a response. Chosen once per call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportMode {
    /// One complete JSON payload
    Buffered,
    /// Server-pushed event lines
    Incremental,
}

/// Issues one completion request and returns the decoded events
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn send(&self, request: &CompletionRequest) -> ParleyResult<EventStream>;
}

/// Transport over HTTP using reqwest
pub struct HttpTransport {
    client: reqwest::Client,
    api_host: String,
    api_key: Option<String>,
    mode: TransportMode,
    config_path: PathBuf,
}

impl HttpTransport {
    /// Build a transport from configuration.
    ///
    /// `config_path` is only used in the hint shown on authentication failures.
    pub fn new(config: &Config, config_path: impl Into<PathBuf>) -> ParleyResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout))
            .build()
            .map_err(|e| ParleyError::config(format!("Failed to build HTTP client: {}", e)))?;

        let mode = if config.disable_streaming {
            TransportMode::Buffered
        } else {
            TransportMode::Incremental
        };

        Ok(Self {
            client,
            api_host: config.api_host.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            mode,
            config_path: config_path.into(),
        })
    }

    pub fn mode(&self) -> TransportMode {
        self.mode
    }

    fn endpoint(&self) -> String {
        match self.mode {
            TransportMode::Buffered => format!("{}/api/models/conversation", self.api_host),
            TransportMode::Incremental => {
                format!("{}/api/models/conversation_stream", self.api_host)
            }
        }
    }
}

/// Request body understood by the completion API
pub fn build_payload(request: &CompletionRequest) -> Value {
    let mut payload = json!({
        "messages": request.messages,
        "model": request.model,
        "parameters": {
            "frequence_penalty": FREQUENCY_PENALTY,
            "temperature": request.temperature,
            "top_p": request.top_p,
            "top_k": TOP_K,
            "max_new_tokens": request.max_tokens,
        },
    });
    if let Some(functions) = &request.functions {
        payload["functions"] = json!(functions);
    }
    payload
}

#[async_trait]
impl ChatTransport for HttpTransport {
    async fn send(&self, request: &CompletionRequest) -> ParleyResult<EventStream> {
        let url = self.endpoint();
        tracing::debug!(
            "POST {} (model={}, messages={})",
            url,
            request.model,
            request.messages.len()
        );

        let mut builder = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&build_payload(request));
        if let Some(key) = &self.api_key {
            builder = builder.header("X-API-KEY", key);
        }

        let response = builder.send().await?;
        let status = response.status();

        if status.as_u16() == 401 || status.as_u16() == 403 {
            tracing::error!("Completion API rejected the API key ({})", status);
            return Err(ParleyError::auth(status.as_u16(), &self.config_path));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let body: String = body.chars().take(MAX_ERROR_BODY).collect();
            return Err(ParleyError::transport_status(
                status.as_u16(),
                format!("API returned {}: {}", status, body),
            ));
        }

        match self.mode {
            TransportMode::Buffered => {
                let body = response.text().await?;
                let events = decode_buffered(&body)?;
                Ok(Box::pin(futures::stream::iter(events.into_iter().map(Ok))))
            }
            TransportMode::Incremental => Ok(decode_incremental(response.bytes_stream())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::messages::Message;

    fn config(disable_streaming: bool) -> Config {
        Config {
            api_host: "https://llm.example.com/".to_string(),
            disable_streaming,
            ..Config::default()
        }
    }

    #[test]
    fn test_endpoint_follows_mode() {
        let buffered = HttpTransport::new(&config(true), "/tmp/config.toml").unwrap();
        assert_eq!(buffered.mode(), TransportMode::Buffered);
        assert_eq!(
            buffered.endpoint(),
            "https://llm.example.com/api/models/conversation"
        );

        let incremental = HttpTransport::new(&config(false), "/tmp/config.toml").unwrap();
        assert_eq!(
            incremental.endpoint(),
            "https://llm.example.com/api/models/conversation_stream"
        );
    }

    #[test]
    fn test_payload_shape() {
        let request = CompletionRequest::new("llama", vec![Message::user("hi")])
            .with_temperature(0.5)
            .with_max_tokens(128);
        let payload = build_payload(&request);
        assert_eq!(payload["model"], "llama");
        assert_eq!(payload["messages"][0]["content"], "hi");
        assert_eq!(payload["parameters"]["temperature"], 0.5);
        assert_eq!(payload["parameters"]["top_k"], 50);
        assert_eq!(payload["parameters"]["max_new_tokens"], 128);
        assert!(payload.get("functions").is_none());
    }
}
