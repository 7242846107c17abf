use std::pin::Pin;
use std::time::Duration;

use bytes::Bytes;
use futures::{Stream, StreamExt};
use reqwest::{Client, Response};
use serde_json::Value;
use tracing::{debug, info};

use crate::config::ClientConfig;
use crate::error::{Result, SseError};
use crate::parser::{EventHandler, StreamEventParser};
use crate::stream::EventStream;

/// Type alias for a response body delivered as chunks
pub type ByteStream = Pin<Box<dyn Stream<Item = reqwest::Result<Bytes>> + Send>>;

/// Endpoint of the Responses API under `base_url`
pub fn responses_url(base_url: &str) -> String {
    format!("{}/v1/responses", base_url.trim_end_matches('/'))
}

/// Client for the Responses API, streaming or not
pub struct ResponsesClient {
    client: Client,
    config: ClientConfig,
}

impl ResponsesClient {
    pub fn new(config: ClientConfig) -> Result<Self> {
        config.validate()?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| SseError::ConfigError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    pub fn url(&self) -> String {
        responses_url(&self.config.base_url)
    }

    /// Send a non-streaming request and return the decoded response body
    ///
    /// Requests with `"stream": true` are rejected; use [`Self::responses_stream`]
    /// or [`Self::open_stream`] so the events have somewhere to go.
    pub async fn responses(&self, body: Value) -> Result<Value> {
        if wants_stream(&body) {
            return Err(SseError::InvalidRequest(
                "stream is enabled but no event handler was given".to_string(),
            ));
        }

        let response = self.send(&body).await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| SseError::TransportError(format!("Failed to read response: {}", e)))?;

        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Send a streaming request, driving `handler` with every event until the body ends
    pub async fn responses_stream<H>(&self, mut body: Value, handler: H) -> Result<H>
    where
        H: EventHandler,
    {
        enable_stream(&mut body)?;

        let mut stream = Box::pin(self.send(&body).await?.bytes_stream());
        let mut parser = StreamEventParser::new(handler);

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| SseError::TransportError(e.to_string()))?;
            parser.feed(&chunk);
        }

        debug!(buffered = parser.buffered_len(), "Response stream ended");
        Ok(parser.into_handler())
    }

    /// Send a streaming request and return its events as a [`Stream`]
    pub async fn open_stream(&self, mut body: Value) -> Result<EventStream<ByteStream>> {
        enable_stream(&mut body)?;

        let response = self.send(&body).await?;
        let chunks: ByteStream = Box::pin(response.bytes_stream());
        Ok(EventStream::new(chunks))
    }

    async fn send(&self, body: &Value) -> Result<Response> {
        let url = self.url();
        let payload = serde_json::to_vec(body)?;
        info!("Sending {} bytes to: {}", payload.len(), url);

        let mut request = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .bearer_auth(&self.config.api_key);

        if let Some(organization) = &self.config.organization {
            request = request.header("OpenAI-Organization", organization);
        }

        let response = request
            .body(payload)
            .send()
            .await
            .map_err(|e| SseError::UpstreamError(format!("Request failed: {}", e)))?;

        let status = response.status();
        info!("Responded with status: {}", status);

        if !status.is_success() {
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(SseError::UpstreamError(format!(
                "API error {}: {}",
                status, error_body
            )));
        }

        Ok(response)
    }
}

fn wants_stream(body: &Value) -> bool {
    body.get("stream").and_then(Value::as_bool).unwrap_or(false)
}

fn enable_stream(body: &mut Value) -> Result<()> {
    let object = body.as_object_mut().ok_or_else(|| {
        SseError::InvalidRequest("request body must be a JSON object".to_string())
    })?;
    object.insert("stream".to_string(), Value::Bool(true));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_responses_url() {
        assert_eq!(
            responses_url("https://api.openai.com"),
            "https://api.openai.com/v1/responses"
        );
        assert_eq!(
            responses_url("http://localhost:8080/"),
            "http://localhost:8080/v1/responses"
        );
    }

    #[test]
    fn test_enable_stream() {
        let mut body = json!({"model": "gpt-4o-mini", "input": "hi", "stream": false});
        enable_stream(&mut body).unwrap();
        assert!(wants_stream(&body));

        let mut not_object = json!(["hi"]);
        assert!(enable_stream(&mut not_object).is_err());
    }

    #[test]
    fn test_client_requires_valid_config() {
        assert!(ResponsesClient::new(ClientConfig::new("")).is_err());
        let client = ResponsesClient::new(ClientConfig::new("test-key")).unwrap();
        assert_eq!(client.url(), "https://api.openai.com/v1/responses");
    }

    #[tokio::test]
    async fn test_responses_rejects_stream_without_handler() {
        let client = ResponsesClient::new(ClientConfig::new("test-key")).unwrap();
        let err = client
            .responses(json!({"model": "gpt-4o-mini", "input": "hi", "stream": true}))
            .await
            .unwrap_err();
        assert!(matches!(err, SseError::InvalidRequest(_)));
    }
}
