//! HTTP plumbing shared by the adapters.

use crate::adapter::ByteStream;
use async_stream::try_stream;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use gateway_core::{GatewayError, ProviderName};
use http::header::{CONNECTION, CONTENT_LENGTH, TRANSFER_ENCODING};
use http::HeaderMap;
use reqwest::{Client, RequestBuilder, Response};
use serde_json::Value;
use std::time::Duration;
use tokio::time::Instant;
use tracing::warn;

const MAX_ERROR_BODY_CHARS: usize = 512;

// About 30 years: stands in for deadlines too far out to represent.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

fn instant_after(now: Instant, after: Duration) -> Instant {
    now.checked_add(after).unwrap_or_else(|| now + FAR_FUTURE)
}

/// Build the pooled HTTP client used by one adapter.
///
/// No client-level timeout is set: every call carries its own deadline.
pub fn build_client() -> Result<Client, GatewayError> {
    Client::builder()
        .pool_max_idle_per_host(100)
        .build()
        .map_err(|e| GatewayError::internal(format!("Failed to create HTTP client: {e}")))
}

/// Absolute deadline for one call
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    provider: ProviderName,
    timeout: Duration,
    at: Instant,
}

impl Deadline {
    /// Deadline `timeout` from now
    #[must_use]
    pub fn after(provider: ProviderName, timeout: Duration) -> Self {
        Self {
            provider,
            timeout,
            at: instant_after(Instant::now(), timeout),
        }
    }

    fn expired(&self) -> GatewayError {
        GatewayError::Timeout {
            provider: self.provider,
            after: self.timeout,
        }
    }

    /// Send the request, failing with a timeout error at the deadline
    pub async fn send(&self, request: RequestBuilder) -> Result<Response, GatewayError> {
        match tokio::time::timeout_at(self.at, request.send()).await {
            Ok(result) => result.map_err(|e| self.map_reqwest(&e)),
            Err(_) => Err(self.expired()),
        }
    }

    /// Read the full body before the deadline
    pub async fn read_body(&self, response: Response) -> Result<Bytes, GatewayError> {
        match tokio::time::timeout_at(self.at, response.bytes()).await {
            Ok(result) => result.map_err(|e| self.map_reqwest(&e)),
            Err(_) => Err(self.expired()),
        }
    }

    /// Body as a stream that ends with a timeout error at the deadline
    pub fn stream_body(self, response: Response) -> ByteStream {
        self.guard_stream(response.bytes_stream())
    }

    fn guard_stream<S>(self, upstream: S) -> ByteStream
    where
        S: Stream<Item = Result<Bytes, reqwest::Error>> + Send + 'static,
    {
        let deadline = self;
        let mut upstream = Box::pin(upstream);
        Box::pin(try_stream! {
            loop {
                match tokio::time::timeout_at(deadline.at, upstream.next()).await {
                    Ok(Some(chunk)) => yield chunk.map_err(|e| deadline.map_reqwest(&e))?,
                    Ok(None) => break,
                    Err(_) => {
                        warn!(provider = %deadline.provider, "Upstream stream exceeded deadline, closing");
                        Err(deadline.expired())?;
                    }
                }
            }
        })
    }

    fn map_reqwest(&self, err: &reqwest::Error) -> GatewayError {
        if err.is_timeout() {
            self.expired()
        } else {
            GatewayError::transport(self.provider, err.to_string())
        }
    }
}

/// Upstream headers safe to replay to the caller
#[must_use]
pub fn forwardable_headers(upstream: &HeaderMap) -> HeaderMap {
    let mut headers = upstream.clone();
    for name in [CONNECTION, TRANSFER_ENCODING, CONTENT_LENGTH] {
        headers.remove(name);
    }
    headers.remove("keep-alive");
    headers
}

/// Error for a non-2xx upstream answer, carrying the upstream's own message
/// when the body is a JSON error document.
pub fn upstream_error(provider: ProviderName, status: u16, body: &[u8]) -> GatewayError {
    let message = serde_json::from_slice::<Value>(body)
        .ok()
        .and_then(|value| json_error_message(&value))
        .unwrap_or_else(|| {
            let text = String::from_utf8_lossy(body);
            let text = text.trim();
            if text.is_empty() {
                format!("{provider} returned status {status}")
            } else {
                text.chars().take(MAX_ERROR_BODY_CHARS).collect()
            }
        });

    GatewayError::upstream(provider, status, message)
}

// {"error":{"message":..}}, {"error":".."} or {"message":..}
fn json_error_message(value: &Value) -> Option<String> {
    let message = match value.get("error") {
        Some(Value::String(message)) => Some(message.as_str()),
        Some(error) => error.get("message").and_then(Value::as_str),
        None => value.get("message").and_then(Value::as_str),
    }?;
    Some(message.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::streaming::transcode_stream;
    use futures::stream;
    use gateway_core::DONE_FRAME;
    use http::HeaderValue;

    const DELTA_EVENT: &str = "event: content_block_delta\ndata: {\"type\":\"content_block_delta\",\"index\":0,\"delta\":{\"type\":\"text_delta\",\"text\":\"Hi\"}}\n\n";

    fn stalled_after(chunk: &'static str) -> impl Stream<Item = Result<Bytes, reqwest::Error>> {
        stream::iter(vec![Ok(Bytes::from_static(chunk.as_bytes()))]).chain(stream::pending())
    }

    #[tokio::test(start_paused = true)]
    async fn test_stream_ends_with_timeout_at_deadline() {
        let started = Instant::now();
        let deadline = Deadline::after(ProviderName::Anthropic, Duration::from_secs(30));

        let results: Vec<_> = deadline
            .guard_stream(stalled_after("partial"))
            .collect()
            .await;

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].as_ref().expect("first chunk"), &Bytes::from_static(b"partial"));
        assert!(matches!(
            results[1],
            Err(GatewayError::Timeout { provider: ProviderName::Anthropic, after })
                if after == Duration::from_secs(30)
        ));
        assert!(started.elapsed() >= Duration::from_secs(30));
    }

    #[tokio::test(start_paused = true)]
    async fn test_transcoded_stream_has_no_done_after_timeout() {
        let deadline = Deadline::after(ProviderName::Anthropic, Duration::from_secs(5));
        let stream = transcode_stream(deadline.guard_stream(stalled_after(DELTA_EVENT)), "m".into());

        let results: Vec<_> = stream.collect().await;

        assert_eq!(results.len(), 2);
        let frame = results[0].as_ref().expect("delta frame");
        assert_ne!(frame, &Bytes::from_static(DONE_FRAME));
        assert!(std::str::from_utf8(frame).expect("utf8").contains("\"content\":\"Hi\""));
        assert_eq!(
            results[1].as_ref().expect_err("deadline").status_code().as_u16(),
            504
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_unrepresentable_timeout_saturates() {
        let now = Instant::now();
        assert_eq!(instant_after(now, Duration::MAX), now + FAR_FUTURE);
        assert_eq!(instant_after(now, Duration::from_secs(1)), now + Duration::from_secs(1));

        let deadline = Deadline::after(ProviderName::OpenAI, Duration::MAX);
        assert!(deadline.at > now + Duration::from_secs(86_400 * 365));
    }

    #[test]
    fn test_hop_by_hop_headers_are_removed() {
        let mut upstream = HeaderMap::new();
        upstream.insert(CONNECTION, HeaderValue::from_static("keep-alive"));
        upstream.insert(TRANSFER_ENCODING, HeaderValue::from_static("chunked"));
        upstream.insert(CONTENT_LENGTH, HeaderValue::from_static("42"));
        upstream.insert("keep-alive", HeaderValue::from_static("timeout=5"));
        upstream.insert("content-type", HeaderValue::from_static("application/json"));
        upstream.insert("openai-processing-ms", HeaderValue::from_static("12"));

        let headers = forwardable_headers(&upstream);

        assert_eq!(headers.len(), 2);
        assert!(headers.contains_key("content-type"));
        assert!(headers.contains_key("openai-processing-ms"));
    }

    #[test]
    fn test_upstream_error_message_extraction() {
        let err = upstream_error(
            ProviderName::OpenAI,
            401,
            br#"{"error":{"message":"Incorrect API key provided","type":"invalid_request_error"}}"#,
        );
        assert_eq!(err.to_string(), "Incorrect API key provided");
        assert_eq!(err.status_code().as_u16(), 401);

        let err = upstream_error(
            ProviderName::Anthropic,
            529,
            br#"{"type":"error","error":{"type":"overloaded_error","message":"Overloaded"}}"#,
        );
        assert_eq!(err.to_string(), "Overloaded");
        assert_eq!(err.status_code().as_u16(), 529);
    }

    #[test]
    fn test_upstream_error_falls_back_to_raw_text() {
        let err = upstream_error(ProviderName::OpenAI, 502, b"<html>Bad Gateway</html>");
        assert_eq!(err.to_string(), "<html>Bad Gateway</html>");

        let err = upstream_error(ProviderName::OpenAI, 503, b"");
        assert_eq!(err.to_string(), "openai returned status 503");

        let long = "x".repeat(2000);
        let err = upstream_error(ProviderName::OpenAI, 500, long.as_bytes());
        assert_eq!(err.to_string().len(), MAX_ERROR_BODY_CHARS);
    }
}
