//! Provider adapter contract.

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use gateway_core::{ChatRequest, GatewayError, ProviderName};
use http::{HeaderMap, StatusCode};

/// Body chunks of a streamed upstream response
pub type ByteStream = BoxStream<'static, Result<Bytes, GatewayError>>;

/// Upstream response body
pub enum UpstreamBody {
    /// Fully read body
    Full(Bytes),
    /// Incrementally delivered body, already in the exposed streaming format
    Stream(ByteStream),
}

impl std::fmt::Debug for UpstreamBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Full(bytes) => f.debug_tuple("Full").field(&bytes.len()).finish(),
            Self::Stream(_) => f.write_str("Stream"),
        }
    }
}

/// Successful upstream response in the exposed schema
#[derive(Debug)]
pub struct UpstreamResponse {
    /// Status to return to the caller
    pub status: StatusCode,
    /// Headers to return to the caller, hop-by-hop headers removed
    pub headers: HeaderMap,
    /// Body
    pub body: UpstreamBody,
}

impl UpstreamResponse {
    /// Whether the body is streamed
    #[must_use]
    pub fn is_stream(&self) -> bool {
        matches!(self.body, UpstreamBody::Stream(_))
    }
}

/// Executes one chat-completion call against an upstream.
///
/// Implementations make a single attempt bounded by one absolute timeout.
/// A non-2xx upstream status is returned as [`GatewayError::Upstream`].
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// Provider this adapter talks to
    fn name(&self) -> ProviderName;

    /// Execute the request
    async fn execute(&self, request: &ChatRequest) -> Result<UpstreamResponse, GatewayError>;
}
