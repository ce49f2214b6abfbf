//! HTTP request handlers for the gateway API.

use axum::{
    extract::{OriginalUri, State},
    http::Method,
    response::Response,
};
use bytes::Bytes;
use tracing::instrument;

use crate::{
    extractors::{ClientKey, RequestId},
    service::CallContext,
    state::AppState,
};

/// Chat completion endpoint (OpenAI compatible).
///
/// The body is taken raw: the cache key is the exact bytes sent.
#[instrument(skip_all, fields(request_id = %request_id))]
pub async fn chat_completion(
    State(state): State<AppState>,
    RequestId(request_id): RequestId,
    ClientKey(client_key): ClientKey,
    method: Method,
    OriginalUri(uri): OriginalUri,
    body: Bytes,
) -> Response {
    let ctx = CallContext {
        request_id,
        client_key,
        method: method.to_string(),
        path: uri.path().to_string(),
    };

    state.chat.handle(ctx, body).await
}
