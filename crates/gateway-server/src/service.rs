//! Chat-completion request pipeline.
//!
//! Rate limit, cache lookup, validation, request guardrail, routing, upstream
//! call, response guardrail, cache store. Every call, successful or not,
//! produces exactly one [`RequestRecord`] for the request log.

use crate::error::ApiError;
use axum::{
    body::Body,
    http::{HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use gateway_core::{ChatRequest, GatewayError, RequestId};
use gateway_providers::{ProviderRegistry, UpstreamBody, UpstreamResponse};
use gateway_resilience::{CacheHit, CachedResponse, RateLimiter, ResponseCache};
use gateway_routing::ModelRouter;
use gateway_security::GuardrailInspector;
use gateway_telemetry::{CacheOutcome, RequestLogSink, RequestRecord};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// Cache status header
pub static CACHE_HEADER: HeaderName = HeaderName::from_static("x-cache");

/// Latency avoided by a cache hit, in milliseconds
pub static CACHE_TIME_SAVED_HEADER: HeaderName =
    HeaderName::from_static("x-cache-time-saved-ms");

/// Per-call metadata captured by the HTTP layer
#[derive(Debug, Clone)]
pub struct CallContext {
    /// Correlation id
    pub request_id: RequestId,
    /// Rate-limit key
    pub client_key: String,
    /// HTTP method
    pub method: String,
    /// Request path, part of the cache key
    pub path: String,
}

/// The request pipeline and the state it owns
pub struct ChatService {
    limiter: RateLimiter,
    cache: ResponseCache,
    inspector: GuardrailInspector,
    router: ModelRouter,
    providers: ProviderRegistry,
    request_log: Arc<dyn RequestLogSink>,
}

impl std::fmt::Debug for ChatService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatService")
            .field("limiter", &self.limiter)
            .field("cache_entries", &self.cache.len())
            .field("inspector", &self.inspector)
            .field("router", &self.router)
            .field("providers", &self.providers)
            .finish_non_exhaustive()
    }
}

impl ChatService {
    /// Assemble the pipeline from its components
    #[must_use]
    pub fn new(
        limiter: RateLimiter,
        cache: ResponseCache,
        inspector: GuardrailInspector,
        router: ModelRouter,
        providers: ProviderRegistry,
        request_log: Arc<dyn RequestLogSink>,
    ) -> Self {
        Self {
            limiter,
            cache,
            inspector,
            router,
            providers,
            request_log,
        }
    }

    /// Run one call through the pipeline and render the response
    pub async fn handle(&self, ctx: CallContext, body: Bytes) -> Response {
        let started = Instant::now();
        let mut record = RequestRecord::new(
            ctx.request_id.clone(),
            ctx.method.as_str(),
            ctx.path.as_str(),
            &ctx.client_key,
        );

        let response = match self.process(&ctx, &body, &mut record).await {
            Ok(response) => response,
            Err(err) => {
                warn!(
                    request_id = %ctx.request_id,
                    code = err.code().as_str(),
                    provider = ?err.provider(),
                    error = %err,
                    "Request failed"
                );
                record.error_code = Some(err.code().as_str());
                ApiError::from(err).into_response()
            }
        };

        record.status = response.status().as_u16();
        record.set_latency(started.elapsed());
        self.request_log.record(record);

        response
    }

    async fn process(
        &self,
        ctx: &CallContext,
        body: &Bytes,
        record: &mut RequestRecord,
    ) -> Result<Response, GatewayError> {
        if !self.limiter.is_allowed(&ctx.client_key) {
            return Err(GatewayError::RateLimited);
        }

        if let Some(hit) = self.cache.lookup(&ctx.path, body) {
            debug!(request_id = %ctx.request_id, "Serving from cache");
            record.cache = CacheOutcome::hit(hit.time_saved);
            record.model = Some(hit.response.model.clone());
            record.provider = Some(hit.response.provider);
            return Ok(cached_response(hit));
        }
        record.cache = CacheOutcome::Miss;

        let request = ChatRequest::from_slice(body)?;
        record.model = Some(request.model.clone());
        record.streaming = request.is_streaming();

        self.inspector
            .inspect_request(&request, &mut record.guardrail_detections)
            .await?;

        let provider = self.router.resolve_provider(&request.model);
        record.provider = Some(provider);
        let adapter = self.providers.get(provider).ok_or_else(|| {
            GatewayError::internal(format!("No adapter registered for provider '{provider}'"))
        })?;

        debug!(
            request_id = %ctx.request_id,
            model = %request.model,
            provider = %provider,
            stream = request.is_streaming(),
            "Dispatching to provider"
        );

        let upstream_started = Instant::now();
        let UpstreamResponse {
            status,
            headers,
            body: upstream_body,
        } = adapter.execute(&request).await?;

        match upstream_body {
            // Streams are neither inspected nor cached.
            UpstreamBody::Stream(stream) => Ok(build_response(
                status,
                headers,
                Body::from_stream(stream),
                CacheStatus::Miss,
            )),
            UpstreamBody::Full(payload) => {
                self.inspector
                    .inspect_response(&payload, &mut record.guardrail_detections)
                    .await?;

                let cached = CachedResponse {
                    status,
                    headers: headers.clone(),
                    body: payload.clone(),
                    latency: upstream_started.elapsed(),
                    model: request.model,
                    provider,
                };
                if self.cache.store(&ctx.path, body, cached) {
                    debug!(request_id = %ctx.request_id, "Stored response in cache");
                }

                Ok(build_response(
                    status,
                    headers,
                    Body::from(payload),
                    CacheStatus::Miss,
                ))
            }
        }
    }
}

enum CacheStatus {
    Hit(u64),
    Miss,
}

fn cached_response(hit: CacheHit) -> Response {
    let saved_ms = u64::try_from(hit.time_saved.as_millis()).unwrap_or(u64::MAX);
    let CachedResponse {
        status,
        headers,
        body,
        ..
    } = hit.response;
    build_response(status, headers, Body::from(body), CacheStatus::Hit(saved_ms))
}

fn build_response(
    status: StatusCode,
    headers: HeaderMap,
    body: Body,
    cache: CacheStatus,
) -> Response {
    let mut response = Response::new(body);
    *response.status_mut() = status;
    *response.headers_mut() = headers;

    let response_headers = response.headers_mut();
    match cache {
        CacheStatus::Hit(saved_ms) => {
            response_headers.insert(CACHE_HEADER.clone(), HeaderValue::from_static("HIT"));
            response_headers.insert(CACHE_TIME_SAVED_HEADER.clone(), HeaderValue::from(saved_ms));
        }
        CacheStatus::Miss => {
            response_headers.insert(CACHE_HEADER.clone(), HeaderValue::from_static("MISS"));
        }
    }

    response
}
