//! Route definitions for the gateway API.

use axum::{routing::post, Router};
use tower_http::trace::TraceLayer;

use crate::{handlers, middleware, state::AppState};

/// Create the main API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // OpenAI-compatible endpoints
        .nest("/v1", openai_routes())
        .layer(TraceLayer::new_for_http())
        .layer(axum::middleware::from_fn(middleware::request_id_middleware))
        .with_state(state)
}

/// OpenAI-compatible API routes
fn openai_routes() -> Router<AppState> {
    Router::new().route("/chat/completions", post(handlers::chat_completion))
}
