//! API module
//!
//! HTTP API endpoints and middleware.

pub mod extract;
pub mod middleware;
pub mod routes;

use axum::{middleware as mw, routing::get, Router};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub use routes::{create_router, public_router};

/// Build the application router
pub fn build_router(state: AppState) -> Router {
    // Layers run last-added first: logging -> auth -> handler
    let protected_routes = create_router()
        .layer(mw::from_fn_with_state(
            state.clone(),
            middleware::auth_middleware,
        ))
        .layer(mw::from_fn(middleware::logging_middleware));

    let api_routes = public_router().merge(protected_routes);

    Router::new()
        // Health check (no auth)
        .route("/health", get(health_check))
        .nest("/api/v1", api_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}
