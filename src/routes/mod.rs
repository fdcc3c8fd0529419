// ============================================================================
// Axum Routes Module
// ============================================================================
//
// Structure:
// - mod.rs: Main router assembly and middleware
// - health.rs: Health check and metrics endpoints
// - messages.rs: Conversation gateway endpoints
// - extractors.rs: Custom Axum extractors (authenticated address)
// - middleware.rs: Request logging
//
// ============================================================================

pub mod extractors;
mod health;
pub mod messages;
mod middleware;

use axum::{
    routing::{get, patch, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::context::AppContext;

/// Create the main application router with all routes
pub fn create_router(ctx: Arc<AppContext>) -> Router {
    Router::new()
        // Health and monitoring
        .route("/health", get(health::health_check))
        .route("/metrics", get(health::metrics))
        // Conversation gateway
        .route("/messages", post(messages::send_message))
        .route("/messages/report/:report_id", get(messages::list_messages))
        .route("/messages/unread/:address", get(messages::unread_count))
        .route("/messages/read", patch(messages::mark_read))
        .route("/messages/stats/:address", get(messages::message_stats))
        // Apply middleware (order matters - last added runs first)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(axum::middleware::from_fn(middleware::request_logging))
                .into_inner(),
        )
        .with_state(ctx)
}
