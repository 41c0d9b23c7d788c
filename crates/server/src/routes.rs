use axum::{
    routing::get,
    Json, Router,
};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnFailure, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use common::types::Health;

use crate::auth::AppState;

pub mod services;

pub async fn health() -> Json<Health> {
    Json(Health { status: "ok" })
}

/// Build the full application router: public liveness plus the catalog API.
/// Role checks live in the handlers' extractors (read = admin, mutate =
/// super admin).
pub fn build_router(cors: CorsLayer, state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/services", get(services::search).post(services::create))
        .route(
            "/services/:id",
            get(services::get_detail)
                .patch(services::update)
                .delete(services::delete),
        )
        .route("/services/:id/health", get(services::check_health))
        .with_state(state)
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO).include_headers(false))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO).include_headers(false))
                .on_failure(DefaultOnFailure::new().level(Level::ERROR)),
        )
}
