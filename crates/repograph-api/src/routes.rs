use crate::{handlers, AppState};
use axum::{
    routing::{delete, get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        // Long-running pipeline jobs
        .route("/parse", post(handlers::parse))
        .route("/index", post(handlers::index))
        .route("/parse_and_index", post(handlers::parse_and_index))
        // Queries
        .route("/search", post(handlers::search))
        .route("/analyze", post(handlers::analyze))
        // Job registry
        .route("/status/{job_id}", get(handlers::job_status))
        .route("/jobs", get(handlers::list_jobs))
        .route("/jobs/{job_id}", delete(handlers::delete_job))
        .route("/jobs/{job_id}/cancel", post(handlers::cancel_job))
        // External index state
        .route("/collections", get(handlers::list_collections))
        .with_state(state)
        .layer(
            CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods(tower_http::cors::Any)
                .allow_headers(tower_http::cors::Any),
        )
        .layer(TraceLayer::new_for_http())
}
