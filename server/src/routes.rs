//! Route definitions

use std::sync::Arc;

use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;

use crate::handlers::{self, AppState};

/// Builds the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(handlers::root_handler))
        .route(
            "/jobs/",
            get(handlers::search_job_offers).post(handlers::create_job_offer),
        )
        .route(
            "/jobs/{job_id}",
            get(handlers::read_job_offer)
                .put(handlers::update_job_offer)
                .delete(handlers::delete_job_offer),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
