//! HTTP handlers
//!
//! Each handler makes exactly one document store call (two for updates in
//! `stored` mode) and reshapes the result.

use std::sync::Arc;

use axum::{
    Json,
    extract::{FromRequest, Path, Query, Request, State},
};
use common::{JobOffer, JobOfferPatch};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tracing::debug;

use crate::config::UpdateResponse;
use crate::error::ApiError;
use crate::store::DocumentStore;

/// Body of `GET /`
pub const WELCOME_MESSAGE: &str = "Welcome to the job offers API";

/// Body of a successful `DELETE /jobs/{job_id}`
pub const DELETED_MESSAGE: &str = "Job offer deleted successfully";

/// Shared application state
pub struct AppState {
    pub store: Arc<dyn DocumentStore>,
    pub update_response: UpdateResponse,
}

impl AppState {
    pub fn new(store: Arc<dyn DocumentStore>, update_response: UpdateResponse) -> Self {
        Self {
            store,
            update_response,
        }
    }
}

/// `{"message": "..."}` response
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    fn new(message: &str) -> Json<Self> {
        Json(Self {
            message: message.to_string(),
        })
    }
}

/// Query parameters for `GET /jobs/`
#[derive(Debug, Deserialize)]
pub struct SearchParams {
    query: Option<String>,
}

impl SearchParams {
    /// Search text, `None` when missing or empty
    fn text(&self) -> Option<&str> {
        self.query.as_deref().filter(|q| !q.is_empty())
    }
}

/// JSON body extractor whose rejections use the API error format
pub struct ValidJson<T>(pub T);

impl<S, T> FromRequest<S> for ValidJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(Self(value))
    }
}

/// Handler for GET /
pub async fn root_handler() -> Json<MessageResponse> {
    MessageResponse::new(WELCOME_MESSAGE)
}

/// Handler for POST /jobs/
pub async fn create_job_offer(
    State(state): State<Arc<AppState>>,
    ValidJson(offer): ValidJson<JobOffer>,
) -> Result<Json<JobOffer>, ApiError> {
    // The id is always assigned by the store
    let source = offer.into_source();
    let id = state.store.index(&source, true).await?;

    debug!(%id, "created job offer");
    Ok(Json(source.with_id(id)))
}

/// Handler for GET /jobs/{job_id}
pub async fn read_job_offer(
    State(state): State<Arc<AppState>>,
    Path(job_id): Path<String>,
) -> Result<Json<JobOffer>, ApiError> {
    state
        .store
        .get(&job_id)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound)
}

/// Handler for PUT /jobs/{job_id}
pub async fn update_job_offer(
    State(state): State<Arc<AppState>>,
    Path(job_id): Path<String>,
    ValidJson(patch): ValidJson<JobOfferPatch>,
) -> Result<Json<JobOffer>, ApiError> {
    state.store.update(&job_id, &patch).await?;

    match state.update_response {
        // Only what the caller sent, not the merged document
        UpdateResponse::Echo => Ok(Json(patch.echo(job_id))),
        UpdateResponse::Stored => state
            .store
            .get(&job_id)
            .await?
            .map(Json)
            .ok_or(ApiError::NotFound),
    }
}

/// Handler for DELETE /jobs/{job_id}
pub async fn delete_job_offer(
    State(state): State<Arc<AppState>>,
    Path(job_id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.store.delete(&job_id).await?;

    debug!(id = %job_id, "deleted job offer");
    Ok(MessageResponse::new(DELETED_MESSAGE))
}

/// Handler for GET /jobs/?query=<text>
pub async fn search_job_offers(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<JobOffer>>, ApiError> {
    let offers = state.store.search(params.text()).await?;

    debug!(query = ?params.text(), total_results = offers.len(), "searched job offers");
    Ok(Json(offers))
}
