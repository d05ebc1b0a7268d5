use axum::{extract::State, http::Uri, Extension, Json};
use serde_json::{json, Value};

use crate::{
    error::{AppError, AppResult},
    middleware::RequestId,
    models::{
        AddEventsResponse, Event, NewEvent, RecommendationResponse, RecommendationResult, UserQuery,
    },
};

use super::AppState;

/// Health check endpoint
pub async fn health_check() -> Json<Value> {
    tracing::debug!("Health check");
    Json(json!({ "status": "ok" }))
}

/// Recommends festivals for a batch of users.
///
/// Entries are read one by one; a malformed entry gets no recommendation
/// instead of failing the batch.
pub async fn recommend(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Json(users): Json<Vec<Value>>,
) -> AppResult<Json<Vec<RecommendationResponse>>> {
    tracing::info!(
        request_id = %request_id,
        users = users.len(),
        "Processing recommendation request"
    );

    let mut queries = Vec::with_capacity(users.len());
    let mut rejected = Vec::new();
    for (slot, user) in users.into_iter().enumerate() {
        match UserQuery::from_value(user) {
            Ok(query) => queries.push(query),
            Err(invalid) => {
                tracing::warn!(
                    request_id = %request_id,
                    userid = %invalid.userid,
                    error = %invalid.error,
                    "Malformed user entry, no recommendation"
                );
                rejected.push((slot, RecommendationResult::none(invalid.userid)));
            }
        }
    }

    let recommender = state.registry.current().await?;
    let top_n = state.top_n;
    let mut results = tokio::task::spawn_blocking(move || recommender.recommend(&queries, top_n))
        .await
        .map_err(|e| AppError::Internal(format!("recommendation task failed: {}", e)))??;

    // ascending slots, so every earlier slot is already filled
    for (slot, result) in rejected {
        results.insert(slot, result);
    }

    tracing::debug!(request_id = %request_id, results = ?results, "Recommendations computed");

    Ok(Json(
        results
            .into_iter()
            .map(RecommendationResponse::from)
            .collect(),
    ))
}

/// Adds or replaces catalog events and re-fits the recommender
pub async fn add_events(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Json(events): Json<Vec<NewEvent>>,
) -> AppResult<Json<AddEventsResponse>> {
    if events.is_empty() {
        return Err(AppError::InvalidInput(
            "Must provide at least one event".to_string(),
        ));
    }

    let added = events.len();
    tracing::info!(request_id = %request_id, events = added, "Adding events to catalog");

    let events: Vec<Event> = events.into_iter().map(Event::from).collect();
    let total = state.registry.add_events(events).await?;

    tracing::info!(request_id = %request_id, added, total, "Catalog updated and recommender re-fitted");

    Ok(Json(AddEventsResponse { added, total }))
}

/// Fallback for unknown routes
pub async fn not_found(uri: Uri) -> AppError {
    tracing::debug!(uri = %uri, "No route matched");
    AppError::NotFound("Not Found".to_string())
}
