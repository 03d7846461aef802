//! API endpoint handlers.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::error;

use super::AppState;
use crate::models::SearchCriteria;
use crate::scrapers::AggregateError;

/// Health check endpoint for container orchestration.
pub async fn health() -> impl IntoResponse {
    StatusCode::OK
}

/// Query parameters mirroring `SearchCriteria`; list fields arrive
/// comma-separated.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchParams {
    #[serde(default)]
    pub city: Option<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub min_rooms: Option<f32>,
    pub max_rooms: Option<f32>,
    pub min_size: Option<f32>,
    pub max_size: Option<f32>,
    pub districts: Option<String>,
    pub features: Option<String>,
}

impl SearchParams {
    /// Build criteria from query parameters.
    pub fn into_criteria(self) -> SearchCriteria {
        SearchCriteria {
            city: self.city.unwrap_or_default(),
            min_price: self.min_price,
            max_price: self.max_price,
            min_rooms: self.min_rooms,
            max_rooms: self.max_rooms,
            min_size: self.min_size,
            max_size: self.max_size,
            districts: split_list(self.districts.as_deref()),
            features: split_list(self.features.as_deref()),
        }
    }
}

fn split_list(raw: Option<&str>) -> Vec<String> {
    raw.map(|s| {
        s.split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string)
            .collect()
    })
    .unwrap_or_default()
}

/// POST body wrapper: `{ "criteria": { ... } }`.
#[derive(Debug, Deserialize)]
pub struct SearchBody {
    pub criteria: SearchCriteria,
}

/// `GET /api/search` with query parameters.
pub async fn search_get(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> (StatusCode, Json<Value>) {
    run_search(&state, params.into_criteria()).await
}

/// `POST /api/search` with a JSON criteria body.
pub async fn search_post(
    State(state): State<AppState>,
    Json(body): Json<SearchBody>,
) -> (StatusCode, Json<Value>) {
    run_search(&state, body.criteria).await
}

/// Shared search flow. A run always answers 200 with whatever listings
/// could be gathered, even if every source failed; only malformed criteria
/// yield a 400.
pub async fn run_search(state: &AppState, criteria: SearchCriteria) -> (StatusCode, Json<Value>) {
    match state.manager.search_all(&criteria).await {
        Ok(result) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": {
                    "listings": result.listings,
                    "totalFound": result.total_found,
                    "scrapersStatus": result.sources,
                    "errors": result.errors,
                },
                "criteria": criteria,
            })),
        ),
        Err(AggregateError::InvalidCriteria(e)) => (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "success": false,
                "error": "invalid_criteria",
                "message": e.to_string(),
            })),
        ),
        Err(e) => {
            // Unexpected failures surface as a short description only.
            error!("search failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "success": false,
                    "error": "aggregation_failed",
                    "message": e.to_string(),
                })),
            )
        }
    }
}

/// `GET /api/scrapers/status` - health view over configured scrapers.
pub async fn scrapers_status(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let status = state.manager.scrapers_status().await;
    (StatusCode::OK, Json(json!({ "scrapers": status })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scrapers::{ManagerConfig, ScraperManager};
    use std::sync::Arc;

    fn empty_state() -> AppState {
        AppState {
            manager: Arc::new(ScraperManager::with_adapters(
                Vec::new(),
                ManagerConfig::default(),
            )),
        }
    }

    #[test]
    fn test_params_into_criteria() {
        let params = SearchParams {
            city: Some("Berlin".to_string()),
            max_price: Some(1000.0),
            districts: Some("Mitte, Neukölln".to_string()),
            ..Default::default()
        };
        let criteria = params.into_criteria();
        assert_eq!(criteria.city, "Berlin");
        assert_eq!(criteria.max_price, Some(1000.0));
        assert_eq!(criteria.districts, vec!["Mitte", "Neukölln"]);
        assert!(criteria.features.is_empty());
    }

    #[tokio::test]
    async fn test_missing_city_is_bad_request() {
        let (status, Json(body)) = run_search(&empty_state(), SearchCriteria::default()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], serde_json::json!(false));
        assert_eq!(body["error"], serde_json::json!("invalid_criteria"));
    }

    #[tokio::test]
    async fn test_no_sources_is_internal_error() {
        let (status, Json(body)) =
            run_search(&empty_state(), SearchCriteria::for_city("Berlin")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["success"], serde_json::json!(false));
    }
}
