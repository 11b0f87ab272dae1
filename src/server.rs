//! HTTP surface for grid lookups, the stop catalog and hotspot aggregation.
//!
//! | Route | Handler |
//! |-------|---------|
//! | `GET /` | health and loaded dataset sizes |
//! | `GET /nearest-stops?lat&lon` | [`SpatialIndex::accessibility_info`] |
//! | `GET /grid/{grid_id}` | [`SpatialIndex::grid_info`] |
//! | `GET /bus-stops` | [`SpatialIndex::list_stops`] |
//! | `GET /bus-stops/nearby` | [`SpatialIndex::nearby_stops`] |
//! | `GET /bus-stops/bounds` | [`SpatialIndex::catalog_bounds`] |
//! | `POST /analytics/hotspots` | [`aggregate_hotspots`] |
//!
//! Every request works on one snapshot of the index, so a concurrent reload
//! never mixes old and new datasets within a response.

use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use log::{debug, error};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tower_http::cors::{Any, CorsLayer};

use crate::catalog::{BoundsQuery, CatalogBounds, NearbyQuery, NearbyStops, StopListing};
use crate::hotspot::{aggregate_hotspots, ComplaintPoint, HotspotReport};
use crate::{AccessibilityInfo, IndexHandle, LookupError, ServiceConfig, SpatialIndex};

/// Shared state for all handlers.
#[derive(Clone)]
pub struct AppState {
    pub index: Arc<IndexHandle>,
    pub config: Arc<ServiceConfig>,
}

impl AppState {
    pub fn new(index: IndexHandle, config: ServiceConfig) -> Self {
        Self {
            index: Arc::new(index),
            config: Arc::new(config),
        }
    }
}

/// API errors
#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Lookup(#[from] LookupError),

    #[error("{0}")]
    NotFound(String),

    /// Query string, path segment or body could not be extracted.
    #[error("{message}")]
    Rejected { status: StatusCode, message: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Lookup(LookupError::InvalidCoordinate { .. })
            | ApiError::Lookup(LookupError::InvalidParameter { .. }) => StatusCode::BAD_REQUEST,
            ApiError::Lookup(_) | ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Rejected { status, .. } => *status,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::Rejected { status: rejection.status(), message: rejection.body_text() }
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::Rejected { status: rejection.status(), message: rejection.body_text() }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Rejected { status: rejection.status(), message: rejection.body_text() }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("[Server] {}", self);
        } else {
            debug!("[Server] {} -> {}", self, status);
        }

        let body = Json(ErrorResponse {
            error: self.to_string(),
            code: status.as_u16(),
        });

        (status, body).into_response()
    }
}

/// Error response body
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u16,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Health {
    pub status: String,
    pub message: String,
    pub grid_cells: usize,
    pub stops: usize,
}

#[derive(Debug, Deserialize)]
pub struct PointQuery {
    pub lat: f64,
    pub lon: f64,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(health))
        .route("/nearest-stops", get(nearest_stops))
        .route("/grid/{grid_id}", get(grid_info))
        .route("/bus-stops", get(list_stops))
        .route("/bus-stops/nearby", get(nearby_stops))
        .route("/bus-stops/bounds", get(stop_bounds))
        .route("/analytics/hotspots", post(hotspots))
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> Json<Health> {
    let index = state.index.snapshot();
    Json(Health {
        status: "ok".to_string(),
        message: "Accessibility API is running".to_string(),
        grid_cells: index.cells().len(),
        stops: index.stops().len(),
    })
}

async fn nearest_stops(
    State(state): State<AppState>,
    point: Result<Query<PointQuery>, QueryRejection>,
) -> Result<Json<AccessibilityInfo>, ApiError> {
    let Query(point) = point?;
    let index = state.index.snapshot();
    Ok(Json(index.accessibility_info(point.lat, point.lon, &state.config)?))
}

async fn grid_info(
    State(state): State<AppState>,
    grid_id: Result<Path<i64>, PathRejection>,
) -> Result<Json<AccessibilityInfo>, ApiError> {
    let Path(grid_id) = grid_id?;
    let index = state.index.snapshot();
    Ok(Json(index.grid_info(grid_id, &state.config)?))
}

async fn list_stops(
    State(state): State<AppState>,
    query: Result<Query<BoundsQuery>, QueryRejection>,
) -> Result<Json<StopListing>, ApiError> {
    let Query(query) = query?;
    let index = state.index.snapshot();
    Ok(Json(index.list_stops(&query, &state.config)?))
}

async fn nearby_stops(
    State(state): State<AppState>,
    query: Result<Query<NearbyQuery>, QueryRejection>,
) -> Result<Json<NearbyStops>, ApiError> {
    let Query(query) = query?;
    let index = state.index.snapshot();
    Ok(Json(index.nearby_stops(&query, &state.config)?))
}

async fn stop_bounds(State(state): State<AppState>) -> Result<Json<CatalogBounds>, ApiError> {
    let index = state.index.snapshot();
    index
        .catalog_bounds(&state.config)
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("No bus stops loaded".to_string()))
}

async fn hotspots(
    State(state): State<AppState>,
    complaints: Result<Json<Vec<ComplaintPoint>>, JsonRejection>,
) -> Result<Json<HotspotReport>, ApiError> {
    let Json(complaints) = complaints?;
    let index: Arc<SpatialIndex> = state.index.snapshot();
    let config = Arc::clone(&state.config);

    // Locating many points is CPU-bound.
    let report = tokio::task::spawn_blocking(move || aggregate_hotspots(&index, &complaints, &config))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    Ok(Json(report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use crate::DataPaths;
    use axum::body::Body;
    use axum::http::{header, Request};
    use serde_json::Value;
    use tower::ServiceExt;

    fn app_with(index: SpatialIndex) -> Router {
        let handle = IndexHandle::with_index(DataPaths::default(), index);
        create_router(AppState::new(handle, ServiceConfig::default()))
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let (status, body) = get_json(app_with(fixtures::city_index()), "/").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["grid_cells"], 3);
        assert_eq!(body["stops"], 3);
    }

    #[tokio::test]
    async fn test_nearest_stops() {
        let (status, body) = get_json(app_with(fixtures::city_index()), "/nearest-stops?lat=0.5&lon=0.5").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["grid_id"], 7);
        assert_eq!(body["slope_score"], 3.2);
        assert_eq!(body["nearest_stops"][0]["stop_name"], "Central");
        assert_eq!(body["nearest_stops"][0]["duration_min"], 5.95);
    }

    #[tokio::test]
    async fn test_nearest_stops_not_found() {
        let (status, body) = get_json(app_with(fixtures::city_index()), "/nearest-stops?lat=5.5&lon=5.5").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], 404);
        assert_eq!(body["error"], "no stop data found for grid_id 9");

        let (status, _) = get_json(app_with(fixtures::empty_index()), "/nearest-stops?lat=0.5&lon=0.5").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_invalid_coordinate_is_bad_request() {
        let (status, body) = get_json(app_with(fixtures::city_index()), "/nearest-stops?lat=91&lon=0.5").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], 400);
    }

    #[tokio::test]
    async fn test_malformed_query_and_path_answer_json() {
        let (status, body) = get_json(app_with(fixtures::city_index()), "/nearest-stops?lat=0.5").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], 400);
        assert!(body["error"].as_str().unwrap().contains("lon"));

        let (status, body) = get_json(app_with(fixtures::city_index()), "/grid/abc").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], 400);
        assert!(body["error"].is_string());

        let (status, body) = get_json(app_with(fixtures::city_index()), "/bus-stops/nearby?lat=x&lon=0.5").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], 400);
    }

    #[tokio::test]
    async fn test_grid_by_id() {
        let (status, body) = get_json(app_with(fixtures::city_index()), "/grid/8").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["slope_score"], 1.46);

        let (status, _) = get_json(app_with(fixtures::city_index()), "/grid/9").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_bus_stops_listing_and_limit() {
        let uri = "/bus-stops?min_lat=0&max_lat=1&min_lon=0&max_lon=2&limit=2";
        let (status, body) = get_json(app_with(fixtures::city_index()), uri).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total"], 2);
        assert_eq!(body["stops"][0]["stop_id"], 3);

        let (status, _) = get_json(app_with(fixtures::city_index()), "/bus-stops?limit=0").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_nearby_stops() {
        let (status, body) =
            get_json(app_with(fixtures::city_index()), "/bus-stops/nearby?lat=0.5&lon=0.5&radius_km=5").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["stops"][0]["stop_id"], 1);
        assert_eq!(body["stops"][0]["distance_m"], 0.0);
    }

    #[tokio::test]
    async fn test_bounds_empty_catalog() {
        let (status, body) = get_json(app_with(fixtures::empty_index()), "/bus-stops/bounds").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["error"].is_string());

        let (status, body) = get_json(app_with(fixtures::city_index()), "/bus-stops/bounds").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total_stops"], 3);
    }

    #[tokio::test]
    async fn test_hotspots_endpoint() {
        let payload = r#"[
            {"lat": 0.5, "lon": 1.5, "urgency": "red", "category": "yangin"},
            {"lat": 0.2, "lon": 1.2, "category": "rampa_eksik"},
            {"lat": 0.5, "lon": 0.5, "urgency": "green", "category": "diger"}
        ]"#;
        let response = app_with(fixtures::city_index())
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/analytics/hotspots")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(payload))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["total_grids_with_complaints"], 2);
        assert_eq!(body["hotspots"][0]["grid_id"], 8);
        assert_eq!(body["hotspots"][0]["red"], 1);
        assert_eq!(body["hotspots"][0]["yellow"], 1);
        assert_eq!(body["hotspots"][0]["top_categories"]["yangin"], 1);
        assert_eq!(body["hotspots"][0]["top_categories"]["rampa_eksik"], 1);
    }
}
