//! Route handlers. Geometry work runs on the blocking pool.

use std::sync::{Arc, RwLock, RwLockReadGuard};

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use geojson::FeatureCollection;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};
use tracing::{error, info, warn};

use desserte::config::Config;
use desserte::coverage::assemble::{addresses_layer, lines_layer, stops_layer};
use desserte::coverage::{
    compute_coverage, compute_line_buffer, radius_from_json, CoverageError, CoverageRequest,
    CoverageResponse, ErrorKind,
};
use desserte::reproject::Reprojection;
use desserte::source::SourceSummary;
use desserte::GeoJsonFileSource;

/// Line buffer radius when neither the request nor the configuration has one
const FALLBACK_LINE_RADIUS_M: f64 = 200.0;

/// Application state shared across handlers
pub struct AppState {
    pub source: RwLock<GeoJsonFileSource>,
    pub config: Config,
}

impl AppState {
    fn source(&self) -> Result<RwLockReadGuard<'_, GeoJsonFileSource>, CoverageError> {
        self.source
            .read()
            .map_err(|_| CoverageError::Source("dataset lock poisoned".to_string()))
    }

    fn display(&self, source: &GeoJsonFileSource) -> Reprojection {
        Reprojection::new(source.snapshot().crs, self.config.analysis.display_crs)
    }
}

pub struct ApiError(CoverageError);

impl From<CoverageError> for ApiError {
    fn from(err: CoverageError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.0.kind() {
            ErrorKind::InvalidParameter => StatusCode::BAD_REQUEST,
            ErrorKind::GeometrySourceFailure => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            error!("Request failed: {}", self.0);
        } else {
            warn!("Rejected request: {}", self.0);
        }
        (status, Json(json!({ "error": self.0.report() }))).into_response()
    }
}

/// Run `f` on the blocking pool with the shared state
async fn blocking<T, F>(state: &Arc<AppState>, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&AppState) -> Result<T, CoverageError> + Send + 'static,
    T: Send + 'static,
{
    let state = Arc::clone(state);
    let result = tokio::task::spawn_blocking(move || f(&state))
        .await
        .map_err(|e| CoverageError::Source(format!("worker task failed: {e}")))?;
    Ok(result?)
}

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    stops: usize,
}

/// Health check endpoint
pub async fn health(State(state): State<Arc<AppState>>) -> Result<Json<HealthResponse>, ApiError> {
    let stops = state.source()?.snapshot().stops.len();
    Ok(Json(HealthResponse {
        status: "ok",
        stops,
    }))
}

pub async fn stops(
    State(state): State<Arc<AppState>>,
) -> Result<Json<FeatureCollection>, ApiError> {
    let layer = blocking(&state, |state| {
        let source = state.source()?;
        Ok(stops_layer(&source.snapshot().stops, &state.display(&source)))
    })
    .await?;
    Ok(Json(layer))
}

pub async fn lines(
    State(state): State<Arc<AppState>>,
) -> Result<Json<FeatureCollection>, ApiError> {
    let layer = blocking(&state, |state| {
        let source = state.source()?;
        let lines = source.snapshot().lines.as_deref().unwrap_or_default();
        Ok(lines_layer(lines, &state.display(&source)))
    })
    .await?;
    Ok(Json(layer))
}

pub async fn addresses(
    State(state): State<Arc<AppState>>,
) -> Result<Json<FeatureCollection>, ApiError> {
    let layer = blocking(&state, |state| {
        let source = state.source()?;
        let addresses = source
            .snapshot()
            .addresses
            .as_ref()
            .map_or(&[][..], |a| a.features.as_slice());
        Ok(addresses_layer(addresses, &state.display(&source)))
    })
    .await?;
    Ok(Json(layer))
}

#[derive(Deserialize)]
pub struct LineBufferParams {
    /// Buffer radius in meters
    radius: Option<f64>,
}

pub async fn line_buffer(
    State(state): State<Arc<AppState>>,
    Query(params): Query<LineBufferParams>,
) -> Result<Json<FeatureCollection>, ApiError> {
    let radius = params
        .radius
        .or(state.config.analysis.default_line_radius_m)
        .unwrap_or(FALLBACK_LINE_RADIUS_M);

    let layer = blocking(&state, move |state| {
        let source = state.source()?;
        compute_line_buffer(&*source, radius, &state.config.engine_options())
    })
    .await?;
    Ok(Json(layer))
}

pub async fn datasets(
    State(state): State<Arc<AppState>>,
) -> Result<Json<SourceSummary>, ApiError> {
    Ok(Json(state.source()?.summary()))
}

/// Body of a coverage request. Values may be numbers or numeric strings.
#[derive(Deserialize, Default)]
pub struct CoverageBody {
    distance: Option<JsonValue>,
    line_distance: Option<JsonValue>,
}

impl CoverageBody {
    fn into_request(self, config: &Config) -> Result<CoverageRequest, CoverageError> {
        let radius_m = match self.distance {
            Some(v) if !v.is_null() => radius_from_json("distance", &v)?,
            _ => config.analysis.default_radius_m,
        };
        let line_radius_m = match self.line_distance {
            Some(v) if !v.is_null() => Some(radius_from_json("line_distance", &v)?),
            _ => config.analysis.default_line_radius_m,
        };
        Ok(CoverageRequest {
            radius_m,
            line_radius_m,
        })
    }
}

pub async fn compute(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<CoverageResponse>, ApiError> {
    let body: CoverageBody = if body.iter().all(u8::is_ascii_whitespace) {
        CoverageBody::default()
    } else {
        serde_json::from_slice(&body).map_err(|e| CoverageError::InvalidBody(e.to_string()))?
    };
    let request = body.into_request(&state.config)?;

    let response = blocking(&state, move |state| {
        let source = state.source()?;
        compute_coverage(&*source, &request, &state.config.engine_options())
    })
    .await?;
    Ok(Json(response))
}

/// Re-read the dataset files. The previous snapshot stays on failure.
pub async fn reload(
    State(state): State<Arc<AppState>>,
) -> Result<Json<SourceSummary>, ApiError> {
    let summary = blocking(&state, |state| {
        let mut source = state
            .source
            .write()
            .map_err(|_| CoverageError::Source("dataset lock poisoned".to_string()))?;
        source.reload()?;
        Ok(source.summary())
    })
    .await?;

    info!("Datasets reloaded: {} stops", summary.stops.features);
    Ok(Json(summary))
}
