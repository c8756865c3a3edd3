//! HTTP surfaces: contour tiles, TileJSON and the tileset catalog.

use crate::registry::TilesetRegistry;
use crate::tilejson::TileJson;
use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use demtiles_contour::{ContourTile, TileAddress};
use demtiles_metrics::{metric_defs, outcome, TileLabels};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, instrument, warn};

/// Content type of Mapbox Vector Tile bodies.
pub const MVT_CONTENT_TYPE: &str = "application/vnd.mapbox-vector-tile";

/// Tileset label used for requests naming no registered tileset.
const UNKNOWN_TILESET: &str = "unknown";

/// State shared by every handler.
#[derive(Debug)]
pub struct AppState {
    /// Registered tilesets.
    pub registry: Arc<TilesetRegistry>,
    /// Base URL written into TileJSON and catalog documents, without a
    /// trailing slash.
    pub base_url: String,
    /// Upper bound on fetching and rendering one tile.
    pub request_timeout: Duration,
}

impl AppState {
    /// Shared state over `registry`. A trailing slash on `base_url` is
    /// dropped so document URLs join with a single `/`.
    pub fn new(
        registry: Arc<TilesetRegistry>,
        base_url: impl Into<String>,
        request_timeout: Duration,
    ) -> Self {
        Self {
            registry,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            request_timeout,
        }
    }
}

/// Build the service router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(catalog_handler))
        .route("/:tileset", get(tilejson_handler))
        .route("/:tileset/:z/:x/:y", get(tile_handler))
        .with_state(state)
}

// ============================================================================
// Tile Responses
// ============================================================================

/// Result of one tile request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TileResponse {
    /// Encoded tile body.
    Tile(Vec<u8>),
    /// Source data existed but no contour crossed the tile.
    Empty,
    /// Unknown tileset, unserved zoom, invalid address, or no source data.
    NotFound,
    /// Malformed path segment.
    BadRequest(String),
    /// The request timeout elapsed.
    Timeout,
    /// Rendering failed.
    Internal,
}

impl TileResponse {
    /// Value of the `outcome` metric label.
    pub fn outcome(&self) -> &'static str {
        match self {
            TileResponse::Tile(_) => outcome::OK,
            TileResponse::Empty => outcome::EMPTY,
            TileResponse::NotFound => outcome::NOT_FOUND,
            TileResponse::BadRequest(_) => outcome::BAD_REQUEST,
            TileResponse::Timeout => outcome::TIMEOUT,
            TileResponse::Internal => outcome::ERROR,
        }
    }

    /// HTTP status this response maps to.
    pub fn status(&self) -> StatusCode {
        match self {
            TileResponse::Tile(_) => StatusCode::OK,
            TileResponse::Empty => StatusCode::NO_CONTENT,
            TileResponse::NotFound => StatusCode::NOT_FOUND,
            TileResponse::BadRequest(_) => StatusCode::BAD_REQUEST,
            TileResponse::Timeout => StatusCode::GATEWAY_TIMEOUT,
            TileResponse::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for TileResponse {
    fn into_response(self) -> Response {
        let status = self.status();
        match self {
            TileResponse::Tile(bytes) => {
                (status, [(header::CONTENT_TYPE, MVT_CONTENT_TYPE)], bytes).into_response()
            }
            TileResponse::Empty => status.into_response(),
            TileResponse::NotFound => (status, "tile not found").into_response(),
            TileResponse::BadRequest(reason) => (status, reason).into_response(),
            TileResponse::Timeout => (status, "tile rendering timed out").into_response(),
            TileResponse::Internal => (status, "tile rendering failed").into_response(),
        }
    }
}

/// Decrements the in-flight gauge when the request finishes, however it
/// finishes.
struct InFlight;

impl InFlight {
    fn enter() -> Self {
        metrics::gauge!(metric_defs::TILES_IN_FLIGHT.name).increment(1.0);
        InFlight
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        metrics::gauge!(metric_defs::TILES_IN_FLIGHT.name).decrement(1.0);
    }
}

/// Parse the `z`, `x` and `{y}.mvt` path segments.
pub fn parse_tile_path(z: &str, x: &str, y: &str) -> Result<(u8, u32, u32), String> {
    let y = y
        .strip_suffix(".mvt")
        .ok_or_else(|| format!("tile path must end in .mvt, got {:?}", y))?;
    let z = z.parse::<u8>().map_err(|_| format!("invalid zoom {:?}", z))?;
    let x = x.parse::<u32>().map_err(|_| format!("invalid x {:?}", x))?;
    let y = y.parse::<u32>().map_err(|_| format!("invalid y {:?}", y))?;
    Ok((z, x, y))
}

// ============================================================================
// Handlers
// ============================================================================

/// `GET /{tileset}/{z}/{x}/{y}.mvt`
pub async fn tile_handler(
    State(state): State<Arc<AppState>>,
    Path((tileset, z, x, y)): Path<(String, String, String, String)>,
) -> TileResponse {
    let start = Instant::now();
    let label = if state.registry.get(&tileset).is_some() {
        tileset.as_str()
    } else {
        UNKNOWN_TILESET
    };

    let response = render_tile(&state, &tileset, &z, &x, &y).await;

    let labels = TileLabels::new(label).with_outcome(response.outcome());
    metrics::counter!(metric_defs::TILE_REQUESTS.name, &labels.to_labels()).increment(1);
    if let TileResponse::Tile(_) | TileResponse::Empty = response {
        let labels = TileLabels::new(label).to_labels();
        metrics::histogram!(metric_defs::TILE_RENDER_TIME.name, &labels)
            .record(start.elapsed().as_secs_f64() * 1000.0);
    }

    debug!(
        tileset = %tileset,
        z = %z,
        x = %x,
        y = %y,
        status = response.status().as_u16(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "tile request"
    );
    response
}

/// Fetch, contour and encode one tile, mapping every outcome to a
/// [`TileResponse`].
#[instrument(skip(state))]
pub async fn render_tile(
    state: &AppState,
    tileset: &str,
    z: &str,
    x: &str,
    y: &str,
) -> TileResponse {
    let (z, x, y) = match parse_tile_path(z, x, y) {
        Ok(parsed) => parsed,
        Err(reason) => return TileResponse::BadRequest(reason),
    };
    let Some(tileset) = state.registry.get(tileset) else {
        return TileResponse::NotFound;
    };
    if !tileset.serves_zoom(z) {
        return TileResponse::NotFound;
    }
    let Ok(center) = TileAddress::new(z, x, y) else {
        return TileResponse::NotFound;
    };

    let _in_flight = InFlight::enter();
    let work = async {
        let neighborhood = tileset.fetch(center).await;
        let renderer = Arc::clone(&tileset);
        tokio::task::spawn_blocking(move || renderer.render(&neighborhood)).await
    };

    match tokio::time::timeout(state.request_timeout, work).await {
        Err(_) => {
            let timeout_ms = state.request_timeout.as_millis() as u64;
            warn!(z, x, y, timeout_ms, "tile request timed out");
            TileResponse::Timeout
        }
        Ok(Err(join_error)) => {
            error!(z, x, y, error = %join_error, "tile renderer panicked");
            TileResponse::Internal
        }
        Ok(Ok(Err(e))) => {
            error!(z, x, y, error = %e, "tile rendering failed");
            TileResponse::Internal
        }
        Ok(Ok(Ok(ContourTile::NotFound))) => TileResponse::NotFound,
        Ok(Ok(Ok(ContourTile::Empty))) => TileResponse::Empty,
        Ok(Ok(Ok(ContourTile::Encoded { bytes, features }))) => {
            let labels = TileLabels::new(tileset.name()).to_labels();
            metrics::histogram!(metric_defs::TILE_FEATURES.name, &labels).record(features as f64);
            metrics::histogram!(metric_defs::TILE_BYTES.name, &labels).record(bytes.len() as f64);
            TileResponse::Tile(bytes)
        }
    }
}

/// `GET /{tileset}`
pub async fn tilejson_handler(
    State(state): State<Arc<AppState>>,
    Path(tileset): Path<String>,
) -> Response {
    match state.registry.get(&tileset) {
        Some(tileset) => Json(TileJson::for_tileset(&tileset, &state.base_url)).into_response(),
        None => (StatusCode::NOT_FOUND, "unknown tileset").into_response(),
    }
}

/// `GET /`
pub async fn catalog_handler(State(state): State<Arc<AppState>>) -> Json<BTreeMap<String, String>> {
    let catalog = state
        .registry
        .iter()
        .map(|t| (t.name().to_string(), format!("{}/{}", state.base_url, t.name())))
        .collect();
    Json(catalog)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tile_path() {
        assert_eq!(parse_tile_path("12", "655", "1407.mvt"), Ok((12, 655, 1407)));
        assert!(parse_tile_path("12", "655", "1407").is_err());
        assert!(parse_tile_path("12", "655", "1407.png").is_err());
        assert!(parse_tile_path("zz", "655", "1407.mvt").is_err());
        assert!(parse_tile_path("300", "0", "0.mvt").is_err());
        assert!(parse_tile_path("1", "-1", "0.mvt").is_err());
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(TileResponse::Tile(vec![1]).status(), StatusCode::OK);
        assert_eq!(TileResponse::Empty.status(), StatusCode::NO_CONTENT);
        assert_eq!(TileResponse::NotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(TileResponse::BadRequest(String::new()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(TileResponse::Timeout.status(), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(TileResponse::Internal.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(TileResponse::Timeout.outcome(), "timeout");
    }

    #[test]
    fn test_tile_response_headers() {
        let response = TileResponse::Tile(vec![0x1a, 0x00]).into_response();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            MVT_CONTENT_TYPE
        );
    }

    #[test]
    fn test_app_state_trims_base_url() {
        let state = AppState::new(
            Arc::new(TilesetRegistry::new()),
            "http://localhost:8080/",
            Duration::from_secs(1),
        );
        assert_eq!(state.base_url, "http://localhost:8080");
    }
}
