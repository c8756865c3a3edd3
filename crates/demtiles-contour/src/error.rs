//! Error types for the contour pipeline.

use thiserror::Error;

/// Errors that can occur while producing contour tiles.
#[derive(Debug, Error)]
pub enum ContourError {
    /// I/O error reading a raster tile.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The raster codec could not decode a tile.
    #[error("raster decode error: {0}")]
    RasterDecode(#[from] image::ImageError),

    /// HTTP request error when fetching tiles.
    #[error("HTTP request error: {0}")]
    HttpRequest(#[from] reqwest::Error),

    /// The raster source answered with a failure status.
    #[error("Failed to download tile z={z} x={x} y={y}: {reason}")]
    TileDownloadFailed {
        /// Zoom level.
        z: u8,
        /// X tile coordinate.
        x: u32,
        /// Y tile coordinate.
        y: u32,
        /// Reason for failure.
        reason: String,
    },

    /// Invalid zoom level.
    #[error("Invalid zoom level {0} (must be 0-{max})", max = crate::MAX_ZOOM)]
    InvalidZoomLevel(u8),

    /// Tile column or row outside the range for its zoom level.
    #[error("Tile x={x} y={y} is out of range for zoom {z}")]
    InvalidTileAddress {
        /// Zoom level.
        z: u8,
        /// X tile coordinate.
        x: u32,
        /// Y tile coordinate.
        y: u32,
    },

    /// Elevation encoding name not recognised.
    #[error("Unknown elevation encoding {0:?} (expected \"terrarium\" or \"mapbox\")")]
    UnknownEncoding(String),

    /// Contour interval parameters are unusable.
    #[error("Invalid contour interval: {0}")]
    InvalidInterval(String),

    /// A raster buffer does not match its declared dimensions.
    #[error("Invalid raster: {0}")]
    InvalidRaster(String),

    /// The vector tile encoder rejected the geometry.
    #[error("Vector tile encoding failed: {0}")]
    Encoding(#[from] mvt::Error),
}
