//! # demtiles-server
//!
//! Serves contour vector tiles rendered on demand from raster DEM tilesets.
//!
//! A YAML [`ServerConfig`] names one or more tilesets, each pairing a raster
//! source with an elevation encoding and contour intervals. At startup the
//! configuration is validated and turned into an immutable
//! [`TilesetRegistry`], shared by every request handler.
//!
//! Routes:
//!
//! - `GET /` lists the tilesets and their TileJSON URLs.
//! - `GET /{tileset}` returns a TileJSON 3.0.0 document.
//! - `GET /{tileset}/{z}/{x}/{y}.mvt` returns a contour tile.

pub mod config;
pub mod registry;
pub mod routes;
pub mod server;
pub mod tilejson;

pub use config::{ConfigError, ServerConfig, SourceConfig, TilesetConfig};
pub use registry::{Tileset, TilesetRegistry};
pub use routes::{router, AppState, TileResponse, MVT_CONTENT_TYPE};
pub use server::{serve, shutdown_signal};
pub use tilejson::TileJson;
