//! # demtiles-contour
//!
//! Contour-line vector tiles generated on demand from raster DEM tiles.
//!
//! Given a slippy-map tile address, the pipeline fetches the tile and its
//! eight neighbors from a raster source, stitches them into one buffered
//! canvas, decodes elevations, traces isolines with marching squares and
//! encodes them as line features in a Mapbox Vector Tile.
//!
//! ## Overview
//!
//! ### Elevation Encodings
//!
//! Two RGB packings are supported:
//! - Terrarium (AWS / Mapzen terrain tiles): `r*256 + g + b/256 - 32768`
//! - Mapbox Terrain-RGB: `-10000 + (r*65536 + g*256 + b) * 0.1`
//!
//! ### Seamless Tiles
//!
//! Each tile is contoured together with a halo of `buffer` pixels taken from
//! its neighbors, so lines meet exactly at tile edges. Missing neighbors are
//! filled with a mid-gray sentinel. Geometry in the halo is kept and encoded
//! slightly outside the tile extent.
//!
//! ### Output
//!
//! A single layer named `contours`. Every feature is a line string with
//! integer attributes `ele` (meters) and `level` (`1` major, `0` minor).
//!
//! ## Examples
//!
//! ### Rendering From a Directory of Tiles
//!
//! ```no_run
//! use demtiles_contour::{
//!     fetch_neighborhood, render_neighborhood, ContourOptions, ContourTile,
//!     DirectoryRasterSource, ImageCodec, TileAddress,
//! };
//!
//! # async fn run() -> demtiles_contour::Result<()> {
//! let source = DirectoryRasterSource::new("./terrarium", "png");
//! let center = TileAddress::from_lat_lon(46.8523, -121.7603, 12)?;
//!
//! let neighborhood = fetch_neighborhood(center, &source).await;
//! match render_neighborhood(&neighborhood, &ImageCodec, &ContourOptions::default())? {
//!     ContourTile::Encoded { bytes, features } => {
//!         println!("{} features, {} bytes", features, bytes.len());
//!     }
//!     ContourTile::Empty => println!("no contours cross {}", center),
//!     ContourTile::NotFound => println!("no data around {}", center),
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ### Decoding Elevations
//!
//! ```
//! use demtiles_contour::ElevationEncoding;
//!
//! assert_eq!(ElevationEncoding::Terrarium.decode(128, 0, 0), 0.0);
//! assert_eq!(ElevationEncoding::Mapbox.decode(0, 0, 0), -10000.0);
//! ```

mod assemble;
mod codec;
mod encoding;
mod error;
mod isolines;
mod pipeline;
mod source;
mod thresholds;
mod tile;
mod translate;
mod vector_tile;

pub use assemble::{assemble, composite, StitchedCanvas, CENTER_INDEX, NEIGHBOR_OFFSETS};
pub use codec::{ImageCodec, RasterCodec};
pub use encoding::{ElevationEncoding, ElevationGrid};
pub use error::ContourError;
pub use isolines::{extract_levels, ContourLevel, IsolineExtractor, MarchingSquares, Ring};
pub use pipeline::{
    contour_canvas, fetch_neighborhood, generate_contour_tile, render_neighborhood, ContourOptions,
    ContourTile, Neighborhood,
};
pub use source::{
    DirectoryRasterSource, DownloadStats, HttpRasterSource, MemoryRasterSource, RasterSource,
};
pub use thresholds::{is_major, plan_thresholds, MAJOR_TOLERANCE};
pub use tile::{RasterTile, TileAddress, MAX_ZOOM, NEUTRAL_SENTINEL};
pub use translate::translate;
pub use vector_tile::{encode, DEFAULT_EXTENT, LAYER_NAME};

/// Result type for contour pipeline operations.
pub type Result<T> = std::result::Result<T, ContourError>;
