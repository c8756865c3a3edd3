//! End-to-end contour tile generation.
//!
//! The work is split into an async stage and a CPU-bound stage so a server
//! can run the second one off its I/O threads:
//!
//! 1. [`fetch_neighborhood`] issues the nine raster fetches concurrently.
//! 2. [`render_neighborhood`] decodes, assembles, contours and encodes.
//!
//! [`generate_contour_tile`] runs the CPU stage over an in-process fetch
//! closure instead, for tools and tests.

use crate::assemble::{assemble, composite, StitchedCanvas, CENTER_INDEX, NEIGHBOR_OFFSETS};
use crate::codec::RasterCodec;
use crate::encoding::{ElevationEncoding, ElevationGrid};
use crate::isolines::{extract_levels, ContourLevel, IsolineExtractor, MarchingSquares};
use crate::source::RasterSource;
use crate::thresholds::plan_thresholds;
use crate::tile::{RasterTile, TileAddress};
use crate::translate::translate;
use crate::vector_tile::{encode, DEFAULT_EXTENT};
use crate::{ContourError, Result};
use demtiles_metrics::metric_defs;
use futures::future::join_all;
use rayon::prelude::*;
use tracing::{debug, warn};

/// Parameters for contouring one tileset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContourOptions {
    /// How the source tiles encode elevation.
    pub encoding: ElevationEncoding,
    /// Spacing between contour levels, in meters.
    pub minor_interval: f64,
    /// Levels on multiples of this are tagged major.
    pub major_interval: f64,
    /// Halo width borrowed from neighbor tiles, in pixels.
    pub buffer: u32,
    /// Vector tile coordinate extent.
    pub extent: u32,
}

impl Default for ContourOptions {
    fn default() -> Self {
        Self {
            encoding: ElevationEncoding::Terrarium,
            minor_interval: 10.0,
            major_interval: 50.0,
            buffer: 1,
            extent: DEFAULT_EXTENT,
        }
    }
}

impl ContourOptions {
    /// Check that the intervals are usable.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("minor_interval", self.minor_interval),
            ("major_interval", self.major_interval),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(ContourError::InvalidInterval(format!(
                    "{} must be a positive number, got {}",
                    name, value
                )));
            }
        }
        if self.major_interval < self.minor_interval {
            return Err(ContourError::InvalidInterval(format!(
                "major_interval {} is smaller than minor_interval {}",
                self.major_interval, self.minor_interval
            )));
        }
        Ok(())
    }
}

/// Result of contouring one tile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContourTile {
    /// None of the nine neighborhood tiles exist in the source.
    NotFound,
    /// Source data exists but no contour crosses the tile.
    Empty,
    /// Encoded MVT bytes.
    Encoded {
        /// The tile.
        bytes: Vec<u8>,
        /// Number of line features written.
        features: usize,
    },
}

/// Raw bytes of the 3x3 neighborhood around a tile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Neighborhood {
    center: TileAddress,
    tiles: Vec<Option<Vec<u8>>>,
}

impl Neighborhood {
    /// Build from bytes ordered as [`NEIGHBOR_OFFSETS`].
    pub fn new(center: TileAddress, tiles: Vec<Option<Vec<u8>>>) -> Result<Self> {
        if tiles.len() != NEIGHBOR_OFFSETS.len() {
            return Err(ContourError::InvalidRaster(format!(
                "neighborhood needs {} tiles, got {}",
                NEIGHBOR_OFFSETS.len(),
                tiles.len()
            )));
        }
        Ok(Self { center, tiles })
    }

    /// The tile being rendered.
    pub fn center(&self) -> TileAddress {
        self.center
    }

    /// Raw bytes, ordered as [`NEIGHBOR_OFFSETS`].
    pub fn tiles(&self) -> &[Option<Vec<u8>>] {
        &self.tiles
    }

    /// Whether the center tile itself was found.
    pub fn has_center(&self) -> bool {
        self.tiles[CENTER_INDEX].is_some()
    }

    /// Number of tiles the source returned.
    pub fn present(&self) -> usize {
        self.tiles.iter().filter(|t| t.is_some()).count()
    }
}

/// Fetch the nine tiles around `center` concurrently.
///
/// Fetch errors are logged and the tile is treated as missing.
pub async fn fetch_neighborhood(center: TileAddress, source: &dyn RasterSource) -> Neighborhood {
    let fetches = NEIGHBOR_OFFSETS.iter().map(|&(dx, dy)| async move {
        let addr = center.neighbor(dx, dy)?;
        match source.get(&addr).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(
                    z = addr.z,
                    x = addr.x,
                    y = addr.y,
                    error = %e,
                    "raster fetch failed, treating tile as missing"
                );
                metrics::counter!(metric_defs::SOURCE_FETCH_FAILURES.name).increment(1);
                None
            }
        }
    });

    Neighborhood {
        center,
        tiles: join_all(fetches).await,
    }
}

/// Decode, assemble, contour and encode a fetched neighborhood.
///
/// Tiles the codec rejects are logged and treated as missing.
pub fn render_neighborhood(
    neighborhood: &Neighborhood,
    codec: &dyn RasterCodec,
    options: &ContourOptions,
) -> Result<ContourTile> {
    options.validate()?;

    let tiles: Vec<Option<RasterTile>> = neighborhood
        .tiles
        .par_iter()
        .zip(NEIGHBOR_OFFSETS.par_iter())
        .map(|(bytes, &(dx, dy))| {
            let bytes = bytes.as_ref()?;
            match codec.decode(bytes) {
                Ok(tile) => Some(tile),
                Err(e) => {
                    let center = neighborhood.center;
                    warn!(
                        %center,
                        dx,
                        dy,
                        error = %e,
                        "raster decode failed, treating tile as missing"
                    );
                    metrics::counter!(metric_defs::SOURCE_DECODE_FAILURES.name).increment(1);
                    None
                }
            }
        })
        .collect();

    let Some(canvas) = composite(&tiles, options.buffer) else {
        debug!(center = %neighborhood.center, "no source tiles in neighborhood");
        return Ok(ContourTile::NotFound);
    };
    contour_canvas(&canvas, &MarchingSquares, options)
}

/// Run the whole pipeline over a synchronous fetch closure.
pub fn generate_contour_tile<F>(
    center: TileAddress,
    fetch: F,
    options: &ContourOptions,
) -> Result<ContourTile>
where
    F: FnMut(TileAddress) -> Option<RasterTile>,
{
    options.validate()?;

    let Some(canvas) = assemble(center, fetch, options.buffer) else {
        debug!(%center, "no source tiles in neighborhood");
        return Ok(ContourTile::NotFound);
    };
    contour_canvas(&canvas, &MarchingSquares, options)
}

/// Contour an assembled canvas and encode the result.
pub fn contour_canvas(
    canvas: &StitchedCanvas,
    extractor: &dyn IsolineExtractor,
    options: &ContourOptions,
) -> Result<ContourTile> {
    let grid = ElevationGrid::from_canvas(canvas, options.encoding);
    let Some((min, max)) = grid.range() else {
        return Ok(ContourTile::Empty);
    };

    let thresholds = plan_thresholds(min, max, options.minor_interval);
    let levels: Vec<ContourLevel> =
        extract_levels(extractor, &grid, &thresholds, options.major_interval)
            .into_iter()
            .map(|level| ContourLevel {
                rings: translate(level.rings, canvas.buffer()),
                ..level
            })
            .collect();

    let (bytes, features) = encode(
        &levels,
        canvas.tile_width(),
        canvas.tile_height(),
        options.extent,
    )?;
    debug!(min, max, levels = levels.len(), features, "contoured tile");

    if features == 0 {
        Ok(ContourTile::Empty)
    } else {
        Ok(ContourTile::Encoded { bytes, features })
    }
}
