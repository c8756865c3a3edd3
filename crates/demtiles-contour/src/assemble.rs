//! Neighbor tile assembly.
//!
//! Marching squares cannot place a contour in the outermost half pixel of a
//! grid, and two tiles contoured independently disagree along their shared
//! edge. Both problems go away if each tile is contoured together with a thin
//! halo of real pixels borrowed from its eight neighbors, so the assembler
//! stitches the 3x3 neighborhood into one canvas and cuts out the center tile
//! plus `buffer` pixels on every side.

use crate::tile::{RasterTile, TileAddress, NEUTRAL_SENTINEL};
use demtiles_metrics::metric_defs;
use tracing::{debug, warn};

/// Offsets of the 3x3 neighborhood, row-major from the north-west corner.
pub const NEIGHBOR_OFFSETS: [(i32, i32); 9] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (0, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

/// Index of the center tile in [`NEIGHBOR_OFFSETS`].
pub const CENTER_INDEX: usize = 4;

/// The center tile plus a `buffer`-pixel halo taken from its neighbors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StitchedCanvas {
    pixels: Vec<u8>,
    width: u32,
    height: u32,
    tile_width: u32,
    tile_height: u32,
    buffer: u32,
}

impl StitchedCanvas {
    /// RGBA bytes, row-major.
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Canvas width (`tile_width + 2 * buffer`).
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Canvas height (`tile_height + 2 * buffer`).
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Width of the source tiles.
    pub fn tile_width(&self) -> u32 {
        self.tile_width
    }

    /// Height of the source tiles.
    pub fn tile_height(&self) -> u32 {
        self.tile_height
    }

    /// Halo width in pixels.
    pub fn buffer(&self) -> u32 {
        self.buffer
    }

    /// RGBA value of one canvas pixel.
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let idx = (y as usize * self.width as usize + x as usize) * 4;
        [
            self.pixels[idx],
            self.pixels[idx + 1],
            self.pixels[idx + 2],
            self.pixels[idx + 3],
        ]
    }
}

/// Fetch the 3x3 neighborhood of `center` and stitch it into a buffered canvas.
///
/// `fetch` returning `None` marks that neighbor as missing; its pixels are
/// filled with [`NEUTRAL_SENTINEL`]. Returns `None` when all nine are missing.
pub fn assemble<F>(center: TileAddress, mut fetch: F, buffer: u32) -> Option<StitchedCanvas>
where
    F: FnMut(TileAddress) -> Option<RasterTile>,
{
    let tiles: Vec<Option<RasterTile>> = NEIGHBOR_OFFSETS
        .iter()
        .map(|&(dx, dy)| center.neighbor(dx, dy).and_then(&mut fetch))
        .collect();
    composite(&tiles, buffer)
}

/// Stitch nine already-fetched tiles (ordered as [`NEIGHBOR_OFFSETS`]).
///
/// Tile dimensions come from the center tile, or from the first present
/// tile if the center is missing. Tiles of any other size are treated as
/// missing. A `buffer` wider than the tile is clamped to the tile size.
pub fn composite(tiles: &[Option<RasterTile>], buffer: u32) -> Option<StitchedCanvas> {
    debug_assert_eq!(tiles.len(), NEIGHBOR_OFFSETS.len());

    let reference = tiles
        .get(CENTER_INDEX)
        .and_then(Option::as_ref)
        .or_else(|| tiles.iter().flatten().next())?;
    let (tile_width, tile_height) = reference.dimensions();

    // The halo cannot reach past the 3x3 neighborhood
    let halo = buffer.min(tile_width).min(tile_height);
    if halo < buffer {
        debug!(buffer, tile_width, tile_height, halo, "buffer clamped to tile size");
    }
    let buffer = halo;

    let slots: Vec<Option<&RasterTile>> = tiles
        .iter()
        .enumerate()
        .map(|(i, tile)| match tile {
            Some(t) if t.dimensions() == (tile_width, tile_height) => Some(t),
            Some(t) => {
                let (dx, dy) = NEIGHBOR_OFFSETS[i];
                warn!(
                    dx,
                    dy,
                    width = t.width(),
                    height = t.height(),
                    expected_width = tile_width,
                    expected_height = tile_height,
                    "neighbor tile size mismatch, treating as missing"
                );
                None
            }
            None => None,
        })
        .collect();

    let present = slots.iter().filter(|s| s.is_some()).count();
    metrics::histogram!(metric_defs::NEIGHBORS_PRESENT.name).record(present as f64);

    let width = tile_width + 2 * buffer;
    let height = tile_height + 2 * buffer;
    let mut pixels = Vec::with_capacity(width as usize * height as usize * 4);

    let (tw, th, b) = (tile_width as i64, tile_height as i64, buffer as i64);
    for wy in 0..height as i64 {
        // Row in the conceptual 3*tw x 3*th canvas
        let cy = th - b + wy;
        let (row, ly) = (cy.div_euclid(th), cy.rem_euclid(th));
        for wx in 0..width as i64 {
            let cx = tw - b + wx;
            let (col, lx) = (cx.div_euclid(tw), cx.rem_euclid(tw));
            let rgba = if (0..3).contains(&row) && (0..3).contains(&col) {
                slots[(row * 3 + col) as usize]
                    .map(|tile| tile.pixel(lx as u32, ly as u32))
                    .unwrap_or(NEUTRAL_SENTINEL)
            } else {
                NEUTRAL_SENTINEL
            };
            pixels.extend_from_slice(&rgba);
        }
    }

    Some(StitchedCanvas {
        pixels,
        width,
        height,
        tile_width,
        tile_height,
        buffer,
    })
}
