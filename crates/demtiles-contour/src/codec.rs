//! Raster codecs: compressed tile bytes to RGBA pixels.

use crate::tile::RasterTile;
use crate::Result;

/// Decodes compressed raster bytes into an RGBA tile.
pub trait RasterCodec: Send + Sync {
    /// Decode one tile. Corrupt or unsupported input is an error.
    fn decode(&self, bytes: &[u8]) -> Result<RasterTile>;
}

/// Codec backed by the `image` crate (PNG, WebP, JPEG).
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageCodec;

impl RasterCodec for ImageCodec {
    fn decode(&self, bytes: &[u8]) -> Result<RasterTile> {
        let rgba = image::load_from_memory(bytes)?.to_rgba8();
        let (width, height) = rgba.dimensions();
        RasterTile::new(width, height, rgba.into_raw())
    }
}
