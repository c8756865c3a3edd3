//! Elevation encodings for RGB terrain tiles.

use crate::assemble::StitchedCanvas;
use crate::{ContourError, Result};
use std::str::FromStr;

/// How a terrain tile packs elevation into the RGB channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElevationEncoding {
    /// Mapzen/AWS terrarium: `r*256 + g + b/256 - 32768`.
    Terrarium,
    /// Mapbox Terrain-RGB: `-10000 + (r*65536 + g*256 + b) * 0.1`.
    Mapbox,
}

impl ElevationEncoding {
    /// Elevation in meters for one pixel.
    pub fn decode(&self, r: u8, g: u8, b: u8) -> f64 {
        let (r, g, b) = (r as f64, g as f64, b as f64);
        match self {
            ElevationEncoding::Terrarium => r * 256.0 + g + b / 256.0 - 32768.0,
            ElevationEncoding::Mapbox => -10000.0 + (r * 65536.0 + g * 256.0 + b) * 0.1,
        }
    }

    /// Lowercase name, as accepted by [`FromStr`].
    pub fn as_str(&self) -> &'static str {
        match self {
            ElevationEncoding::Terrarium => "terrarium",
            ElevationEncoding::Mapbox => "mapbox",
        }
    }
}

impl FromStr for ElevationEncoding {
    type Err = ContourError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "terrarium" => Ok(ElevationEncoding::Terrarium),
            "mapbox" => Ok(ElevationEncoding::Mapbox),
            other => Err(ContourError::UnknownEncoding(other.to_string())),
        }
    }
}

impl std::fmt::Display for ElevationEncoding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Row-major grid of elevations in meters.
#[derive(Debug, Clone, PartialEq)]
pub struct ElevationGrid {
    width: usize,
    height: usize,
    values: Vec<f64>,
}

impl ElevationGrid {
    /// Wrap a row-major value buffer.
    pub fn new(width: usize, height: usize, values: Vec<f64>) -> Result<Self> {
        if values.len() != width * height {
            return Err(ContourError::InvalidRaster(format!(
                "{}x{} grid needs {} values, got {}",
                width,
                height,
                width * height,
                values.len()
            )));
        }
        Ok(Self {
            width,
            height,
            values,
        })
    }

    /// Decode every pixel of a stitched canvas.
    pub fn from_canvas(canvas: &StitchedCanvas, encoding: ElevationEncoding) -> Self {
        let values = canvas
            .pixels()
            .chunks_exact(4)
            .map(|px| encoding.decode(px[0], px[1], px[2]))
            .collect();
        Self {
            width: canvas.width() as usize,
            height: canvas.height() as usize,
            values,
        }
    }

    /// Grid width.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Grid height.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Row-major values.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Value at column `x`, row `y`.
    pub fn get(&self, x: usize, y: usize) -> f64 {
        self.values[y * self.width + x]
    }

    /// Smallest and largest value, or `None` for an empty grid.
    pub fn range(&self) -> Option<(f64, f64)> {
        self.values.iter().fold(None, |acc, &v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
    }
}
