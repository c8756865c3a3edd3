//! Tile addressing and decoded raster tiles.
//!
//! ## Tile Coordinate System
//!
//! Uses the OpenStreetMap Slippy Map tile naming convention:
//! - `z` is the zoom level (0-22)
//! - `x` is the column (0 to 2^z - 1, from west to east)
//! - `y` is the row (0 to 2^z - 1, from north to south)

use crate::{ContourError, Result};
use std::f64::consts::PI;

/// Maximum supported zoom level.
pub const MAX_ZOOM: u8 = 22;

/// Pixel used wherever a neighbor tile is missing: mid-gray, fully opaque.
pub const NEUTRAL_SENTINEL: [u8; 4] = [128, 128, 128, 255];

/// OSM-style tile address (z, x, y).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileAddress {
    /// Zoom level.
    pub z: u8,
    /// X coordinate (column, 0 at 180°W, increases eastward).
    pub x: u32,
    /// Y coordinate (row, 0 at ~85.05°N, increases southward).
    pub y: u32,
}

impl TileAddress {
    /// Create a tile address, validating it against the zoom level.
    pub fn new(z: u8, x: u32, y: u32) -> Result<Self> {
        if z > MAX_ZOOM {
            return Err(ContourError::InvalidZoomLevel(z));
        }
        let n = Self::tiles_per_axis(z);
        if x as u64 >= n || y as u64 >= n {
            return Err(ContourError::InvalidTileAddress { z, x, y });
        }
        Ok(Self { z, x, y })
    }

    fn tiles_per_axis(z: u8) -> u64 {
        1u64 << z
    }

    /// Convert latitude/longitude to the containing tile.
    ///
    /// Uses the OpenStreetMap Slippy Map tiling formula:
    /// - x = floor((lon + 180) / 360 * 2^z)
    /// - y = floor((1 - ln(tan(lat) + sec(lat)) / π) / 2 * 2^z)
    pub fn from_lat_lon(lat: f64, lon: f64, z: u8) -> Result<Self> {
        if z > MAX_ZOOM {
            return Err(ContourError::InvalidZoomLevel(z));
        }

        // The exact Web Mercator limit is ±85.0511287798° (arctan(sinh(π)))
        let lat = lat.clamp(-85.0511, 85.0511);
        let n = Self::tiles_per_axis(z) as f64;

        let x = ((lon + 180.0) / 360.0 * n).floor();
        let lat_rad = lat.to_radians();
        let y = ((1.0 - (lat_rad.tan() + 1.0 / lat_rad.cos()).ln() / PI) / 2.0 * n).floor();

        // Clamp to valid range (handles edge cases at exactly ±180°)
        let max_coord = n - 1.0;
        Ok(Self {
            z,
            x: x.clamp(0.0, max_coord) as u32,
            y: y.clamp(0.0, max_coord) as u32,
        })
    }

    /// Get the bounding box for this tile.
    ///
    /// Returns (min_lat, max_lat, min_lon, max_lon).
    pub fn bounds(&self) -> (f64, f64, f64, f64) {
        let n = Self::tiles_per_axis(self.z) as f64;

        let min_lon = self.x as f64 / n * 360.0 - 180.0;
        let max_lon = (self.x as f64 + 1.0) / n * 360.0 - 180.0;

        let max_lat = (PI * (1.0 - 2.0 * self.y as f64 / n)).sinh().atan().to_degrees();
        let min_lat = (PI * (1.0 - 2.0 * (self.y as f64 + 1.0) / n))
            .sinh()
            .atan()
            .to_degrees();

        (min_lat, max_lat, min_lon, max_lon)
    }

    /// The tile offset by (`dx`, `dy`) from this one.
    ///
    /// Columns wrap around the antimeridian. Rows past either pole have no
    /// tile and return `None`.
    pub fn neighbor(&self, dx: i32, dy: i32) -> Option<Self> {
        let n = Self::tiles_per_axis(self.z) as i64;
        let y = self.y as i64 + dy as i64;
        if y < 0 || y >= n {
            return None;
        }
        let x = (self.x as i64 + dx as i64).rem_euclid(n);
        Some(Self {
            z: self.z,
            x: x as u32,
            y: y as u32,
        })
    }

    /// Substitute `{z}`, `{x}` and `{y}` in a URL or path template.
    pub fn fill_template(&self, template: &str) -> String {
        template
            .replace("{z}", &self.z.to_string())
            .replace("{x}", &self.x.to_string())
            .replace("{y}", &self.y.to_string())
    }
}

impl std::fmt::Display for TileAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.z, self.x, self.y)
    }
}

/// A decoded raster tile: `width * height` RGBA pixels, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterTile {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl RasterTile {
    /// Wrap an RGBA buffer, checking its length against the dimensions.
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self> {
        let expected = width as usize * height as usize * 4;
        if width == 0 || height == 0 || pixels.len() != expected {
            return Err(ContourError::InvalidRaster(format!(
                "{}x{} tile needs {} bytes, got {}",
                width,
                height,
                expected,
                pixels.len()
            )));
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// A tile where every pixel has the same RGBA value.
    pub fn filled(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let pixels = rgba
            .iter()
            .copied()
            .cycle()
            .take(width as usize * height as usize * 4)
            .collect();
        Self {
            width,
            height,
            pixels,
        }
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Get the dimensions of this tile in pixels.
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Raw RGBA bytes.
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// RGBA value of one pixel.
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tile_address_validation() {
        assert!(TileAddress::new(0, 0, 0).is_ok());
        assert!(TileAddress::new(2, 3, 3).is_ok());
        assert!(matches!(
            TileAddress::new(2, 4, 0),
            Err(ContourError::InvalidTileAddress { z: 2, x: 4, y: 0 })
        ));
        assert!(matches!(
            TileAddress::new(23, 0, 0),
            Err(ContourError::InvalidZoomLevel(23))
        ));
    }

    #[test]
    fn test_tile_address_equator() {
        let addr = TileAddress::from_lat_lon(0.0, 0.0, 12).unwrap();
        // x=2048 is the tile just east of the prime meridian, y=2048 just south of the equator
        assert_eq!(addr, TileAddress { z: 12, x: 2048, y: 2048 });
    }

    #[test]
    fn test_tile_address_roundtrip() {
        let test_points = [
            (47.6062, -122.3321), // Seattle
            (46.8523, -121.7603), // Mount Rainier
            (-33.8688, 151.2093), // Sydney
            (27.9881, 86.9250),   // Everest
        ];

        for (lat, lon) in test_points {
            let addr = TileAddress::from_lat_lon(lat, lon, 12).unwrap();
            let (min_lat, max_lat, min_lon, max_lon) = addr.bounds();

            assert!(
                lat >= min_lat && lat <= max_lat,
                "lat {} not in [{}, {}] for tile {}",
                lat,
                min_lat,
                max_lat,
                addr
            );
            assert!(
                lon >= min_lon && lon <= max_lon,
                "lon {} not in [{}, {}] for tile {}",
                lon,
                min_lon,
                max_lon,
                addr
            );
        }
    }

    #[test]
    fn test_neighbor_wraps_columns() {
        let addr = TileAddress::new(3, 0, 4).unwrap();
        assert_eq!(addr.neighbor(-1, 0), Some(TileAddress { z: 3, x: 7, y: 4 }));
        assert_eq!(addr.neighbor(1, 1), Some(TileAddress { z: 3, x: 1, y: 5 }));

        let east = TileAddress::new(3, 7, 4).unwrap();
        assert_eq!(east.neighbor(1, -1), Some(TileAddress { z: 3, x: 0, y: 3 }));
    }

    #[test]
    fn test_neighbor_past_pole_is_none() {
        let north = TileAddress::new(3, 2, 0).unwrap();
        assert_eq!(north.neighbor(0, -1), None);

        let south = TileAddress::new(3, 2, 7).unwrap();
        assert_eq!(south.neighbor(1, 1), None);

        let world = TileAddress::new(0, 0, 0).unwrap();
        assert_eq!(world.neighbor(-1, 0), Some(world));
    }

    #[test]
    fn test_fill_template() {
        let addr = TileAddress::new(12, 655, 1407).unwrap();
        assert_eq!(
            addr.fill_template("https://example.com/terrarium/{z}/{x}/{y}.png"),
            "https://example.com/terrarium/12/655/1407.png"
        );
    }

    #[test]
    fn test_raster_tile_length_checked() {
        assert!(RasterTile::new(2, 2, vec![0; 16]).is_ok());
        assert!(matches!(
            RasterTile::new(2, 2, vec![0; 15]),
            Err(ContourError::InvalidRaster(_))
        ));
        assert!(RasterTile::new(0, 2, Vec::new()).is_err());
    }

    #[test]
    fn test_raster_tile_filled() {
        let tile = RasterTile::filled(3, 2, NEUTRAL_SENTINEL);
        assert_eq!(tile.pixels().len(), 24);
        assert_eq!(tile.pixel(2, 1), NEUTRAL_SENTINEL);
    }
}
