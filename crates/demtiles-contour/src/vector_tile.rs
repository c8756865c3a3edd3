//! Mapbox Vector Tile encoding of contour levels.
//!
//! Each ring becomes one line-string feature in a single `contours` layer,
//! carrying two integer attributes:
//!
//! - `ele`: the level's elevation rounded to the nearest meter
//! - `level`: `1` for major levels, `0` for minor ones

use crate::isolines::ContourLevel;
use crate::Result;
use mvt::{GeomEncoder, GeomType, Tile};

/// Name of the single layer every tile carries.
pub const LAYER_NAME: &str = "contours";

/// Default tile-internal coordinate extent.
pub const DEFAULT_EXTENT: u32 = 4096;

/// Round half up, matching the rounding of common web tooling.
fn round_half_up(value: f64) -> f64 {
    (value + 0.5).floor()
}

/// Scale tile-local pixel coordinates to extent units, dropping points that
/// collapse onto their predecessor.
fn scale_ring(ring: &[(f64, f64)], sx: f64, sy: f64) -> Vec<(f64, f64)> {
    let mut out: Vec<(f64, f64)> = Vec::with_capacity(ring.len());
    for &(x, y) in ring {
        let point = (round_half_up(x * sx), round_half_up(y * sy));
        if out.last() != Some(&point) {
            out.push(point);
        }
    }
    out
}

/// Encode contour levels into MVT bytes.
///
/// Ring coordinates are tile-local pixels; they are rescaled by
/// `extent / tile_width` and `extent / tile_height`, then rounded half up.
/// After rounding, consecutive duplicate points are merged and a ring left
/// with fewer than 2 points is skipped, so a level whose rings all collapse
/// writes no feature.
///
/// Returns the encoded bytes and the number of features written. When no
/// feature survives the result is empty, with no layer at all.
pub fn encode(
    levels: &[ContourLevel],
    tile_width: u32,
    tile_height: u32,
    extent: u32,
) -> Result<(Vec<u8>, usize)> {
    let sx = extent as f64 / tile_width as f64;
    let sy = extent as f64 / tile_height as f64;

    let mut tile = Tile::new(extent);
    let mut layer = tile.create_layer(LAYER_NAME);
    let mut features = 0usize;

    for level in levels {
        let ele = round_half_up(level.value) as i64;
        for ring in &level.rings {
            let points = scale_ring(ring, sx, sy);
            if points.len() < 2 {
                continue;
            }

            let mut encoder = GeomEncoder::new(GeomType::Linestring);
            for (x, y) in points {
                encoder = encoder.point(x, y)?;
            }
            let geom_data = encoder.encode()?;

            let mut feature = layer.into_feature(geom_data);
            feature.set_id(features as u64);
            if ele < 0 {
                feature.add_tag_sint("ele", ele);
            } else {
                feature.add_tag_uint("ele", ele as u64);
            }
            feature.add_tag_uint("level", u64::from(level.is_major));
            layer = feature.into_layer();
            features += 1;
        }
    }

    if features == 0 {
        return Ok((Vec::new(), 0));
    }

    tile.add_layer(layer)?;
    Ok((tile.to_bytes()?, features))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn level(value: f64, is_major: bool, rings: Vec<Vec<(f64, f64)>>) -> ContourLevel {
        ContourLevel {
            value,
            is_major,
            rings,
        }
    }

    #[test]
    fn test_round_half_up() {
        assert_eq!(round_half_up(2.5), 3.0);
        assert_eq!(round_half_up(-2.5), -2.0);
        assert_eq!(round_half_up(-2.6), -3.0);
        assert_eq!(round_half_up(10.49), 10.0);
    }

    #[test]
    fn test_scale_ring_dedups_collapsed_points() {
        let ring = [(0.0, 0.0), (0.001, 0.001), (1.0, 0.5), (1.0, 0.5)];
        let scaled = scale_ring(&ring, 16.0, 16.0);
        assert_eq!(scaled, vec![(0.0, 0.0), (16.0, 8.0)]);
    }

    #[test]
    fn test_scale_ring_keeps_overflow() {
        let ring = [(-0.5, 256.5), (128.0, 0.0)];
        let scaled = scale_ring(&ring, 4096.0 / 256.0, 4096.0 / 256.0);
        assert_eq!(scaled, vec![(-8.0, 4104.0), (2048.0, 0.0)]);
    }

    #[test]
    fn test_encode_empty_is_zero_length() {
        let (bytes, features) = encode(&[], 256, 256, 4096).unwrap();
        assert!(bytes.is_empty());
        assert_eq!(features, 0);
    }

    #[test]
    fn test_encode_skips_degenerate_rings() {
        let levels = vec![level(10.0, false, vec![vec![(1.0, 1.0), (1.0001, 1.0)]])];
        let (bytes, features) = encode(&levels, 256, 256, 4096).unwrap();
        assert!(bytes.is_empty());
        assert_eq!(features, 0);
    }

    #[test]
    fn test_encode_counts_features() {
        let levels = vec![
            level(-20.0, false, vec![vec![(0.0, 0.0), (10.0, 10.0)]]),
            level(
                50.0,
                true,
                vec![
                    vec![(5.0, 5.0), (6.0, 5.0), (6.0, 6.0), (5.0, 5.0)],
                    vec![(100.0, 0.0), (100.0, 256.0)],
                ],
            ),
        ];
        let (bytes, features) = encode(&levels, 256, 256, 4096).unwrap();
        assert_eq!(features, 3);
        assert!(!bytes.is_empty());

        let layer_name = LAYER_NAME.as_bytes();
        assert!(bytes.windows(layer_name.len()).any(|w| w == layer_name));
        assert!(bytes.windows(3).any(|w| w == b"ele"));
        assert!(bytes.windows(5).any(|w| w == b"level"));
    }

    #[test]
    fn test_encode_is_deterministic() {
        let ring = vec![(3.2, 7.9), (200.4, 12.1), (255.9, 255.9)];
        let levels = vec![level(120.0, false, vec![ring])];
        let a = encode(&levels, 256, 256, 4096).unwrap();
        let b = encode(&levels, 256, 256, 4096).unwrap();
        assert_eq!(a, b);
    }
}
