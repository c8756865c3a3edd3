//! Helpers shared by the integration tests.
//!
//! Encoded tiles are read back with `geozero`'s MVT protobuf bindings.

#![allow(dead_code)]

pub use geozero::mvt::tile::{Feature, Layer, Value};
use geozero::mvt::{Message, Tile};

/// MVT geometry type of line strings.
pub const LINESTRING: i32 = 2;

/// Decode every layer of a tile.
pub fn read_tile(buf: &[u8]) -> Vec<Layer> {
    Tile::decode(buf).expect("valid vector tile").layers
}

/// Integer value of an attribute, whichever integer field carries it.
pub fn integer(value: &Value) -> Option<i64> {
    value
        .int_value
        .or(value.sint_value)
        .or(value.uint_value.map(|v| v as i64))
}

/// Integer attribute `key` of one feature.
pub fn attribute(layer: &Layer, feature: &Feature, key: &str) -> Option<i64> {
    feature
        .tags
        .chunks_exact(2)
        .find(|kv| layer.keys[kv[0] as usize] == key)
        .and_then(|kv| integer(&layer.values[kv[1] as usize]))
}

/// `(ele, level)` of one feature.
pub fn ele_level(layer: &Layer, feature: &Feature) -> (i64, i64) {
    (
        attribute(layer, feature, "ele").expect("ele is an integer"),
        attribute(layer, feature, "level").expect("level is an integer"),
    )
}

fn zigzag(n: u32) -> i64 {
    ((n >> 1) as i64) ^ -((n & 1) as i64)
}

/// Points of a line-string geometry, in extent units.
pub fn line_points(geometry: &[u32]) -> Vec<(i64, i64)> {
    let mut points = Vec::new();
    let (mut x, mut y) = (0i64, 0i64);
    let mut i = 0;
    while i < geometry.len() {
        let command = geometry[i] & 7;
        let count = geometry[i] >> 3;
        i += 1;
        if command == 7 {
            continue;
        }
        for _ in 0..count {
            x += zigzag(geometry[i]);
            y += zigzag(geometry[i + 1]);
            i += 2;
            points.push((x, y));
        }
    }
    points
}

/// RGBA pixel encoding an integer elevation in terrarium.
pub fn terrarium(elevation: i32) -> [u8; 4] {
    let v = (elevation + 32768) as u32;
    [(v / 256) as u8, (v % 256) as u8, 0, 255]
}
