//! Buffered canvas to tile-local coordinates.

use crate::isolines::Ring;

/// Shift rings from buffered-canvas space into tile-local pixel space.
///
/// Coordinates are not clamped: geometry in the halo lands slightly outside
/// `[0, tile_width]` and must stay there so neighboring tiles line up.
/// Rings with fewer than two points are dropped.
pub fn translate(rings: Vec<Ring>, buffer: u32) -> Vec<Ring> {
    let offset = buffer as f64;
    rings
        .into_iter()
        .filter(|ring| ring.len() >= 2)
        .map(|ring| ring.into_iter().map(|(x, y)| (x - offset, y - offset)).collect())
        .collect()
}
