//! Isoline extraction with marching squares.
//!
//! ## Grid Geometry
//!
//! Sample `(i, j)` of an [`ElevationGrid`] sits at the center of its pixel,
//! `(i + 0.5, j + 0.5)`. Every 2x2 block of samples forms one cell; a
//! contour crossing an edge between two samples is placed by linear
//! interpolation. A sample counts as inside the level when `value >= level`.
//!
//! Only interior cells are traced, so lines that reach the grid border stay
//! open instead of being closed along the border.
//!
//! ## Orientation
//!
//! Every segment is emitted with the inside region on its left. Adjacent
//! cells therefore agree on direction, which lets segments be chained into
//! polylines by matching the end edge of one with the start edge of the
//! next.

use crate::encoding::ElevationGrid;
use crate::thresholds::is_major;
use rayon::prelude::*;
use std::collections::{HashMap, VecDeque};

/// An ordered sequence of points in canvas pixel space.
///
/// A closed ring repeats its first point at the end.
pub type Ring = Vec<(f64, f64)>;

/// All rings traced at one threshold.
#[derive(Debug, Clone, PartialEq)]
pub struct ContourLevel {
    /// Elevation of the threshold.
    pub value: f64,
    /// Whether the value lies on a major interval.
    pub is_major: bool,
    /// Traced rings, in canvas pixel space.
    pub rings: Vec<Ring>,
}

/// Traces isolines of a grid at a single threshold.
pub trait IsolineExtractor: Send + Sync {
    /// Rings where the grid crosses `threshold`.
    ///
    /// Must be deterministic: identical inputs give identical rings in
    /// identical order.
    fn trace(&self, grid: &ElevationGrid, threshold: f64) -> Vec<Ring>;
}

/// Trace every threshold and classify the resulting levels.
///
/// Thresholds with no crossings are omitted. Output order follows
/// `thresholds`.
pub fn extract_levels(
    extractor: &dyn IsolineExtractor,
    grid: &ElevationGrid,
    thresholds: &[f64],
    major_interval: f64,
) -> Vec<ContourLevel> {
    thresholds
        .par_iter()
        .filter_map(|&value| {
            let rings = extractor.trace(grid, value);
            if rings.is_empty() {
                return None;
            }
            Some(ContourLevel {
                value,
                is_major: is_major(value, major_interval),
                rings,
            })
        })
        .collect()
}

/// Default marching squares tracer.
#[derive(Debug, Clone, Copy, Default)]
pub struct MarchingSquares;

/// Which cell edges a contour segment enters and leaves through.
#[derive(Debug, Clone, Copy)]
enum Side {
    Top,
    Right,
    Bottom,
    Left,
}

use Side::*;

/// Segments per cell case, as (from, to) sides.
///
/// Case bits: bottom-left = 1, bottom-right = 2, top-right = 4, top-left = 8.
/// Saddles (5 and 10) are resolved as two separate corners.
const CASES: [&[(Side, Side)]; 16] = [
    &[],
    &[(Bottom, Left)],
    &[(Right, Bottom)],
    &[(Right, Left)],
    &[(Top, Right)],
    &[(Bottom, Left), (Top, Right)],
    &[(Top, Bottom)],
    &[(Top, Left)],
    &[(Left, Top)],
    &[(Bottom, Top)],
    &[(Left, Top), (Right, Bottom)],
    &[(Right, Top)],
    &[(Left, Right)],
    &[(Bottom, Right)],
    &[(Left, Bottom)],
    &[],
];

/// A polyline under construction, as a run of edge keys.
struct Fragment {
    start: usize,
    end: usize,
    edges: VecDeque<usize>,
}

/// Chains oriented segments into polylines keyed by grid edge.
#[derive(Default)]
struct Stitcher {
    fragments: Vec<Option<Fragment>>,
    by_start: HashMap<usize, usize>,
    by_end: HashMap<usize, usize>,
    closed: Vec<VecDeque<usize>>,
}

impl Stitcher {
    fn push(&mut self, from: usize, to: usize) {
        let before = self.by_end.remove(&from);
        let after = self.by_start.remove(&to);

        match (before, after) {
            (Some(f), Some(g)) if f == g => {
                if let Some(mut fragment) = self.fragments[f].take() {
                    fragment.edges.push_back(to);
                    self.closed.push(fragment.edges);
                }
            }
            (Some(f), Some(g)) => {
                let Some(tail) = self.fragments[g].take() else {
                    return;
                };
                if let Some(head) = self.fragments[f].as_mut() {
                    head.edges.extend(tail.edges);
                    head.end = tail.end;
                }
                self.by_end.insert(tail.end, f);
            }
            (Some(f), None) => {
                if let Some(fragment) = self.fragments[f].as_mut() {
                    fragment.edges.push_back(to);
                    fragment.end = to;
                }
                self.by_end.insert(to, f);
            }
            (None, Some(g)) => {
                if let Some(fragment) = self.fragments[g].as_mut() {
                    fragment.edges.push_front(from);
                    fragment.start = from;
                }
                self.by_start.insert(from, g);
            }
            (None, None) => {
                let idx = self.fragments.len();
                self.fragments.push(Some(Fragment {
                    start: from,
                    end: to,
                    edges: VecDeque::from([from, to]),
                }));
                self.by_start.insert(from, idx);
                self.by_end.insert(to, idx);
            }
        }
    }

    /// Closed rings in completion order, then open lines in creation order.
    fn finish(self) -> impl Iterator<Item = VecDeque<usize>> {
        self.closed
            .into_iter()
            .chain(self.fragments.into_iter().flatten().map(|f| f.edges))
    }
}

impl MarchingSquares {
    /// Key of the horizontal edge from sample (x, y) to (x + 1, y).
    fn horizontal(width: usize, x: usize, y: usize) -> usize {
        (y * width + x) * 2
    }

    /// Key of the vertical edge from sample (x, y) to (x, y + 1).
    fn vertical(width: usize, x: usize, y: usize) -> usize {
        (y * width + x) * 2 + 1
    }

    fn edge_key(width: usize, x: usize, y: usize, side: Side) -> usize {
        match side {
            Top => Self::horizontal(width, x, y),
            Bottom => Self::horizontal(width, x, y + 1),
            Left => Self::vertical(width, x, y),
            Right => Self::vertical(width, x + 1, y),
        }
    }

    /// Interpolated crossing point of an edge, in pixel space.
    fn edge_point(grid: &ElevationGrid, key: usize, threshold: f64) -> (f64, f64) {
        let width = grid.width();
        let (x, y) = ((key / 2) % width, (key / 2) / width);
        let a = grid.get(x, y);
        let (px, py) = (x as f64 + 0.5, y as f64 + 0.5);
        if key % 2 == 0 {
            let b = grid.get(x + 1, y);
            (px + (threshold - a) / (b - a), py)
        } else {
            let b = grid.get(x, y + 1);
            (px, py + (threshold - a) / (b - a))
        }
    }
}

impl IsolineExtractor for MarchingSquares {
    fn trace(&self, grid: &ElevationGrid, threshold: f64) -> Vec<Ring> {
        let (width, height) = (grid.width(), grid.height());
        if width < 2 || height < 2 {
            return Vec::new();
        }

        let inside = |x: usize, y: usize| grid.get(x, y) >= threshold;
        let mut stitcher = Stitcher::default();

        for y in 0..height - 1 {
            for x in 0..width - 1 {
                let case = inside(x, y + 1) as usize
                    | (inside(x + 1, y + 1) as usize) << 1
                    | (inside(x + 1, y) as usize) << 2
                    | (inside(x, y) as usize) << 3;
                for &(from, to) in CASES[case] {
                    stitcher.push(
                        Self::edge_key(width, x, y, from),
                        Self::edge_key(width, x, y, to),
                    );
                }
            }
        }

        stitcher
            .finish()
            .map(|edges| {
                edges
                    .into_iter()
                    .map(|key| Self::edge_point(grid, key, threshold))
                    .collect()
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn grid(width: usize, height: usize, f: impl Fn(usize, usize) -> f64) -> ElevationGrid {
        let mut values = Vec::with_capacity(width * height);
        for y in 0..height {
            for x in 0..width {
                values.push(f(x, y));
            }
        }
        ElevationGrid::new(width, height, values).unwrap()
    }

    #[test]
    fn test_flat_grid_has_no_crossings() {
        let flat = grid(2, 2, |_, _| 100.0);
        assert!(MarchingSquares.trace(&flat, 100.0).is_empty());
        assert!(MarchingSquares.trace(&flat, 90.0).is_empty());
        assert!(MarchingSquares.trace(&flat, 110.0).is_empty());
    }

    #[test]
    fn test_ramp_traces_vertical_line() {
        let ramp = grid(5, 3, |x, _| x as f64 * 25.0);
        let rings = MarchingSquares.trace(&ramp, 50.0);

        assert_eq!(rings.len(), 1);
        assert_eq!(rings[0], vec![(2.5, 0.5), (2.5, 1.5), (2.5, 2.5)]);
    }

    #[test]
    fn test_interpolates_between_samples() {
        let ramp = grid(3, 2, |x, _| x as f64 * 10.0);
        let rings = MarchingSquares.trace(&ramp, 4.0);

        assert_eq!(rings.len(), 1);
        for &(x, _) in &rings[0] {
            assert_relative_eq!(x, 0.9, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_peak_traces_closed_ring() {
        let peak = grid(3, 3, |x, y| if (x, y) == (1, 1) { 10.0 } else { 0.0 });
        let rings = MarchingSquares.trace(&peak, 5.0);

        assert_eq!(rings.len(), 1);
        let ring = &rings[0];
        assert_eq!(ring.len(), 5);
        assert_eq!(ring.first(), ring.last());
        for point in [(1.0, 1.5), (2.0, 1.5), (1.5, 1.0), (1.5, 2.0)] {
            assert!(ring.contains(&point), "missing {:?} in {:?}", point, ring);
        }
    }

    #[test]
    fn test_pit_traces_closed_ring() {
        let inside = |x: usize, y: usize| (1..3).contains(&x) && (1..3).contains(&y);
        let pit = grid(4, 4, |x, y| if inside(x, y) { 0.0 } else { 10.0 });
        let rings = MarchingSquares.trace(&pit, 5.0);

        assert_eq!(rings.len(), 1);
        assert_eq!(rings[0].len(), 9);
        assert_eq!(rings[0].first(), rings[0].last());
    }

    #[test]
    fn test_saddle_gives_two_lines() {
        let saddle = grid(2, 2, |x, y| if x == y { 10.0 } else { 0.0 });
        let rings = MarchingSquares.trace(&saddle, 5.0);

        assert_eq!(rings.len(), 2);
        assert!(rings.iter().all(|r| r.len() == 2));
    }

    #[test]
    fn test_degenerate_grid() {
        let column = grid(1, 5, |_, y| y as f64);
        assert!(MarchingSquares.trace(&column, 2.0).is_empty());
    }

    #[test]
    fn test_trace_is_deterministic() {
        let bumpy = grid(16, 16, |x, y| ((x * 7 + y * 13) % 11) as f64 * 10.0);
        let first = MarchingSquares.trace(&bumpy, 45.0);
        let second = MarchingSquares.trace(&bumpy, 45.0);
        assert!(!first.is_empty());
        assert_eq!(first, second);
    }

    #[test]
    fn test_extract_levels_classifies_ramp() {
        let ramp = grid(11, 4, |x, _| x as f64 * 10.0);
        let thresholds: Vec<f64> = (0..=10).map(|k| k as f64 * 10.0).collect();
        let levels = extract_levels(&MarchingSquares, &ramp, &thresholds, 50.0);

        let values: Vec<f64> = levels.iter().map(|l| l.value).collect();
        assert_eq!(values, (1..=10).map(|k| k as f64 * 10.0).collect::<Vec<_>>());

        let majors: Vec<f64> = levels.iter().filter(|l| l.is_major).map(|l| l.value).collect();
        assert_eq!(majors, vec![50.0, 100.0]);

        let top = levels.last().unwrap();
        assert_eq!(top.rings[0][0].0, 10.5);
    }
}
