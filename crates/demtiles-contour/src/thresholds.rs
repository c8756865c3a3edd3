//! Contour level planning and major/minor classification.

/// Tolerance for the major-level test, absorbing floating drift.
pub const MAJOR_TOLERANCE: f64 = 0.01;

/// All multiples of `minor_interval` within `[min, max]`, ascending.
///
/// Levels are computed as `k * minor_interval` rather than by repeated
/// addition so drift does not accumulate. Returns an empty plan when
/// `min > max` or the interval is not a positive finite number.
pub fn plan_thresholds(min: f64, max: f64, minor_interval: f64) -> Vec<f64> {
    if !(minor_interval > 0.0 && minor_interval.is_finite()) || !(min <= max) {
        return Vec::new();
    }

    let first = (min / minor_interval).ceil() as i64;
    let last = (max / minor_interval).floor() as i64;
    (first..=last).map(|k| k as f64 * minor_interval).collect()
}

/// Whether a level lies on a multiple of `major_interval`.
pub fn is_major(value: f64, major_interval: f64) -> bool {
    (value % major_interval).abs() < MAJOR_TOLERANCE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_ramp() {
        let levels = plan_thresholds(0.0, 100.0, 10.0);
        assert_eq!(
            levels,
            vec![0.0, 10.0, 20.0, 30.0, 40.0, 50.0, 60.0, 70.0, 80.0, 90.0, 100.0]
        );
    }

    #[test]
    fn test_plan_rounds_start_up() {
        let levels = plan_thresholds(-23.4, 41.0, 10.0);
        assert_eq!(levels, vec![-20.0, -10.0, 0.0, 10.0, 20.0, 30.0, 40.0]);
    }

    #[test]
    fn test_plan_flat_tile() {
        assert_eq!(plan_thresholds(100.0, 100.0, 10.0), vec![100.0]);
        assert!(plan_thresholds(101.0, 109.0, 10.0).is_empty());
    }

    #[test]
    fn test_plan_empty_when_min_exceeds_max() {
        assert!(plan_thresholds(50.0, 10.0, 10.0).is_empty());
        assert!(plan_thresholds(0.0, 10.0, 0.0).is_empty());
        assert!(plan_thresholds(f64::NAN, 10.0, 1.0).is_empty());
    }

    #[test]
    fn test_plan_properties() {
        let cases = [
            (-431.7, 8848.2, 20.0),
            (0.1, 0.9, 0.25),
            (-5.0, -1.0, 2.0),
            (1234.5, 1299.9, 5.0),
        ];
        for (min, max, interval) in cases {
            let levels = plan_thresholds(min, max, interval);
            assert!(!levels.is_empty());
            assert!(levels.windows(2).all(|w| w[0] < w[1]));
            assert!(levels[0] >= min && levels[0] <= min + interval);
            assert!(*levels.last().unwrap() <= max);
        }
    }

    #[test]
    fn test_is_major() {
        assert!(is_major(50.0, 50.0));
        assert!(is_major(100.0, 50.0));
        assert!(is_major(0.0, 50.0));
        assert!(is_major(-150.0, 50.0));
        assert!(!is_major(25.0, 50.0));
        assert!(!is_major(-75.0, 50.0));
        assert!(!is_major(10.0, 50.0));
    }

    #[test]
    fn test_is_major_absorbs_drift() {
        assert!(is_major(150.000000001, 50.0));
        assert!(!is_major(49.995, 50.0));
        assert!(is_major(0.30000000000000004, 0.1));
    }
}
