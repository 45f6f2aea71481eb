//! Utility maths functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use num_traits::Float;

/// Map a value from one range into another.
pub fn lin_map<T>(source_range: (T, T), target_range: (T, T), value: T) -> T
where
    T: Float
{
    target_range.0
        + ((value - source_range.0)
        * (target_range.1 - target_range.0)
        / (source_range.1 - source_range.0))
}

pub fn clamp<T>(value: &T, min: &T, max: &T) -> T
where
    T: Float + std::ops::Mul + std::ops::Add + std::ops::AddAssign
{
    let mut ret = *value;

    if ret > *max {
        ret = *max
    }
    if ret < *min {
        ret = *min
    }

    ret
}

/// Step `current` towards `target` by at most `max_step`, without
/// overshooting.
///
/// `max_step` must be non-negative. Once `current` is within `max_step` of
/// `target` the target itself is returned, so repeated application is stable.
pub fn move_toward<T>(current: T, target: T, max_step: T) -> T
where
    T: Float
{
    let delta = target - current;

    if delta.abs() <= max_step {
        target
    }
    else {
        current + max_step * delta.signum()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_lin_map() {
        assert_eq!(lin_map((0f64, 1f64), (0f64, 10f64), 0.5f64), 5f64);
        assert_eq!(lin_map((-1f64, 1f64), (0f64, 180f64), -1f64), 0f64);
        assert_eq!(lin_map((-1f64, 1f64), (0f64, 180f64), 1f64), 180f64);
        assert_eq!(lin_map((-1f64, 1f64), (0f64, 180f64), 0f64), 90f64);
    }

    #[test]
    fn test_clamp() {
        assert_eq!(clamp(&1.5f64, &-1f64, &1f64), 1f64);
        assert_eq!(clamp(&-1.5f64, &-1f64, &1f64), -1f64);
        assert_eq!(clamp(&0.25f64, &-1f64, &1f64), 0.25f64);
    }

    #[test]
    fn test_move_toward() {
        // Steps are limited and correctly signed
        assert_eq!(move_toward(0f64, 1f64, 0.1f64), 0.1f64);
        assert_eq!(move_toward(0f64, -1f64, 0.1f64), -0.1f64);

        // No overshoot when the target is within one step
        assert_eq!(move_toward(0.95f64, 1f64, 0.1f64), 1f64);
        assert_eq!(move_toward(-0.95f64, -1f64, 0.1f64), -1f64);

        // Stable once at the target
        assert_eq!(move_toward(1f64, 1f64, 0.1f64), 1f64);
        assert_eq!(move_toward(0f64, 0f64, 0.1f64), 0f64);
    }
}
