//! Yaw helpers that always rotate along the shortest arc.

use std::f32::consts::{PI, TAU};

/// Wrap an angle into `[-π, π)`.
pub fn wrap_angle(angle: f32) -> f32 {
    (angle + PI).rem_euclid(TAU) - PI
}

/// Signed shortest rotation taking `from` to `to`, in `[-π, π)`.
pub fn shortest_delta(from: f32, to: f32) -> f32 {
    wrap_angle(to - from)
}

/// Move `from` toward `to` by fraction `t` of the shortest arc.
///
/// The result is wrapped, so repeated smoothing never accumulates whole turns.
pub fn lerp_angle(from: f32, to: f32, t: f32) -> f32 {
    wrap_angle(from + shortest_delta(from, to) * t)
}

/// Yaw of a planar heading: zero faces +z, positive turns toward +x.
pub fn heading_yaw(x: f32, z: f32) -> f32 {
    x.atan2(z)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_keeps_small_angles() {
        assert!((wrap_angle(1.0) - 1.0).abs() < 1e-6);
        assert!((wrap_angle(-1.0) + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_wrap_folds_full_turns() {
        assert!((wrap_angle(TAU + 0.5) - 0.5).abs() < 1e-5);
        assert!((wrap_angle(-TAU - 0.5) + 0.5).abs() < 1e-5);
    }

    #[test]
    fn test_wrap_handles_negative_differences() {
        // A plain remainder would leave -5.0 outside the range.
        let wrapped = wrap_angle(-5.0);
        assert!((-PI..PI).contains(&wrapped));
        assert!((wrapped - (TAU - 5.0)).abs() < 1e-5);
    }

    #[test]
    fn test_seam_delta_is_short() {
        let delta = shortest_delta(3.13, -3.13);
        assert!(delta > 0.0, "should turn through the seam, got {delta}");
        assert!(delta < 0.05, "expected a small delta, got {delta}");
    }

    #[test]
    fn test_lerp_across_seam_never_swings_through_zero() {
        let mut facing = 3.13_f32;
        for _ in 0..50 {
            facing = lerp_angle(facing, -3.13, 0.1);
            assert!(facing.abs() > 3.0, "facing swung to {facing}");
        }
    }

    #[test]
    fn test_lerp_full_fraction_reaches_target() {
        let result = lerp_angle(0.2, 1.4, 1.0);
        assert!((result - 1.4).abs() < 1e-5);
    }

    #[test]
    fn test_heading_yaw_axes() {
        assert!(heading_yaw(0.0, 1.0).abs() < 1e-6);
        assert!((heading_yaw(1.0, 0.0) - PI / 2.0).abs() < 1e-6);
        assert!((heading_yaw(0.0, -1.0).abs() - PI).abs() < 1e-6);
    }
}
