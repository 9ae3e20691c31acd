//! Volume level conversion between percentages and device scalars.
//!
//! Dial-facing levels are integer percentages in `[0, 100]`. Devices store
//! volume as a normalized scalar in `[0.0, 1.0]`. Both directions clamp, so
//! neither conversion can fail.

/// Lowest volume level.
pub const MIN_LEVEL: i32 = 0;
/// Highest volume level.
pub const MAX_LEVEL: i32 = 100;

/// Convert a (possibly out of range) level to a device scalar.
///
/// Levels below 0 or above 100 saturate, so `to_system(150) == to_system(100)`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn to_system(level: i32) -> f32 {
    level.clamp(MIN_LEVEL, MAX_LEVEL) as f32 / 100.0
}

/// Convert a device scalar to a level.
///
/// The scalar is scaled and rounded to the nearest percent, then clamped.
/// A NaN scalar maps to 0.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn from_system(raw: f32) -> u8 {
    let scaled = (raw * 100.0).round();
    if scaled.is_nan() {
        return 0;
    }
    scaled.clamp(0.0, 100.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_to_system_clamps_below_zero() {
        assert!((to_system(-5) - to_system(0)).abs() < f32::EPSILON);
        assert!(to_system(i32::MIN).abs() < f32::EPSILON);
    }

    #[test]
    fn test_to_system_clamps_above_hundred() {
        assert!((to_system(150) - to_system(100)).abs() < f32::EPSILON);
        assert!((to_system(i32::MAX) - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_from_system_rounds_to_nearest_percent() {
        assert_eq!(from_system(0.404), 40);
        assert_eq!(from_system(0.405_1), 41);
        assert_eq!(from_system(0.999), 100);
    }

    #[test]
    fn test_from_system_clamps_out_of_range_scalars() {
        assert_eq!(from_system(-0.3), 0);
        assert_eq!(from_system(1.7), 100);
        assert_eq!(from_system(f32::INFINITY), 100);
        assert_eq!(from_system(f32::NEG_INFINITY), 0);
        assert_eq!(from_system(f32::NAN), 0);
    }

    proptest! {
        #[test]
        fn prop_round_trip_is_clamped_identity(v in 0i32..=250) {
            let expected = v.clamp(MIN_LEVEL, MAX_LEVEL);
            prop_assert_eq!(i32::from(from_system(to_system(expected))), expected);
        }

        #[test]
        fn prop_from_system_stays_in_range(raw in proptest::num::f32::ANY) {
            prop_assert!(from_system(raw) <= 100);
        }

        #[test]
        fn prop_to_system_stays_normalized(level in proptest::num::i32::ANY) {
            let scalar = to_system(level);
            prop_assert!((0.0..=1.0).contains(&scalar));
        }
    }
}
