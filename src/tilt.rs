//! Orientation & calibration engine.
//!
//! Pure functions from an [`AveragedSample`] to a publishable
//! [`Reading`]: accelerometer-only roll/pitch, and the linear remap of
//! roll angle onto the calibrated specific-gravity range.  No I/O, no
//! shared state, total over the input domain.

use crate::config::CalibrationProfile;
use crate::sensors::AveragedSample;

/// Battery reporting is a fixed placeholder until the board grows a
/// fuel gauge.
// TODO: replace with a real battery sensor read once the ADC divider
// is populated on rev C boards.
const BATTERY_PLACEHOLDER: u8 = 100;

/// The published unit of telemetry, constructed once per cycle and
/// immutable afterwards.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reading {
    /// Device-reported die temperature of the last burst (°C).
    pub temperature: f32,
    /// Tilt angle (degrees, always non-negative).
    pub roll: f32,
    /// Fore-aft angle (degrees, always non-negative).
    pub pitch: f32,
    /// Specific gravity estimated from `roll` via the calibration map.
    pub specific_gravity: f32,
    /// Battery percentage (placeholder constant).
    pub battery: u8,
    /// Averaged raw acceleration, kept for diagnostics (m/s²).
    pub acceleration: [f32; 3],
    /// Averaged raw angular rate, kept for diagnostics (rad/s).
    pub gyro: [f32; 3],
}

impl CalibrationProfile {
    /// Map a (non-negative) roll angle onto the configured gravity range.
    ///
    /// A zero-width angle range means calibration was never performed;
    /// the low end is reported for every input instead of dividing by
    /// zero.
    pub fn sg_for_roll(&self, roll: f32) -> f32 {
        let old_range = self.angle_high - self.angle_low;
        if old_range == 0.0 {
            return self.sg_low;
        }
        let new_range = self.sg_high - self.sg_low;
        ((90.0 - roll) - self.angle_low) * new_range / old_range + self.sg_low
    }
}

/// Derive one [`Reading`] from an averaged burst.
///
/// Both angles are folded to their absolute value before use: the
/// calibration range is defined only over non-negative angles, so two
/// mirror-image tilt directions report the same gravity.  That is the
/// device's long-standing behaviour (a hydrometer vessel lists along a
/// single axis) — keep it, don't "fix" it.
pub fn compute_reading(sample: &AveragedSample, profile: &CalibrationProfile) -> Reading {
    let [ax, ay, az] = sample.accel;

    let roll = ay.atan2(az).to_degrees().abs();
    let pitch = (-ax).atan2((ay * ay + az * az).sqrt()).to_degrees().abs();

    Reading {
        temperature: sample.temperature,
        roll,
        pitch,
        specific_gravity: profile.sg_for_roll(roll),
        battery: BATTERY_PLACEHOLDER,
        acceleration: sample.accel,
        gyro: sample.gyro,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(ax: f32, ay: f32, az: f32) -> AveragedSample {
        AveragedSample {
            accel: [ax, ay, az],
            gyro: [0.0, 0.0, 0.0],
            temperature: 20.0,
        }
    }

    #[test]
    fn level_device_reads_zero_angles() {
        let r = compute_reading(&sample(0.0, 0.0, 1.0), &CalibrationProfile::default());
        assert!(r.roll.abs() < 1e-5);
        assert!(r.pitch.abs() < 1e-5);
    }

    #[test]
    fn level_device_default_profile_gravity() {
        // (90 - 0 - 15) * 0.12 / 65 + 1.000
        let r = compute_reading(&sample(0.0, 0.0, 1.0), &CalibrationProfile::default());
        assert!((r.specific_gravity - 1.1385).abs() < 1e-3);
    }

    #[test]
    fn mirror_tilts_report_identical_gravity() {
        // Known characteristic: the sign of the tilt is discarded, so a
        // device listing to port reads the same as one listing to
        // starboard.
        let profile = CalibrationProfile::default();
        let left = compute_reading(&sample(0.0, 0.5, 0.8), &profile);
        let right = compute_reading(&sample(0.0, -0.5, 0.8), &profile);
        assert!((left.roll - right.roll).abs() < 1e-6);
        assert!((left.specific_gravity - right.specific_gravity).abs() < 1e-6);
    }

    #[test]
    fn degenerate_profile_falls_back_to_sg_low() {
        let profile = CalibrationProfile {
            angle_low: 40.0,
            angle_high: 40.0,
            sg_low: 1.010,
            sg_high: 1.090,
        };
        for roll in [0.0, 12.5, 40.0, 89.9] {
            assert!((profile.sg_for_roll(roll) - 1.010).abs() < 1e-6);
        }
    }

    #[test]
    fn temperature_and_vectors_pass_through() {
        let s = AveragedSample {
            accel: [0.1, 0.2, 9.7],
            gyro: [0.01, 0.02, 0.03],
            temperature: 18.4,
        };
        let r = compute_reading(&s, &CalibrationProfile::default());
        assert_eq!(r.acceleration, s.accel);
        assert_eq!(r.gyro, s.gyro);
        assert!((r.temperature - 18.4).abs() < 1e-6);
    }

    #[test]
    fn battery_is_placeholder_constant() {
        let r = compute_reading(&sample(0.0, 0.0, 1.0), &CalibrationProfile::default());
        assert_eq!(r.battery, 100);
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn angles_are_never_negative(
            ax in -20.0f32..20.0,
            ay in -20.0f32..20.0,
            az in -20.0f32..20.0,
        ) {
            let s = AveragedSample { accel: [ax, ay, az], gyro: [0.0; 3], temperature: 0.0 };
            let r = compute_reading(&s, &CalibrationProfile::default());
            prop_assert!(r.roll >= 0.0);
            prop_assert!(r.pitch >= 0.0);
        }

        #[test]
        fn gravity_never_increases_with_roll(
            roll1 in 0.0f32..90.0,
            roll2 in 0.0f32..90.0,
        ) {
            // With angle_high > angle_low the map is a decreasing affine
            // function of roll.
            let p = CalibrationProfile::default();
            let (lo, hi) = if roll1 < roll2 { (roll1, roll2) } else { (roll2, roll1) };
            prop_assert!(p.sg_for_roll(lo) >= p.sg_for_roll(hi));
        }

        #[test]
        fn degenerate_range_is_total(roll in -360.0f32..360.0) {
            let p = CalibrationProfile { angle_low: 10.0, angle_high: 10.0, sg_low: 1.0, sg_high: 1.2 };
            prop_assert_eq!(p.sg_for_roll(roll), 1.0);
        }
    }
}
