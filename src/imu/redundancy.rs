/// Conversion between single and triple-redundant IMU readings
///
/// A triple reading carries one `ImuBody` per physical unit and a status word
/// whose `IMU{1,2,3}_OK` bits say which units are trusted. Merging averages the
/// trusted units; splitting broadcasts one reading to all three.
use crate::types::{all_below, ImuBody, ImuSample, ImuStatus, TripleImuSample, Vec3};

/// Far below any real accelerometer noise floor [m/s²]
pub const INVALID_ACCEL: f64 = 1.0e-6;

/// Clear the OK bit of every unit reporting (near) zero acceleration on all axes.
///
/// A sample with `time == 0` has not been filled yet and is left alone.
/// Only ever clears bits.
pub fn validate_triple(sample: &mut TripleImuSample) {
    if sample.time == 0.0 {
        return;
    }

    for (unit, body) in sample.units.iter().enumerate() {
        if all_below(&body.accel, INVALID_ACCEL) {
            let flag = ImuStatus::UNIT_OK[unit];
            if sample.status.contains(flag) {
                log::warn!(
                    "IMU{} reports zero acceleration at t={:.6}, marking invalid",
                    unit + 1,
                    sample.time
                );
            }
            sample.status.remove(flag);
        }
    }
}

/// Average the units whose OK bit is set.
///
/// With no valid unit the vectors stay zero. The status word is copied
/// through unchanged.
pub fn merge_triple(sample: &TripleImuSample) -> ImuSample {
    let mut gyro = Vec3::zeros();
    let mut accel = Vec3::zeros();
    let mut count = 0usize;

    // Incremental mean: identical units come back bit-exact
    for (unit, body) in sample.units.iter().enumerate() {
        if sample.status.unit_ok(unit) {
            count += 1;
            let n = count as f64;
            gyro += (body.gyro - gyro) / n;
            accel += (body.accel - accel) / n;
        }
    }

    ImuSample {
        time: sample.time,
        body: ImuBody::new(gyro, accel),
        status: sample.status,
    }
}

/// Broadcast a single reading into all three units, marking each OK.
///
/// Invalidity cannot be reconstructed, so `split_single(merge_triple(t))`
/// is not `t` in general.
pub fn split_single(sample: &ImuSample) -> TripleImuSample {
    let mut status = sample.status;
    status.insert(ImuStatus::IMU_OK_MASK);

    TripleImuSample {
        time: sample.time,
        status,
        units: [sample.body; 3],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(g: f64, a: f64) -> ImuBody {
        ImuBody::new(Vec3::new(g, -g, 2.0 * g), Vec3::new(a, 0.0, -9.81))
    }

    fn triple(status: u32) -> TripleImuSample {
        TripleImuSample {
            time: 1.5,
            status: ImuStatus(status),
            units: [body(0.1, 1.0), body(0.2, 2.0), body(0.6, 3.0)],
        }
    }

    #[test]
    fn test_validate_clears_only_dead_unit() {
        let mut sample = triple(ImuStatus::IMU_OK_MASK | 0x4);
        sample.units[1].accel = Vec3::new(1e-7, -5e-7, 0.0);
        validate_triple(&mut sample);

        assert!(sample.status.unit_ok(0));
        assert!(!sample.status.unit_ok(1));
        assert!(sample.status.unit_ok(2));
        assert_eq!(sample.status.bits() & 0x4, 0x4);
    }

    #[test]
    fn test_validate_never_sets_bits() {
        let mut sample = triple(ImuStatus::IMU1_OK);
        validate_triple(&mut sample);
        assert_eq!(sample.status, ImuStatus(ImuStatus::IMU1_OK));
    }

    #[test]
    fn test_validate_skips_unset_time() {
        let mut sample = triple(ImuStatus::IMU_OK_MASK);
        sample.time = 0.0;
        sample.units[0].accel = Vec3::zeros();
        validate_triple(&mut sample);
        assert_eq!(sample.status, ImuStatus::all_units_ok());
    }

    #[test]
    fn test_merge_identical_units() {
        let unit = body(0.3, 4.0);
        let sample = TripleImuSample {
            time: 2.0,
            status: ImuStatus::all_units_ok(),
            units: [unit; 3],
        };
        let merged = merge_triple(&sample);
        assert_eq!(merged.body, unit);
        assert_eq!(merged.time, 2.0);
        assert_eq!(merged.status, sample.status);
    }

    #[test]
    fn test_merge_identical_units_with_inexact_values() {
        let unit = ImuBody::new(Vec3::new(0.1, 1.0 / 3.0, -0.7), Vec3::new(0.3, 9.80665, -9.81));
        for status in [
            ImuStatus::IMU_OK_MASK,
            ImuStatus::IMU1_OK | ImuStatus::IMU2_OK,
            ImuStatus::IMU2_OK | ImuStatus::IMU3_OK,
        ] {
            let sample = TripleImuSample {
                time: 0.5,
                status: ImuStatus(status),
                units: [unit; 3],
            };
            assert_eq!(merge_triple(&sample).body, unit);
        }
    }

    #[test]
    fn test_merge_averages_valid_units_only() {
        let merged = merge_triple(&triple(ImuStatus::IMU1_OK | ImuStatus::IMU3_OK));
        // (1.0 + 3.0) / 2
        assert_eq!(merged.body.accel.x, 2.0);
        assert!((merged.body.gyro.x - 0.35).abs() < 1e-12);
    }

    #[test]
    fn test_merge_no_valid_units() {
        let merged = merge_triple(&triple(0));
        assert_eq!(merged.body.gyro, Vec3::zeros());
        assert_eq!(merged.body.accel, Vec3::zeros());
        assert_eq!(merged.status, ImuStatus(0));
    }

    #[test]
    fn test_split_is_broadcast() {
        let single = ImuSample::new(3.0, Vec3::new(0.1, 0.2, 0.3), Vec3::new(0.0, 0.0, 9.8))
            .with_status(ImuStatus(0x8));
        let sample = split_single(&single);
        assert_eq!(sample.status, ImuStatus(0x8 | ImuStatus::IMU_OK_MASK));
        assert!(sample.units.iter().all(|u| *u == single.body));
    }

    #[test]
    fn test_split_does_not_undo_merge() {
        let original = triple(ImuStatus::IMU1_OK);
        let round_trip = split_single(&merge_triple(&original));
        assert_ne!(round_trip, original);
        assert_eq!(round_trip.units[2], original.units[0]);
    }
}
