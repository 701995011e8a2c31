pub mod linalg;
pub mod status;

pub use linalg::*;
pub use status::ImuStatus;

use serde::{Deserialize, Serialize};

/// Angular rate and specific force from one IMU body
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ImuBody {
    /// Angular rate [rad/s]
    pub gyro: Vec3,
    /// Acceleration [m/s²]
    pub accel: Vec3,
}

impl Default for ImuBody {
    fn default() -> Self {
        Self {
            gyro: Vec3::zeros(),
            accel: Vec3::zeros(),
        }
    }
}

impl ImuBody {
    pub fn new(gyro: Vec3, accel: Vec3) -> Self {
        Self { gyro, accel }
    }
}

/// One fused IMU reading
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ImuSample {
    /// Sample time [seconds]
    pub time: f64,
    pub body: ImuBody,
    pub status: ImuStatus,
}

impl ImuSample {
    pub fn new(time: f64, gyro: Vec3, accel: Vec3) -> Self {
        Self {
            time,
            body: ImuBody::new(gyro, accel),
            status: ImuStatus::default(),
        }
    }

    pub fn with_status(mut self, status: ImuStatus) -> Self {
        self.status = status;
        self
    }
}

/// Raw reading from three redundant IMU bodies sharing one timestamp
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TripleImuSample {
    pub time: f64,
    pub status: ImuStatus,
    pub units: [ImuBody; 3],
}

/// Rotation and velocity increments accumulated over `dt`
///
/// A record with `dt == 0` is freshly reset and carries zero `theta` and `vel`.
/// The increments are only meaningful together with their `dt`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PreintegratedImu {
    /// Time of the most recent sample folded in [seconds]
    pub time: f64,

    /// Accumulated interval [seconds]
    pub dt: f64,

    /// Accumulated rotation vector [rad]
    pub theta: Vec3,

    /// Accumulated velocity increment [m/s]
    pub vel: Vec3,

    pub status: ImuStatus,
}

impl Default for PreintegratedImu {
    fn default() -> Self {
        Self {
            time: 0.0,
            dt: 0.0,
            theta: Vec3::zeros(),
            vel: Vec3::zeros(),
            status: ImuStatus::default(),
        }
    }
}

impl PreintegratedImu {
    pub fn is_empty(&self) -> bool {
        self.dt == 0.0
    }
}
