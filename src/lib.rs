//! Inertial preprocessing: fixed-point IIR smoothing, running means,
//! redundant IMU merging and coning/sculling corrected preintegration.
//!
//! Everything here is synchronous and allocation-light. Each stream owns its
//! own filter or [`imu::Preintegrator`]; nothing is shared between calls.

pub mod config;
pub mod error;
pub mod filters;
pub mod imu;
pub mod types;

pub use error::{FilterError, FilterResult};
pub use types::{ImuBody, ImuSample, ImuStatus, PreintegratedImu, TripleImuSample, Vec3};
