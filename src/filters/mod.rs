/// Signal filters that run independently of the IMU preintegration path
///
/// Both filters operate on caller-sampled channels: a fixed-point IIR
/// low-pass bank for quantised ADC data and an incremental running mean.

pub mod iir;
pub mod running_mean;

pub use iir::{IirConfig, IirFilter, MAX_IIR_CHANNELS};
pub use running_mean::{running_mean, running_mean_f64, RunningMean};
