//! IMU preprocessing: redundancy handling, rate/increment conversion and
//! coning/sculling preintegration
//!
//! The output of this module is a `PreintegratedImu` record for an external
//! navigation filter, which reads it and starts a new interval at its own rate.

pub mod conversion;
pub mod integration;
pub mod redundancy;

pub use conversion::{from_rate_form, to_rate_form};
pub use integration::{integrate, IntegrationMethod, Preintegrator, DEFAULT_SUBSTEPS};
pub use redundancy::{merge_triple, split_single, validate_triple};
