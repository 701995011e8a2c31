//! Delta-theta / delta-velocity preintegration of raw IMU samples
//!
//! Rate and acceleration are assumed to vary linearly between two consecutive
//! samples. The default method sub-steps that interval and integrates Bortz's
//! rotation vector equation, which corrects coning (rotation about two axes at
//! once) and sculling (rotation coupled with acceleration):
//!
//!   phi_dot = w + 1/2 phi x w + Kw phi x (phi x w)
//!   v_dot   = a + phi x a + 1/2 phi x (phi x a)
//!
//! `Kw` is evaluated from its power series in |phi|² so the per-sample path has
//! no transcendental calls.
//!
//! Riemann-sum and trapezoidal integration are kept as first-order references.
//! Roscoe's recursive coning/sculling integrals are a known higher-order
//! alternative and are not implemented.

use serde::{Deserialize, Serialize};

use crate::error::{FilterError, FilterResult};
use crate::types::{bortz_coefficient, ImuBody, ImuSample, PreintegratedImu, Vec3};

/// Sub-steps per sample interval for the Bortz integrator
pub const DEFAULT_SUBSTEPS: u32 = 4;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "method")]
pub enum IntegrationMethod {
    /// Rectangle rule on the newest sample
    RiemannSum,
    /// Mean of the two samples
    Trapezoidal,
    /// Bortz coning/sculling integration over `substeps` interpolated points
    Bortz { substeps: u32 },
}

impl Default for IntegrationMethod {
    fn default() -> Self {
        IntegrationMethod::Bortz {
            substeps: DEFAULT_SUBSTEPS,
        }
    }
}

impl IntegrationMethod {
    pub fn bortz(substeps: u32) -> FilterResult<Self> {
        let method = IntegrationMethod::Bortz { substeps };
        method.validate()?;
        Ok(method)
    }

    pub fn validate(&self) -> FilterResult<()> {
        match *self {
            IntegrationMethod::Bortz { substeps: 0 } => Err(FilterError::InvalidSubsteps(0)),
            _ => Ok(()),
        }
    }
}

/// Fold the interval `previous -> current` into `output`.
///
/// Updates `output.time`/`output.status` from `current`, adds the interval to
/// `output.dt`, then replaces `previous` with `current`. Returns the interval.
/// A zero interval is integrated as a no-op; filtering duplicate timestamps is
/// up to the caller.
///
/// This entry point does not validate `method`: `Bortz { substeps: 0 }` runs as
/// a single sub-step. Use [`IntegrationMethod::bortz`] or
/// [`Preintegrator::new`] to reject it instead.
pub fn integrate(
    output: &mut PreintegratedImu,
    current: &ImuSample,
    previous: &mut ImuSample,
    method: IntegrationMethod,
) -> f64 {
    output.time = current.time;
    output.status = current.status;

    let dt = current.time - previous.time;

    match method {
        IntegrationMethod::RiemannSum => {
            riemann_sum(&mut output.theta, &mut output.vel, &current.body, dt)
        }
        IntegrationMethod::Trapezoidal => trapezoidal(
            &mut output.theta,
            &mut output.vel,
            &current.body,
            &previous.body,
            dt,
        ),
        IntegrationMethod::Bortz { substeps } => {
            let substeps = substeps.max(1);
            bortz_increment(
                &mut output.theta,
                &mut output.vel,
                &current.body,
                &previous.body,
                substeps,
                dt / substeps as f64,
            )
        }
    }

    // Update history
    *previous = *current;

    output.dt += dt;
    dt
}

fn riemann_sum(theta: &mut Vec3, vel: &mut Vec3, current: &ImuBody, dt: f64) {
    *theta += current.gyro * dt;
    *vel += current.accel * dt;
}

fn trapezoidal(theta: &mut Vec3, vel: &mut Vec3, current: &ImuBody, previous: &ImuBody, dt: f64) {
    let half_dt = 0.5 * dt;
    *theta += (current.gyro + previous.gyro) * half_dt;
    *vel += (current.accel + previous.accel) * half_dt;
}

/// Integrate Bortz's equations over `substeps` points of the interval.
///
/// `theta` is the rotation vector accumulated since the last reset, not since
/// `previous`; the correction terms depend on it.
pub fn bortz_increment(
    theta: &mut Vec3,
    vel: &mut Vec3,
    current: &ImuBody,
    previous: &ImuBody,
    substeps: u32,
    dt_sub: f64,
) {
    let delta_w = current.gyro - previous.gyro;
    let delta_a = current.accel - previous.accel;
    let n = substeps as f64;

    for k in 0..substeps {
        let frac = k as f64 / n;

        // Linearly interpolated rate and acceleration
        let wb = previous.gyro + delta_w * frac;
        let ab = previous.accel + delta_a * frac;

        // Coning and sculling terms
        let t1 = theta.cross(&wb);
        let t2 = theta.cross(&t1);
        let t3 = theta.cross(&ab);
        let t4 = theta.cross(&t3);
        let kw = bortz_coefficient(theta.norm_squared());

        *theta += (wb + 0.5 * t1 + kw * t2) * dt_sub;
        *vel += (ab + t3 + 0.5 * t4) * dt_sub;
    }
}

/// Per-stream preintegration state.
///
/// Owns the accumulated record and the previous raw sample. The consumer reads
/// the record at its own cadence with [`Preintegrator::take`].
#[derive(Clone, Debug, Default)]
pub struct Preintegrator {
    method: IntegrationMethod,
    accumulated: PreintegratedImu,
    last_sample: Option<ImuSample>,
}

impl Preintegrator {
    pub fn new(method: IntegrationMethod) -> FilterResult<Self> {
        method.validate()?;
        Ok(Self {
            method,
            accumulated: PreintegratedImu::default(),
            last_sample: None,
        })
    }

    pub fn method(&self) -> IntegrationMethod {
        self.method
    }

    /// Seed the history without integrating anything.
    pub fn prime(&mut self, sample: ImuSample) {
        self.last_sample = Some(sample);
    }

    /// Integrate from the previous sample to `sample` and return the elapsed time.
    ///
    /// The first sample after construction or [`reset`](Self::reset) only seeds
    /// the history and returns 0.
    pub fn advance(&mut self, sample: &ImuSample) -> f64 {
        let dt = match self.last_sample.as_mut() {
            Some(previous) => integrate(&mut self.accumulated, sample, previous, self.method),
            None => {
                self.last_sample = Some(*sample);
                return 0.0;
            }
        };
        if dt < 0.0 {
            log::warn!(
                "IMU time went backwards by {:.6}s at t={:.6}",
                -dt,
                sample.time
            );
        } else if dt == 0.0 {
            log::trace!("duplicate IMU timestamp {:.6}", sample.time);
        }
        dt
    }

    pub fn accumulated(&self) -> &PreintegratedImu {
        &self.accumulated
    }

    pub fn last_sample(&self) -> Option<&ImuSample> {
        self.last_sample.as_ref()
    }

    /// Hand out the accumulated increments and start a new interval.
    ///
    /// The sample history is kept so the next interval starts where this one ended.
    pub fn take(&mut self) -> PreintegratedImu {
        std::mem::take(&mut self.accumulated)
    }

    /// Drop both the accumulated increments and the sample history.
    pub fn reset(&mut self) {
        self.accumulated = PreintegratedImu::default();
        self.last_sample = None;
    }
}
