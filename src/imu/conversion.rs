use crate::error::{FilterError, FilterResult};
use crate::types::{ImuBody, ImuSample, PreintegratedImu};

/// Average rates over a preintegrated interval: `gyro = theta / dt`, `accel = vel / dt`.
pub fn to_rate_form(preintegrated: &PreintegratedImu) -> FilterResult<ImuSample> {
    if preintegrated.dt == 0.0 {
        return Err(FilterError::ZeroInterval);
    }

    let div_dt = 1.0 / preintegrated.dt;
    Ok(ImuSample {
        time: preintegrated.time,
        body: ImuBody::new(preintegrated.theta * div_dt, preintegrated.vel * div_dt),
        status: preintegrated.status,
    })
}

/// Treat `sample` as constant over `dt`: `theta = gyro * dt`, `vel = accel * dt`.
pub fn from_rate_form(sample: &ImuSample, dt: f64) -> FilterResult<PreintegratedImu> {
    if dt == 0.0 {
        return Err(FilterError::ZeroInterval);
    }

    Ok(PreintegratedImu {
        time: sample.time,
        dt,
        theta: sample.body.gyro * dt,
        vel: sample.body.accel * dt,
        status: sample.status,
    })
}
