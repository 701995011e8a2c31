//! Fixed-point single-pole IIR low-pass filter bank
//!
//! Each channel keeps an integer accumulator scaled by `gamma = 2^bit_shift`.
//! A raw sample is scaled up and multiplied by alpha in one step (`alpha_x`),
//! so every update costs two multiplies and one shift:
//!
//! `acc = (beta * acc + alpha_x * x) >> bit_shift`
//!
//! The shift truncates toward negative infinity. With a positive DC input the
//! accumulator settles up to `gamma / alpha` counts below the exact value; a
//! negative input settles exactly.

use ndarray::{Array1, ArrayView2};
use serde::{Deserialize, Serialize};

use crate::error::{FilterError, FilterResult};

/// Width of the accumulator word the bit budget is derived from
pub const ACCUM_WORD_NBITS: u32 = 32;

/// Upper bound on channels per filter bank
pub const MAX_IIR_CHANNELS: usize = 16;

fn default_block_frames() -> usize {
    1
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IirConfig {
    /// Interleaved channels per frame
    pub channels: usize,

    /// Significant bits in one raw sample (e.g. 16 for a 16-bit ADC)
    pub sample_nbits: u32,

    /// Sample rate Fs [Hz]
    pub sample_rate_hz: f64,

    /// Cutoff frequency Fc [Hz]
    pub cutoff_hz: f64,

    /// Frames consumed per `apply_*` call
    #[serde(default = "default_block_frames")]
    pub block_frames: usize,
}

impl IirConfig {
    pub fn new(channels: usize, sample_nbits: u32, sample_rate_hz: f64, cutoff_hz: f64) -> Self {
        Self {
            channels,
            sample_nbits,
            sample_rate_hz,
            cutoff_hz,
            block_frames: default_block_frames(),
        }
    }

    pub fn with_block_frames(mut self, block_frames: usize) -> Self {
        self.block_frames = block_frames;
        self
    }
}

#[derive(Clone, Debug)]
pub struct IirFilter {
    config: IirConfig,
    bit_shift: u32,
    alpha_x: i64,
    beta: i64,
    output_scale: f64,
    block_len: usize,
    accum: Array1<i64>,
}

impl IirFilter {
    /// Derive fixed-point coefficients from `config`.
    ///
    /// Fails closed on a channel count above [`MAX_IIR_CHANNELS`], on a bit
    /// budget with no room for the shift, and on rates that leave alpha at zero.
    pub fn new(config: IirConfig) -> FilterResult<Self> {
        if config.channels == 0 {
            return Err(FilterError::InvalidConfig(
                "IIR filter needs at least one channel".to_string(),
            ));
        }
        if config.channels > MAX_IIR_CHANNELS {
            log::warn!(
                "IIR channels exceeded max number: {} > {}",
                config.channels,
                MAX_IIR_CHANNELS
            );
            return Err(FilterError::TooManyChannels {
                requested: config.channels,
                max: MAX_IIR_CHANNELS,
            });
        }
        if config.block_frames == 0 {
            return Err(FilterError::InvalidConfig(
                "block_frames must be at least 1".to_string(),
            ));
        }
        let block_len = config
            .block_frames
            .checked_mul(config.channels)
            .ok_or_else(|| {
                FilterError::InvalidConfig(format!(
                    "block of {} frames x {} channels overflows",
                    config.block_frames, config.channels
                ))
            })?;
        if !(config.sample_rate_hz.is_finite() && config.sample_rate_hz > 0.0) {
            return Err(FilterError::InvalidConfig(format!(
                "sample rate must be positive, got {}",
                config.sample_rate_hz
            )));
        }
        if !(config.cutoff_hz.is_finite() && config.cutoff_hz > 0.0) {
            return Err(FilterError::InvalidConfig(format!(
                "cutoff must be positive, got {}",
                config.cutoff_hz
            )));
        }

        // Need at least two spare bits so the shift is non-zero
        if config.sample_nbits + 2 > ACCUM_WORD_NBITS - 1 {
            return Err(FilterError::InvalidConfig(format!(
                "{} sample bits leave no headroom in a {}-bit accumulator",
                config.sample_nbits, ACCUM_WORD_NBITS
            )));
        }
        let headroom = ACCUM_WORD_NBITS - 1 - config.sample_nbits;
        if headroom % 2 == 1 {
            log::debug!("IIR bit budget {} is odd, one bit unused", headroom);
        }
        let bit_shift = headroom / 2;

        // gamma = alpha + beta
        let gamma = 1i64 << bit_shift;
        let ts_fc = config.cutoff_hz / config.sample_rate_hz;
        let alpha = (ts_fc / (1.0 + ts_fc) * gamma as f64).round() as i64;
        if alpha == 0 {
            return Err(FilterError::InvalidConfig(format!(
                "cutoff {} Hz at {} Hz quantises to zero with {} fractional bits",
                config.cutoff_hz, config.sample_rate_hz, bit_shift
            )));
        }

        let beta = gamma - alpha;
        let alpha_x = alpha << bit_shift;
        let output_scale = 1.0 / gamma as f64;

        log::debug!(
            "IIR filter: {} ch, shift {}, alpha {}, beta {}",
            config.channels,
            bit_shift,
            alpha,
            beta
        );

        Ok(Self {
            accum: Array1::zeros(config.channels),
            config,
            bit_shift,
            alpha_x,
            beta,
            output_scale,
            block_len,
        })
    }

    pub fn config(&self) -> &IirConfig {
        &self.config
    }

    pub fn channels(&self) -> usize {
        self.config.channels
    }

    pub fn bit_shift(&self) -> u32 {
        self.bit_shift
    }

    pub fn alpha(&self) -> i64 {
        self.alpha_x >> self.bit_shift
    }

    pub fn alpha_x(&self) -> i64 {
        self.alpha_x
    }

    pub fn beta(&self) -> i64 {
        self.beta
    }

    /// Fixed-point to input-units factor, `1 / gamma`
    pub fn output_scale(&self) -> f64 {
        self.output_scale
    }

    /// Filter a block of unsigned samples, interleaved by channel.
    pub fn apply_u16(&mut self, input: &[u16], output: &mut [f64]) -> FilterResult<()> {
        self.apply_block(input, output)
    }

    /// Filter a block of signed samples, interleaved by channel.
    pub fn apply_i16(&mut self, input: &[i16], output: &mut [f64]) -> FilterResult<()> {
        self.apply_block(input, output)
    }

    /// Run the recursion over `frames` (rows = frames, columns = channels).
    pub fn apply_frames<T>(&mut self, frames: ArrayView2<T>) -> FilterResult<()>
    where
        T: Copy + Into<i64>,
    {
        if frames.ncols() != self.config.channels {
            return Err(FilterError::BlockShape {
                len: frames.len(),
                frames: frames.nrows(),
                channels: self.config.channels,
            });
        }

        for frame in frames.rows() {
            for (acc, &x) in self.accum.iter_mut().zip(frame.iter()) {
                *acc = (self.beta * *acc + self.alpha_x * x.into()) >> self.bit_shift;
            }
        }
        Ok(())
    }

    /// Current output in input units
    pub fn output(&self) -> Vec<f64> {
        self.accum
            .iter()
            .map(|&acc| self.output_scale * acc as f64)
            .collect()
    }

    pub fn accumulators(&self) -> &[i64] {
        self.accum.as_slice().unwrap_or(&[])
    }

    pub fn reset(&mut self) {
        self.accum.fill(0);
    }

    fn apply_block<T>(&mut self, input: &[T], output: &mut [f64]) -> FilterResult<()>
    where
        T: Copy + Into<i64>,
    {
        let channels = self.config.channels;
        let frames = self.config.block_frames;
        let shape_err = || FilterError::BlockShape {
            len: input.len(),
            frames,
            channels,
        };

        if input.len() != self.block_len {
            return Err(shape_err());
        }
        if output.len() < channels {
            return Err(FilterError::LengthMismatch {
                expected: channels,
                actual: output.len(),
            });
        }

        let view = ArrayView2::from_shape((frames, channels), input).map_err(|_| shape_err())?;
        self.apply_frames(view)?;

        for (out, &acc) in output.iter_mut().zip(self.accum.iter()) {
            *out = self.output_scale * acc as f64;
        }
        Ok(())
    }
}
