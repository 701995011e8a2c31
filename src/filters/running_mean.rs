use crate::error::{FilterError, FilterResult};

fn check_lengths(expected: usize, actual: usize) -> FilterResult<()> {
    if expected != actual {
        return Err(FilterError::LengthMismatch { expected, actual });
    }
    Ok(())
}

/// Running average of `input` collected in `mean`.
///
/// `sample_count` is the 1-based index of `input` in the stream; 0 resets the
/// mean to `input`.
pub fn running_mean(input: &[f32], mean: &mut [f32], sample_count: u32) -> FilterResult<()> {
    check_lengths(mean.len(), input.len())?;

    let alpha = if sample_count == 0 {
        1.0
    } else {
        1.0 / sample_count as f32
    };

    for (m, &x) in mean.iter_mut().zip(input) {
        *m = (1.0 - alpha) * *m + alpha * x;
    }
    Ok(())
}

/// Same recurrence as [`running_mean`] with a double-precision accumulator,
/// for long-running averages where f32 would stall.
pub fn running_mean_f64(mean: &mut [f64], input: &[f32], sample_count: u32) -> FilterResult<()> {
    check_lengths(mean.len(), input.len())?;

    let alpha = if sample_count == 0 {
        1.0
    } else {
        1.0 / sample_count as f64
    };

    for (m, &x) in mean.iter_mut().zip(input) {
        *m = (1.0 - alpha) * *m + alpha * x as f64;
    }
    Ok(())
}

/// Owns a double-precision mean and its sample counter
#[derive(Clone, Debug)]
pub struct RunningMean {
    mean: Vec<f64>,
    samples: u32,
}

impl RunningMean {
    pub fn new(len: usize) -> Self {
        Self {
            mean: vec![0.0; len],
            samples: 0,
        }
    }

    /// Fold in one sample. The first sample after a reset replaces the mean.
    pub fn push(&mut self, input: &[f32]) -> FilterResult<&[f64]> {
        let sample_count = if self.samples == 0 {
            0
        } else {
            self.samples.saturating_add(1)
        };
        running_mean_f64(&mut self.mean, input, sample_count)?;
        self.samples = self.samples.saturating_add(1);
        Ok(&self.mean)
    }

    pub fn mean(&self) -> &[f64] {
        &self.mean
    }

    /// Samples folded in since the last reset
    pub fn count(&self) -> u32 {
        self.samples
    }

    pub fn reset(&mut self) {
        self.samples = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_zero_count_resets_exactly() {
        let mut mean = [7.5f32, -3.0, 100.0];
        running_mean(&[1.25, 2.5, -0.125], &mut mean, 0).unwrap();
        assert_eq!(mean, [1.25, 2.5, -0.125]);
    }

    #[test]
    fn test_converges_to_constant() {
        let input = [2.0f32, -4.0];
        let mut mean = [0.0f32; 2];
        running_mean(&[10.0, 10.0], &mut mean, 0).unwrap();
        for n in 2..5000 {
            running_mean(&input, &mut mean, n).unwrap();
        }
        assert_relative_eq!(mean[0], 2.0, epsilon = 1e-2);
        assert_relative_eq!(mean[1], -4.0, epsilon = 1e-2);
    }

    #[test]
    fn test_matches_arithmetic_mean() {
        let samples = [[1.0f32], [2.0], [3.0], [10.0]];
        let mut mean = [0.0f64];
        for (i, s) in samples.iter().enumerate() {
            let count = if i == 0 { 0 } else { i as u32 + 1 };
            running_mean_f64(&mut mean, s, count).unwrap();
        }
        assert_relative_eq!(mean[0], 4.0, epsilon = 1e-12);
    }

    #[test]
    fn test_length_mismatch() {
        let mut mean = [0.0f32; 2];
        assert_eq!(
            running_mean(&[1.0], &mut mean, 1),
            Err(FilterError::LengthMismatch {
                expected: 2,
                actual: 1
            })
        );
    }

    #[test]
    fn test_owned_running_mean() {
        let mut avg = RunningMean::new(2);
        avg.push(&[3.0, 6.0]).unwrap();
        avg.push(&[5.0, 2.0]).unwrap();
        assert_eq!(avg.count(), 2);
        assert_relative_eq!(avg.mean()[0], 4.0);
        assert_relative_eq!(avg.mean()[1], 4.0);

        avg.reset();
        avg.push(&[-1.0, 1.0]).unwrap();
        assert_eq!(avg.mean(), &[-1.0, 1.0]);
    }
}
