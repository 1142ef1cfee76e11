use crate::prelude::{ProcessingError, ProcessingResult};
use num_complex::Complex64;
use realfft::RealFftPlanner;
use rustfft::{num_traits::Zero, Fft, FftPlanner};
use std::sync::Arc;

/// Helper that wraps the `rustfft` planner for reuse at a fixed size.
pub struct FftHelper {
    forward: Arc<dyn Fft<f64>>,
    inverse: Arc<dyn Fft<f64>>,
    size: usize,
}

impl FftHelper {
    pub fn new(size: usize) -> Self {
        let mut planner = FftPlanner::new();
        let forward = planner.plan_fft_forward(size);
        let inverse = planner.plan_fft_inverse(size);
        Self {
            forward,
            inverse,
            size,
        }
    }

    /// Forward transform of a real sequence, zero-padded or truncated to the plan size.
    pub fn forward(&self, input: &[f64]) -> Vec<Complex64> {
        let mut buffer: Vec<Complex64> = input
            .iter()
            .take(self.size)
            .map(|&value| Complex64::new(value, 0.0))
            .collect();
        buffer.resize(self.size, Complex64::zero());
        self.forward.process(&mut buffer);
        buffer
    }

    /// In-place inverse transform, scaled by `1 / size`.
    pub fn inverse(&self, buffer: &mut [Complex64]) {
        self.inverse.process(buffer);
        let scale = 1.0 / self.size as f64;
        for value in buffer.iter_mut() {
            *value *= scale;
        }
    }
}

/// Magnitude half-spectrum of `input` via the real-input transform.
///
/// The input is zero-padded or truncated to `size`; the result holds `size / 2 + 1` bins.
pub fn real_magnitude(input: &[f64], size: usize) -> ProcessingResult<Vec<f64>> {
    let mut planner = RealFftPlanner::<f64>::new();
    let r2c = planner.plan_fft_forward(size);
    let mut buffer = r2c.make_input_vec();
    for (slot, &value) in buffer.iter_mut().zip(input) {
        *slot = value;
    }
    let mut spectrum = r2c.make_output_vec();
    r2c.process(&mut buffer, &mut spectrum)
        .map_err(|err| ProcessingError::Internal(format!("real FFT failed: {}", err)))?;
    Ok(spectrum.iter().map(|bin| bin.norm()).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fft_helper_returns_same_length() {
        let helper = FftHelper::new(4);
        let output = helper.forward(&[1.0, 0.0, -1.0, 0.0]);
        assert_eq!(output.len(), 4);
    }

    #[test]
    fn inverse_restores_input() {
        let helper = FftHelper::new(8);
        let input = [1.0, -2.0, 3.5, 0.25, 0.0, 4.0, -1.0, 2.0];
        let mut spectrum = helper.forward(&input);
        helper.inverse(&mut spectrum);
        for (restored, original) in spectrum.iter().zip(input.iter()) {
            assert!((restored.re - original).abs() < 1e-12);
            assert!(restored.im.abs() < 1e-12);
        }
    }

    #[test]
    fn real_magnitude_matches_complex_transform() {
        let input = [0.5, 1.0, -0.25, 2.0, 0.0, -1.5];
        let complex = FftHelper::new(6).forward(&input);
        let half = real_magnitude(&input, 6).unwrap();
        assert_eq!(half.len(), 4);
        for (k, magnitude) in half.iter().enumerate() {
            assert!((magnitude - complex[k].norm()).abs() < 1e-12);
        }
    }
}
