use crate::math::fft::FftHelper;
use crate::math::stats::StatsHelper;
use crate::prelude::{ConvolutionMode, ProcessingError, ProcessingResult};

/// Shorter-operand length up to which direct summation beats the FFT path.
pub const DIRECT_CONVOLUTION_LIMIT: usize = 64;

/// Linear convolution of `signal` with `kernel`.
///
/// `Full` returns `len(signal) + len(kernel) - 1` samples. `Same` returns `len(signal)`
/// samples taken from the full result starting at `(len(kernel) - 1) / 2`, which matches
/// the usual center alignment of numerical convolution routines.
pub fn convolve(
    signal: &[f64],
    kernel: &[f64],
    mode: ConvolutionMode,
) -> ProcessingResult<Vec<f64>> {
    validate(signal, "signal")?;
    validate(kernel, "kernel")?;

    let full = if signal.len().min(kernel.len()) <= DIRECT_CONVOLUTION_LIMIT {
        convolve_direct(signal, kernel)
    } else {
        convolve_fft(signal, kernel)
    };

    Ok(match mode {
        ConvolutionMode::Full => full,
        ConvolutionMode::Same => {
            let start = (kernel.len() - 1) / 2;
            full[start..start + signal.len()].to_vec()
        }
    })
}

fn validate(samples: &[f64], what: &str) -> ProcessingResult<()> {
    if samples.is_empty() {
        return Err(ProcessingError::InvalidSignal(format!("empty {}", what)));
    }
    if !StatsHelper::all_finite(samples) {
        return Err(ProcessingError::InvalidSignal(format!(
            "{} contains non-finite samples",
            what
        )));
    }
    Ok(())
}

fn convolve_direct(signal: &[f64], kernel: &[f64]) -> Vec<f64> {
    let mut output = vec![0.0; signal.len() + kernel.len() - 1];
    for (i, &x) in signal.iter().enumerate() {
        for (j, &h) in kernel.iter().enumerate() {
            output[i + j] += x * h;
        }
    }
    output
}

fn convolve_fft(signal: &[f64], kernel: &[f64]) -> Vec<f64> {
    let full_len = signal.len() + kernel.len() - 1;
    let fft = FftHelper::new(full_len.next_power_of_two());

    let mut product = fft.forward(signal);
    let kernel_spectrum = fft.forward(kernel);
    for (lhs, rhs) in product.iter_mut().zip(kernel_spectrum.iter()) {
        *lhs *= *rhs;
    }
    fft.inverse(&mut product);

    product.iter().take(full_len).map(|value| value.re).collect()
}
