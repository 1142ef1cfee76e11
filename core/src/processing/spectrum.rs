use crate::math::fft::{real_magnitude, FftHelper};
use crate::math::stats::StatsHelper;
use crate::prelude::{
    ProcessingError, ProcessingResult, ProcessingStage, StageConfig, StageInput, StageMetadata,
    StageOutput,
};
use crate::telemetry::log::LogManager;
use num_complex::Complex64;
use serde::Serialize;

/// Frequency-domain view of one signal.
#[derive(Debug, Clone, Serialize)]
pub struct Spectrum {
    /// Full N-point transform.
    #[serde(skip)]
    pub bins: Vec<Complex64>,
    /// `k * sampling_rate / N` for `k = 0..=N/2`, paired with `magnitude`.
    pub frequencies: Vec<f64>,
    /// Magnitude of the real-input half-spectrum.
    pub magnitude: Vec<f64>,
}

impl Spectrum {
    pub fn points(&self) -> usize {
        self.bins.len()
    }

    /// Frequency of the strongest bin.
    pub fn peak_frequency(&self) -> Option<f64> {
        StatsHelper::argmax_abs(&self.magnitude).map(|idx| self.frequencies[idx])
    }
}

/// Evaluates the DTFT of `signal` at `points` equally spaced frequencies.
///
/// `points` defaults to the signal length; the signal is zero-padded or truncated to it.
pub fn dtft(signal: &[f64], points: Option<usize>, sampling_rate: f64) -> ProcessingResult<Spectrum> {
    if signal.is_empty() {
        return Err(ProcessingError::InvalidSignal("empty signal".into()));
    }
    let n = points.unwrap_or(signal.len());
    if n == 0 {
        return Err(ProcessingError::InvalidSignal(
            "transform needs at least one point".into(),
        ));
    }
    if !(sampling_rate.is_finite() && sampling_rate > 0.0) {
        return Err(ProcessingError::InvalidConfig(format!(
            "sampling rate must be positive, got {}",
            sampling_rate
        )));
    }

    let bins = FftHelper::new(n).forward(signal);
    let magnitude = real_magnitude(signal, n)?;
    let frequencies = (0..magnitude.len())
        .map(|k| k as f64 * sampling_rate / n as f64)
        .collect();

    Ok(Spectrum {
        bins,
        frequencies,
        magnitude,
    })
}

/// Spectral stage producing the magnitude half-spectrum of each input trace.
pub struct SpectrumStage {
    config: Option<StageConfig>,
    logger: LogManager,
}

impl SpectrumStage {
    pub fn new() -> Self {
        Self {
            config: None,
            logger: LogManager::new(),
        }
    }
}

impl Default for SpectrumStage {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessingStage for SpectrumStage {
    fn initialize(&mut self, config: &StageConfig) -> ProcessingResult<()> {
        self.config = Some(config.clone());
        Ok(())
    }

    fn execute(&mut self, input: StageInput) -> ProcessingResult<StageOutput> {
        let config = self
            .config
            .as_ref()
            .ok_or_else(|| ProcessingError::Internal("stage not initialized".into()))?;

        let spectrum = dtft(&input.samples, config.spectrum_points, config.sampling_rate)?;
        let peak = spectrum.peak_frequency();
        if let Some(peak) = peak {
            self.logger
                .debug(&format!("spectrum peak {:.5} Hz over {} points", peak, spectrum.points()));
        }

        let metadata = StageMetadata {
            frequencies: Some(spectrum.frequencies),
            peak_frequency: peak,
            notes: vec![format!("{} spectral points", spectrum.bins.len())],
        };

        Ok(StageOutput {
            samples: spectrum.magnitude,
            metadata,
        })
    }

    fn cleanup(&mut self) {
        self.config = None;
    }
}
