use crate::math::stats::StatsHelper;
use crate::prelude::{ProcessingError, ProcessingResult};
use serde::{Deserialize, Serialize};

/// Frequency band covered by one kernel of the filter bank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterBand {
    Lowpass,
    Bandpass,
    Highpass,
}

impl FilterBand {
    pub const ALL: [FilterBand; 3] = [FilterBand::Lowpass, FilterBand::Bandpass, FilterBand::Highpass];

    /// Stable one-based kernel index used when addressing convolved signals.
    pub fn index(self) -> usize {
        match self {
            FilterBand::Lowpass => 1,
            FilterBand::Bandpass => 2,
            FilterBand::Highpass => 3,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            FilterBand::Lowpass => "lowpass",
            FilterBand::Bandpass => "bandpass",
            FilterBand::Highpass => "highpass",
        }
    }
}

/// Raw kernel coefficients, as read from configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KernelSet {
    pub lowpass: Vec<f64>,
    pub bandpass: Vec<f64>,
    pub highpass: Vec<f64>,
}

impl Default for KernelSet {
    fn default() -> Self {
        Self {
            lowpass: vec![0.2, 0.2, 0.2, 0.2, 0.2],
            bandpass: vec![-0.25, 0.0, 0.5, 0.0, -0.25],
            highpass: vec![-0.25, 0.5, -0.25],
        }
    }
}

/// One named FIR kernel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterKernel {
    pub band: FilterBand,
    pub coefficients: Vec<f64>,
}

impl FilterKernel {
    pub fn new(band: FilterBand, coefficients: Vec<f64>) -> ProcessingResult<Self> {
        if coefficients.is_empty() {
            return Err(ProcessingError::InvalidConfig(format!(
                "{} kernel has no coefficients",
                band.label()
            )));
        }
        if !StatsHelper::all_finite(&coefficients) {
            return Err(ProcessingError::InvalidConfig(format!(
                "{} kernel has non-finite coefficients",
                band.label()
            )));
        }
        Ok(Self { band, coefficients })
    }

    pub fn len(&self) -> usize {
        self.coefficients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coefficients.is_empty()
    }
}

/// Immutable lowpass/bandpass/highpass kernel triple, validated at construction.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterBank {
    kernels: [FilterKernel; 3],
}

impl FilterBank {
    pub fn from_set(set: &KernelSet) -> ProcessingResult<Self> {
        Ok(Self {
            kernels: [
                FilterKernel::new(FilterBand::Lowpass, set.lowpass.clone())?,
                FilterKernel::new(FilterBand::Bandpass, set.bandpass.clone())?,
                FilterKernel::new(FilterBand::Highpass, set.highpass.clone())?,
            ],
        })
    }

    pub fn kernel(&self, band: FilterBand) -> &FilterKernel {
        &self.kernels[band.index() - 1]
    }

    pub fn kernels(&self) -> &[FilterKernel] {
        &self.kernels
    }
}
