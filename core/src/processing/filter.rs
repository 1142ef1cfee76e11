use crate::math::stats::StatsHelper;
use crate::prelude::{
    ConvolutionMode, ProcessingError, ProcessingResult, ProcessingStage, StageConfig, StageInput,
    StageMetadata, StageOutput,
};
use crate::processing::bank::FilterKernel;
use crate::processing::convolution::convolve;
use crate::telemetry::log::LogManager;

/// Filtering stage that convolves each station trace with one bank kernel.
pub struct FilterStage {
    kernel: FilterKernel,
    mode: Option<ConvolutionMode>,
    logger: LogManager,
}

impl FilterStage {
    pub fn new(kernel: FilterKernel) -> Self {
        Self {
            kernel,
            mode: None,
            logger: LogManager::new(),
        }
    }

    pub fn kernel(&self) -> &FilterKernel {
        &self.kernel
    }
}

impl ProcessingStage for FilterStage {
    fn initialize(&mut self, config: &StageConfig) -> ProcessingResult<()> {
        self.mode = Some(config.mode);
        Ok(())
    }

    fn execute(&mut self, input: StageInput) -> ProcessingResult<StageOutput> {
        let mode = self
            .mode
            .ok_or_else(|| ProcessingError::Internal("stage not initialized".into()))?;

        let filtered = convolve(&input.samples, &self.kernel.coefficients, mode)?;
        let rms = StatsHelper::rms(&filtered);
        let label = self.kernel.band.label();
        match input.station {
            Some(station) => self
                .logger
                .debug(&format!("{} station {:03} RMS {:.4}", label, station, rms)),
            None => self.logger.debug(&format!("{} RMS {:.4}", label, rms)),
        }

        let metadata = StageMetadata {
            notes: vec![format!("{} RMS {:.4}", label, rms)],
            ..Default::default()
        };

        Ok(StageOutput {
            samples: filtered,
            metadata,
        })
    }

    fn cleanup(&mut self) {
        self.mode = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::bank::{FilterBand, FilterBank, KernelSet};

    #[test]
    fn filter_stage_preserves_length_in_same_mode() {
        let bank = FilterBank::from_set(&KernelSet::default()).unwrap();
        let mut stage = FilterStage::new(bank.kernel(FilterBand::Lowpass).clone());
        stage.initialize(&StageConfig::default()).unwrap();

        let output = stage
            .execute(StageInput {
                samples: vec![1.0; 16],
                station: Some(3),
            })
            .unwrap();
        assert_eq!(output.samples.len(), 16);
        // interior samples see the whole moving average
        assert!((output.samples[8] - 1.0).abs() < 1e-12);
        assert!(output.metadata.notes[0].starts_with("lowpass RMS"));
        stage.cleanup();
    }

    #[test]
    fn filter_stage_requires_initialization() {
        let bank = FilterBank::from_set(&KernelSet::default()).unwrap();
        let mut stage = FilterStage::new(bank.kernel(FilterBand::Highpass).clone());
        let result = stage.execute(StageInput {
            samples: vec![1.0, 2.0],
            station: None,
        });
        assert!(matches!(result, Err(ProcessingError::Internal(_))));
    }

    #[test]
    fn full_mode_extends_output() {
        let bank = FilterBank::from_set(&KernelSet::default()).unwrap();
        let mut stage = FilterStage::new(bank.kernel(FilterBand::Bandpass).clone());
        stage
            .initialize(&StageConfig {
                mode: ConvolutionMode::Full,
                ..Default::default()
            })
            .unwrap();
        let output = stage
            .execute(StageInput {
                samples: vec![0.0, 1.0, 0.0],
                station: None,
            })
            .unwrap();
        assert_eq!(output.samples.len(), 3 + 5 - 1);
    }
}
