use crate::generator::profile::GeneratorConfig;
use anyhow::Context;
use infracore::ingest::normalize::{IngestConfig, DEFAULT_MAX_LEN, DEFAULT_REFERENCE};
use infracore::math::geo::GeoPoint;
use infracore::prelude::{ConvolutionMode, StageConfig};
use infracore::processing::bank::{FilterBank, KernelSet};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    /// Directory of raw per-station JSON recordings.
    pub raw_dir: PathBuf,
    /// Station archive written by ingestion.
    pub archive_path: PathBuf,
    pub convolved_dir: PathBuf,
    pub annotations_dir: PathBuf,
    pub reports_dir: PathBuf,
    pub max_len: usize,
    pub reference: GeoPoint,
    pub kernels: KernelSet,
    pub convolution_mode: ConvolutionMode,
    /// Sampling rate in Hz for spectra; derived from the archive when unset.
    pub sampling_rate: Option<f64>,
    pub spectrum_points: Option<usize>,
    pub fit_degree: usize,
    /// Concurrent stations while applying the filter bank.
    pub workers: usize,
    /// Keep every n-th sample in distance-time sections.
    pub section_decimation: usize,
    pub synthetic: GeneratorConfig,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            raw_dir: PathBuf::from("data/raw"),
            archive_path: PathBuf::from("data/processed/processed.bin"),
            convolved_dir: PathBuf::from("data/convolved"),
            annotations_dir: PathBuf::from("data/annotations"),
            reports_dir: PathBuf::from("reports"),
            max_len: DEFAULT_MAX_LEN,
            reference: DEFAULT_REFERENCE,
            kernels: KernelSet::default(),
            convolution_mode: ConvolutionMode::Same,
            sampling_rate: None,
            spectrum_points: None,
            fit_degree: 1,
            workers: 4,
            section_decimation: 100,
            synthetic: GeneratorConfig::default(),
        }
    }
}

impl WorkflowConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref)
            .with_context(|| format!("reading workflow config {}", path_ref.display()))?;
        let config: WorkflowConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("parsing workflow config {}", path_ref.display()))?;
        Ok(config)
    }

    pub fn to_ingest_config(&self) -> IngestConfig {
        IngestConfig {
            max_len: self.max_len,
            reference: self.reference,
        }
    }

    pub fn to_stage_config(&self, sampling_rate: f64) -> StageConfig {
        StageConfig {
            mode: self.convolution_mode,
            sampling_rate,
            spectrum_points: self.spectrum_points,
        }
    }

    pub fn filter_bank(&self) -> anyhow::Result<FilterBank> {
        FilterBank::from_set(&self.kernels).context("validating filter kernels")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn defaults_build_a_valid_filter_bank() {
        let cfg = WorkflowConfig::default();
        assert_eq!(cfg.to_ingest_config().max_len, 720_000);
        assert!(cfg.filter_bank().is_ok());
        assert_eq!(cfg.to_stage_config(20.0).mode, ConvolutionMode::Same);
    }

    #[test]
    fn config_load_reads_yaml() {
        let mut temp = NamedTempFile::new().unwrap();
        temp.write_all(
            b"max_len: 4096\nreference:\n  latitude: 1.5\n  longitude: -2.0\nconvolution_mode: full\nkernels:\n  highpass: [1.0, -1.0]\n",
        )
        .unwrap();
        let path = temp.into_temp_path();
        let cfg = WorkflowConfig::load(&path).unwrap();
        assert_eq!(cfg.max_len, 4096);
        assert_eq!(cfg.reference, GeoPoint::new(1.5, -2.0));
        assert_eq!(cfg.convolution_mode, ConvolutionMode::Full);
        assert_eq!(cfg.kernels.highpass, vec![1.0, -1.0]);
        assert_eq!(cfg.kernels.lowpass.len(), 5);
        assert_eq!(cfg.fit_degree, 1);
    }

    #[test]
    fn empty_kernel_in_yaml_is_rejected_at_startup() {
        let mut temp = NamedTempFile::new().unwrap();
        temp.write_all(b"kernels:\n  lowpass: []\n").unwrap();
        let path = temp.into_temp_path();
        let cfg = WorkflowConfig::load(&path).unwrap();
        assert!(cfg.filter_bank().is_err());
    }
}
