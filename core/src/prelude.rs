use serde::{Deserialize, Serialize};

/// Output-length policy for linear convolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConvolutionMode {
    /// `len(signal) + len(kernel) - 1` samples, nothing trimmed.
    Full,
    /// `len(signal)` samples, centered on the full result.
    #[default]
    Same,
}

/// Shared configuration for each processing stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageConfig {
    pub mode: ConvolutionMode,
    pub sampling_rate: f64,
    pub spectrum_points: Option<usize>,
}

impl Default for StageConfig {
    fn default() -> Self {
        Self {
            mode: ConvolutionMode::Same,
            sampling_rate: 1.0,
            spectrum_points: None,
        }
    }
}

/// Input payload for a processing stage.
#[derive(Debug, Clone)]
pub struct StageInput {
    pub samples: Vec<f64>,
    pub station: Option<usize>,
}

/// Output produced by each stage.
#[derive(Debug, Clone)]
pub struct StageOutput {
    pub samples: Vec<f64>,
    pub metadata: StageMetadata,
}

/// Metadata used for chaining stages and telemetry.
#[derive(Debug, Clone, Default)]
pub struct StageMetadata {
    pub frequencies: Option<Vec<f64>>,
    pub peak_frequency: Option<f64>,
    pub notes: Vec<String>,
}

/// Common error type for the processing core.
#[derive(thiserror::Error, Debug)]
pub enum ProcessingError {
    #[error("missing attribute: {0}")]
    MissingAttribute(String),
    #[error("malformed timestamp {value:?}: {reason}")]
    MalformedTimestamp { value: String, reason: String },
    #[error("invalid signal: {0}")]
    InvalidSignal(String),
    #[error("no annotation provided for station {0}")]
    NoAnnotationProvided(usize),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("malformed archive: {0}")]
    Format(String),
    #[error("internal failure: {0}")]
    Internal(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type ProcessingResult<T> = Result<T, ProcessingError>;

/// Trait describing object-oriented signal-processing stages.
pub trait ProcessingStage {
    fn initialize(&mut self, config: &StageConfig) -> ProcessingResult<()>;
    fn execute(&mut self, input: StageInput) -> ProcessingResult<StageOutput>;
    fn cleanup(&mut self);
}
