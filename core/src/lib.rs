//! Signal-processing core for the infrasound arrival-time pipeline.
//!
//! Raw station recordings are normalized into a padded station archive, filtered
//! through a fixed FIR bank, inspected in the frequency domain and annotated by an
//! analyst one station at a time. The annotated arrivals feed a weighted
//! distance/time fit that yields the apparent propagation velocity.

pub mod arrival;
pub mod fit;
pub mod ingest;
pub mod math;
pub mod prelude;
pub mod processing;
pub mod store;
pub mod telemetry;

pub use prelude::{
    ConvolutionMode, ProcessingError, ProcessingResult, ProcessingStage, StageInput, StageOutput,
};
