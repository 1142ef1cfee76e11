pub mod bank;
pub mod convolution;
pub mod filter;
pub mod spectrum;

pub use bank::{FilterBand, FilterBank, FilterKernel, KernelSet};
pub use convolution::convolve;
pub use filter::FilterStage;
pub use spectrum::{dtft, Spectrum, SpectrumStage};
