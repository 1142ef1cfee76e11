pub mod normalize;
pub mod record;
pub mod timestamp;

pub use normalize::{ingest, IngestConfig, StationArchive, StationView};
pub use record::{RawRecording, RawWaveform};
pub use timestamp::parse_start_time;
