use crate::prelude::{ProcessingError, ProcessingResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One named waveform inside a station recording.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawWaveform {
    /// Start time, `%Y-%m-%dT%H:%M:%S%.fZ`.
    pub starttime: Option<String>,
    /// Sampling interval in seconds.
    pub delta: Option<f64>,
    #[serde(default)]
    pub samples: Vec<f64>,
}

/// Raw per-station recording as delivered by the archive export.
///
/// Required attributes are optional at the serde level so that their absence is
/// reported as a missing attribute rather than a parse failure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawRecording {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    #[serde(default)]
    pub waveforms: BTreeMap<String, RawWaveform>,
}

impl RawRecording {
    pub fn from_json(contents: &str) -> ProcessingResult<Self> {
        serde_json::from_str(contents)
            .map_err(|err| ProcessingError::Format(format!("raw recording: {}", err)))
    }

    /// The waveform used for processing: the first one by name.
    pub fn primary_waveform(&self) -> Option<(&str, &RawWaveform)> {
        self.waveforms
            .iter()
            .next()
            .map(|(name, waveform)| (name.as_str(), waveform))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_recording_and_picks_first_waveform() {
        let json = r#"{
            "latitude": -33.1,
            "longitude": 151.2,
            "waveforms": {
                "IM.AS02..BDF": {"starttime": "2022-01-15T04:00:00.000000Z", "delta": 0.05, "samples": [3.0]},
                "IM.AS01..BDF": {"starttime": "2022-01-15T04:00:00.000000Z", "delta": 0.05, "samples": [1.0, 2.0]}
            }
        }"#;
        let recording = RawRecording::from_json(json).unwrap();
        let (name, waveform) = recording.primary_waveform().unwrap();
        assert_eq!(name, "IM.AS01..BDF");
        assert_eq!(waveform.samples, vec![1.0, 2.0]);
        assert_eq!(recording.latitude, Some(-33.1));
    }

    #[test]
    fn absent_attributes_deserialize_as_none() {
        let recording = RawRecording::from_json(r#"{"waveforms": {"a": {"samples": [1.0]}}}"#).unwrap();
        assert!(recording.latitude.is_none());
        let (_, waveform) = recording.primary_waveform().unwrap();
        assert!(waveform.starttime.is_none());
        assert!(waveform.delta.is_none());
    }

    #[test]
    fn garbage_is_a_format_error() {
        assert!(matches!(
            RawRecording::from_json("not json"),
            Err(ProcessingError::Format(_))
        ));
    }
}
