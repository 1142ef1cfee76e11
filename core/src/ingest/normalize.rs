use crate::ingest::record::RawRecording;
use crate::ingest::timestamp::parse_start_time;
use crate::math::geo::GeoPoint;
use crate::prelude::{ProcessingError, ProcessingResult};
use crate::telemetry::log::LogManager;
use ndarray::{s, Array1, Array2, ArrayView1};
use serde::{Deserialize, Serialize};

/// Hunga Tonga-Hunga Ha'apai.
pub const DEFAULT_REFERENCE: GeoPoint = GeoPoint {
    latitude: -20.546,
    longitude: -175.390,
};

/// Matrix width, sized above the longest expected recording.
pub const DEFAULT_MAX_LEN: usize = 720_000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestConfig {
    pub max_len: usize,
    pub reference: GeoPoint,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            max_len: DEFAULT_MAX_LEN,
            reference: DEFAULT_REFERENCE,
        }
    }
}

/// Dense, padded station matrices shared by every downstream stage.
///
/// Rows shorter than `max_len` are zero in both `data` and `times` past their native
/// length, so trailing zero timestamps mark the padding.
#[derive(Debug, Clone, PartialEq)]
pub struct StationArchive {
    pub data: Array2<f64>,
    pub times: Array2<f64>,
    pub lats: Array1<f64>,
    pub lons: Array1<f64>,
    pub distances: Array1<f64>,
}

/// Borrowed view of one station, trimmed to its native length.
#[derive(Debug, Clone)]
pub struct StationView<'a> {
    pub index: usize,
    pub location: GeoPoint,
    pub distance: f64,
    pub samples: ArrayView1<'a, f64>,
    pub times: ArrayView1<'a, f64>,
}

impl StationArchive {
    pub fn station_count(&self) -> usize {
        self.data.nrows()
    }

    pub fn max_len(&self) -> usize {
        self.data.ncols()
    }

    /// Number of recorded samples, recovered from the timestamp channel.
    pub fn native_len(&self, station: usize) -> usize {
        self.times
            .row(station)
            .iter()
            .rposition(|&t| t != 0.0)
            .map_or(0, |last| last + 1)
    }

    pub fn station(&self, index: usize) -> Option<StationView<'_>> {
        if index >= self.station_count() {
            return None;
        }
        let native = self.native_len(index);
        Some(StationView {
            index,
            location: GeoPoint::new(self.lats[index], self.lons[index]),
            distance: self.distances[index],
            samples: self.data.slice(s![index, ..native]),
            times: self.times.slice(s![index, ..native]),
        })
    }

    /// Checks that all arrays agree on the station count and matrix width.
    pub fn validate_shapes(&self) -> ProcessingResult<()> {
        let stations = self.data.nrows();
        if self.times.dim() != self.data.dim() {
            return Err(ProcessingError::Format(format!(
                "times shape {:?} differs from data shape {:?}",
                self.times.dim(),
                self.data.dim()
            )));
        }
        for (name, len) in [
            ("lats", self.lats.len()),
            ("lons", self.lons.len()),
            ("distances", self.distances.len()),
        ] {
            if len != stations {
                return Err(ProcessingError::Format(format!(
                    "{} holds {} entries for {} stations",
                    name, len, stations
                )));
            }
        }
        Ok(())
    }
}

/// Normalizes raw recordings into a padded station archive.
///
/// Any missing attribute, malformed start time or oversized recording aborts the whole
/// ingestion; no partial archive is produced.
pub fn ingest(recordings: &[RawRecording], config: &IngestConfig) -> ProcessingResult<StationArchive> {
    if config.max_len == 0 {
        return Err(ProcessingError::InvalidConfig("max_len must be positive".into()));
    }

    let logger = LogManager::for_component("ingest");
    let stations = recordings.len();
    let mut data = Array2::<f64>::zeros((stations, config.max_len));
    let mut times = Array2::<f64>::zeros((stations, config.max_len));
    let mut lats = Array1::<f64>::zeros(stations);
    let mut lons = Array1::<f64>::zeros(stations);
    let mut distances = Array1::<f64>::zeros(stations);

    for (index, recording) in recordings.iter().enumerate() {
        let (name, waveform) = recording.primary_waveform().ok_or_else(|| {
            ProcessingError::MissingAttribute(format!("station {}: waveform", index))
        })?;
        let missing = |attribute: &str| {
            ProcessingError::MissingAttribute(format!("station {} ({}): {}", index, name, attribute))
        };

        let starttime = waveform.starttime.as_deref().ok_or_else(|| missing("starttime"))?;
        let delta = waveform.delta.ok_or_else(|| missing("delta"))?;
        let latitude = recording.latitude.ok_or_else(|| missing("latitude"))?;
        let longitude = recording.longitude.ok_or_else(|| missing("longitude"))?;
        let start = parse_start_time(starttime)?;

        let native = waveform.samples.len();
        if native == 0 {
            return Err(ProcessingError::InvalidSignal(format!(
                "station {} ({}): empty waveform",
                index, name
            )));
        }
        if native > config.max_len {
            return Err(ProcessingError::InvalidSignal(format!(
                "station {} ({}): {} samples exceed max_len {}",
                index, name, native, config.max_len
            )));
        }

        data.slice_mut(s![index, ..native])
            .assign(&ArrayView1::from(waveform.samples.as_slice()));
        times
            .slice_mut(s![index, ..native])
            .assign(&sample_times(start, delta, native));

        let location = GeoPoint::new(latitude, longitude);
        lats[index] = latitude;
        lons[index] = longitude;
        distances[index] = config.reference.haversine_m(&location);

        logger.debug(&format!(
            "station {:03} {} samples={} distance={:.1} km",
            index,
            name,
            native,
            distances[index] / 1000.0
        ));
    }

    logger.record(&format!("ingested {} stations", stations));
    Ok(StationArchive {
        data,
        times,
        lats,
        lons,
        distances,
    })
}

/// Absolute sample times spread linearly over `[start, start + delta * len]`.
fn sample_times(start: f64, delta: f64, len: usize) -> Array1<f64> {
    if len == 1 {
        return Array1::from_elem(1, start);
    }
    let step = delta * len as f64 / (len - 1) as f64;
    Array1::from_iter((0..len).map(|k| start + k as f64 * step))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::record::RawWaveform;
    use crate::math::geo::MEAN_EARTH_RADIUS_M;
    use std::collections::BTreeMap;

    const ERUPTION_MORNING: f64 = 1_642_219_200.0;

    fn recording(lat: f64, lon: f64, delta: f64, samples: Vec<f64>) -> RawRecording {
        let mut waveforms = BTreeMap::new();
        waveforms.insert(
            "XX.STA..BDF".to_string(),
            RawWaveform {
                starttime: Some("2022-01-15T04:00:00.000000Z".into()),
                delta: Some(delta),
                samples,
            },
        );
        RawRecording {
            latitude: Some(lat),
            longitude: Some(lon),
            waveforms,
        }
    }

    fn two_station_config() -> IngestConfig {
        IngestConfig {
            max_len: 8,
            reference: GeoPoint::new(0.0, 0.0),
        }
    }

    #[test]
    fn two_stations_produce_expected_matrices() {
        let recordings = vec![
            recording(0.0, 1.0, 0.75, vec![1.0, -2.0, 3.0, -4.0]),
            recording(90.0, 0.0, 0.25, vec![0.5, 0.0, 1.5, 2.0, -1.0, 6.0]),
        ];
        let archive = ingest(&recordings, &two_station_config()).unwrap();

        assert_eq!(archive.data.dim(), (2, 8));
        assert_eq!(archive.times.dim(), (2, 8));
        assert_eq!(
            archive.data.row(0).to_vec(),
            vec![1.0, -2.0, 3.0, -4.0, 0.0, 0.0, 0.0, 0.0]
        );
        assert_eq!(
            archive.data.row(1).to_vec(),
            vec![0.5, 0.0, 1.5, 2.0, -1.0, 6.0, 0.0, 0.0]
        );

        // 4 samples spanning 0.75 * 4 = 3 s, 6 samples spanning 0.25 * 6 = 1.5 s
        let t = ERUPTION_MORNING;
        let expected_times = [
            [t, t + 1.0, t + 2.0, t + 3.0, 0.0, 0.0, 0.0, 0.0],
            [t, t + 0.3, t + 0.6, t + 0.9, t + 1.2, t + 1.5, 0.0, 0.0],
        ];
        for (row, expected) in expected_times.iter().enumerate() {
            for (col, want) in expected.iter().enumerate() {
                let got = archive.times[[row, col]];
                assert!((got - want).abs() < 1e-6, "times[{}][{}] = {}", row, col, got);
            }
        }

        let one_degree = MEAN_EARTH_RADIUS_M * std::f64::consts::PI / 180.0;
        let quarter = MEAN_EARTH_RADIUS_M * std::f64::consts::PI / 2.0;
        assert!((archive.distances[0] - one_degree).abs() < 1e-6);
        assert!((archive.distances[1] - quarter).abs() < 1e-6);
        assert_eq!(archive.lats.to_vec(), vec![0.0, 90.0]);
        assert_eq!(archive.lons.to_vec(), vec![1.0, 0.0]);
    }

    #[test]
    fn padded_tail_is_zero_in_both_channels() {
        let recordings = vec![
            recording(10.0, 10.0, 0.5, vec![0.0, 0.0, 1.0]),
            recording(-10.0, 20.0, 0.5, vec![2.0; 5]),
        ];
        let archive = ingest(&recordings, &two_station_config()).unwrap();
        for (station, native) in [(0, 3), (1, 5)] {
            assert_eq!(archive.native_len(station), native);
            for col in native..archive.max_len() {
                assert_eq!(archive.data[[station, col]], 0.0);
                assert_eq!(archive.times[[station, col]], 0.0);
            }
        }
        // leading zero amplitudes are signal, not padding
        let view = archive.station(0).unwrap();
        assert_eq!(view.samples.to_vec(), vec![0.0, 0.0, 1.0]);
        assert_eq!(view.times.len(), 3);
    }

    #[test]
    fn missing_attributes_abort_ingestion() {
        let mut no_delta = recording(0.0, 0.0, 1.0, vec![1.0]);
        if let Some(waveform) = no_delta.waveforms.values_mut().next() {
            waveform.delta = None;
        }
        let mut no_lat = recording(0.0, 0.0, 1.0, vec![1.0]);
        no_lat.latitude = None;
        let no_waveform = RawRecording {
            latitude: Some(0.0),
            longitude: Some(0.0),
            waveforms: BTreeMap::new(),
        };

        for broken in [no_delta, no_lat, no_waveform] {
            let recordings = vec![recording(0.0, 0.0, 1.0, vec![1.0]), broken];
            assert!(matches!(
                ingest(&recordings, &two_station_config()),
                Err(ProcessingError::MissingAttribute(_))
            ));
        }
    }

    #[test]
    fn malformed_start_time_aborts_ingestion() {
        let mut broken = recording(0.0, 0.0, 1.0, vec![1.0]);
        if let Some(waveform) = broken.waveforms.values_mut().next() {
            waveform.starttime = Some("2022-01-15 04:00:00".into());
        }
        assert!(matches!(
            ingest(&[broken], &two_station_config()),
            Err(ProcessingError::MalformedTimestamp { .. })
        ));
    }

    #[test]
    fn oversized_or_empty_recordings_are_rejected() {
        let long = recording(0.0, 0.0, 1.0, vec![1.0; 9]);
        assert!(matches!(
            ingest(&[long], &two_station_config()),
            Err(ProcessingError::InvalidSignal(_))
        ));
        let empty = recording(0.0, 0.0, 1.0, Vec::new());
        assert!(ingest(&[empty], &two_station_config()).is_err());
    }

    #[test]
    fn single_sample_recording_sits_at_start_time() {
        let archive = ingest(&[recording(0.0, 0.0, 2.0, vec![7.0])], &two_station_config()).unwrap();
        assert_eq!(archive.times[[0, 0]], ERUPTION_MORNING);
        assert_eq!(archive.native_len(0), 1);
    }
}
