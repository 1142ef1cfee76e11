use crate::ingest::normalize::StationArchive;
use crate::prelude::ProcessingResult;
use crate::store::codec::ArrayBundle;
use std::path::Path;

impl StationArchive {
    /// Persists the archive atomically under the `data`/`times`/`lats`/`lons`/`distances` keys.
    pub fn save(&self, path: &Path) -> ProcessingResult<()> {
        self.validate_shapes()?;
        let mut bundle = ArrayBundle::new();
        bundle.insert("data", self.data.clone());
        bundle.insert("times", self.times.clone());
        bundle.insert("lats", self.lats.clone());
        bundle.insert("lons", self.lons.clone());
        bundle.insert("distances", self.distances.clone());
        bundle.save(path)
    }

    pub fn load(path: &Path) -> ProcessingResult<Self> {
        let mut bundle = ArrayBundle::load(path)?;
        let archive = Self {
            data: bundle.take2("data")?,
            times: bundle.take2("times")?,
            lats: bundle.take1("lats")?,
            lons: bundle.take1("lons")?,
            distances: bundle.take1("distances")?,
        };
        archive.validate_shapes()?;
        Ok(archive)
    }
}

#[cfg(test)]
mod tests {
    use crate::ingest::normalize::{ingest, IngestConfig, StationArchive};
    use crate::ingest::record::{RawRecording, RawWaveform};
    use crate::math::geo::GeoPoint;
    use crate::prelude::ProcessingError;
    use crate::store::codec::ArrayBundle;
    use ndarray::array;
    use std::collections::BTreeMap;

    fn recording(lat: f64, lon: f64, samples: Vec<f64>) -> RawRecording {
        let mut waveforms = BTreeMap::new();
        waveforms.insert(
            "IM.I22H1..BDF".to_string(),
            RawWaveform {
                starttime: Some("2022-01-15T04:14:45.123456Z".into()),
                delta: Some(0.05),
                samples,
            },
        );
        RawRecording {
            latitude: Some(lat),
            longitude: Some(lon),
            waveforms,
        }
    }

    #[test]
    fn ingested_archive_round_trips_losslessly() {
        let config = IngestConfig {
            max_len: 16,
            reference: GeoPoint::new(-20.546, -175.390),
        };
        let recordings = vec![
            recording(-33.87, 151.21, vec![0.1, -0.2, 0.3]),
            recording(35.68, 139.69, (0..16).map(|i| (i as f64).sin()).collect()),
            recording(51.5, -0.12, vec![1e-9; 7]),
        ];
        let archive = ingest(&recordings, &config).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("processed.bin");
        archive.save(&path).unwrap();
        let restored = StationArchive::load(&path).unwrap();
        assert_eq!(restored, archive);
    }

    #[test]
    fn missing_key_is_reported_by_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("partial.bin");
        let mut bundle = ArrayBundle::new();
        bundle.insert("data", array![[1.0, 2.0]]);
        bundle.insert("times", array![[1.0, 2.0]]);
        bundle.insert("lats", array![0.0]);
        bundle.insert("lons", array![0.0]);
        bundle.save(&path).unwrap();

        match StationArchive::load(&path) {
            Err(ProcessingError::MissingAttribute(message)) => assert!(message.contains("distances")),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn inconsistent_shapes_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("skewed.bin");
        let mut bundle = ArrayBundle::new();
        bundle.insert("data", array![[1.0, 2.0], [3.0, 4.0]]);
        bundle.insert("times", array![[1.0, 2.0], [3.0, 4.0]]);
        bundle.insert("lats", array![0.0]);
        bundle.insert("lons", array![0.0, 1.0]);
        bundle.insert("distances", array![0.0, 1.0]);
        bundle.save(&path).unwrap();

        assert!(matches!(
            StationArchive::load(&path),
            Err(ProcessingError::Format(_))
        ));
    }
}
