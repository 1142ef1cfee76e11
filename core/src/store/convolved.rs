use crate::prelude::ProcessingResult;
use crate::processing::bank::FilterBand;
use crate::store::codec::ArrayBundle;
use ndarray::Array1;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Addressable store of filtered station traces keyed by (kernel, station).
pub trait ConvolvedStore {
    fn put(&mut self, band: FilterBand, station: usize, signal: &[f64]) -> ProcessingResult<()>;
    fn get(&self, band: FilterBand, station: usize) -> ProcessingResult<Option<Vec<f64>>>;
    fn contains(&self, band: FilterBand, station: usize) -> bool;
}

const SIGNAL_KEY: &str = "signal";

/// One file per (kernel, station) pair under a root directory.
pub struct DirectoryStore {
    root: PathBuf,
}

impl DirectoryStore {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, band: FilterBand, station: usize) -> PathBuf {
        self.root.join(format!("h{}_x{:03}.bin", band.index(), station))
    }
}

impl ConvolvedStore for DirectoryStore {
    fn put(&mut self, band: FilterBand, station: usize, signal: &[f64]) -> ProcessingResult<()> {
        let mut bundle = ArrayBundle::new();
        bundle.insert(SIGNAL_KEY, Array1::from(signal.to_vec()));
        bundle.save(&self.path_for(band, station))
    }

    fn get(&self, band: FilterBand, station: usize) -> ProcessingResult<Option<Vec<f64>>> {
        let path = self.path_for(band, station);
        if !path.exists() {
            return Ok(None);
        }
        let mut bundle = ArrayBundle::load(&path)?;
        Ok(Some(bundle.take1(SIGNAL_KEY)?.to_vec()))
    }

    fn contains(&self, band: FilterBand, station: usize) -> bool {
        self.path_for(band, station).exists()
    }
}

/// In-process store, used when the filtered traces need not outlive the run.
#[derive(Default)]
pub struct MemoryStore {
    signals: HashMap<(FilterBand, usize), Vec<f64>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.signals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signals.is_empty()
    }
}

impl ConvolvedStore for MemoryStore {
    fn put(&mut self, band: FilterBand, station: usize, signal: &[f64]) -> ProcessingResult<()> {
        self.signals.insert((band, station), signal.to_vec());
        Ok(())
    }

    fn get(&self, band: FilterBand, station: usize) -> ProcessingResult<Option<Vec<f64>>> {
        Ok(self.signals.get(&(band, station)).cloned())
    }

    fn contains(&self, band: FilterBand, station: usize) -> bool {
        self.signals.contains_key(&(band, station))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exercise(store: &mut dyn ConvolvedStore) {
        assert!(!store.contains(FilterBand::Bandpass, 7));
        assert_eq!(store.get(FilterBand::Bandpass, 7).unwrap(), None);

        store.put(FilterBand::Bandpass, 7, &[1.0, -1.0, 0.5]).unwrap();
        store.put(FilterBand::Highpass, 7, &[9.0]).unwrap();
        assert!(store.contains(FilterBand::Bandpass, 7));
        assert!(!store.contains(FilterBand::Lowpass, 7));
        assert_eq!(
            store.get(FilterBand::Bandpass, 7).unwrap(),
            Some(vec![1.0, -1.0, 0.5])
        );

        store.put(FilterBand::Bandpass, 7, &[2.0]).unwrap();
        assert_eq!(store.get(FilterBand::Bandpass, 7).unwrap(), Some(vec![2.0]));
        assert_eq!(store.get(FilterBand::Highpass, 7).unwrap(), Some(vec![9.0]));
    }

    #[test]
    fn memory_store_addresses_by_kernel_and_station() {
        exercise(&mut MemoryStore::new());
    }

    #[test]
    fn directory_store_addresses_by_kernel_and_station() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = DirectoryStore::new(dir.path().join("convolved"));
        exercise(&mut store);
        assert!(store.root().join("h2_x007.bin").exists());
    }
}
