use crate::prelude::{ProcessingError, ProcessingResult};
use crate::store::codec::ArrayBundle;
use ndarray::Array1;
use std::path::{Path, PathBuf};

pub const ARRIVAL_TIMES_FILE: &str = "arrival_times.bin";
pub const VALIDITY_FILE: &str = "validity.bin";
const VALUES_KEY: &str = "values";

/// Parallel per-station arrival times and validity scores.
///
/// An arrival time of exactly 0 means the station has not been annotated yet.
#[derive(Debug, Clone, PartialEq)]
pub struct Annotations {
    pub arrival_times: Vec<f64>,
    pub validity: Vec<f64>,
}

impl Annotations {
    pub fn zeroed(stations: usize) -> Self {
        Self {
            arrival_times: vec![0.0; stations],
            validity: vec![0.0; stations],
        }
    }

    pub fn len(&self) -> usize {
        self.arrival_times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arrival_times.is_empty()
    }

    pub fn is_annotated(&self, station: usize) -> bool {
        self.arrival_times[station] != 0.0
    }

    pub fn pending(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.len()).filter(move |&station| !self.is_annotated(station))
    }

    pub fn annotated_count(&self) -> usize {
        self.arrival_times.iter().filter(|&&t| t != 0.0).count()
    }

    /// Records an annotation unless the station already has one; returns whether it was applied.
    pub fn record(&mut self, station: usize, arrival_time: f64, validity: f64) -> bool {
        if self.is_annotated(station) {
            return false;
        }
        self.arrival_times[station] = arrival_time;
        self.validity[station] = validity;
        true
    }
}

/// Durable home of the annotation arrays.
pub trait AnnotationStorage {
    /// Returns the stored annotations, or zero vectors when nothing was stored yet.
    fn load(&self, stations: usize) -> ProcessingResult<Annotations>;
    /// Rewrites both arrays in full.
    fn persist(&mut self, annotations: &Annotations) -> ProcessingResult<()>;
}

/// Two single-array files in one directory, each replaced atomically on persist.
///
/// Validity is written before arrival times, so the arrival file is the commit point:
/// an interrupted persist leaves the in-flight station at arrival 0 and it is offered
/// again, with its stale validity overwritten by the next `record`.
pub struct FileAnnotationStore {
    root: PathBuf,
}

impl FileAnnotationStore {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    fn read_or_zero(&self, file: &str, stations: usize) -> ProcessingResult<Vec<f64>> {
        let path = self.root.join(file);
        if !path.exists() {
            return Ok(vec![0.0; stations]);
        }
        let values = ArrayBundle::load(&path)?.take1(VALUES_KEY)?.to_vec();
        if values.len() != stations {
            return Err(ProcessingError::Format(format!(
                "{} holds {} entries for {} stations",
                file,
                values.len(),
                stations
            )));
        }
        Ok(values)
    }

    fn write(&self, file: &str, values: &[f64]) -> ProcessingResult<()> {
        let mut bundle = ArrayBundle::new();
        bundle.insert(VALUES_KEY, Array1::from(values.to_vec()));
        bundle.save(&self.root.join(file))
    }
}

impl AnnotationStorage for FileAnnotationStore {
    fn load(&self, stations: usize) -> ProcessingResult<Annotations> {
        // arrivals without a validity file were never committed
        if !self.root.join(VALIDITY_FILE).exists() {
            return Ok(Annotations::zeroed(stations));
        }
        Ok(Annotations {
            arrival_times: self.read_or_zero(ARRIVAL_TIMES_FILE, stations)?,
            validity: self.read_or_zero(VALIDITY_FILE, stations)?,
        })
    }

    fn persist(&mut self, annotations: &Annotations) -> ProcessingResult<()> {
        self.write(VALIDITY_FILE, &annotations.validity)?;
        self.write(ARRIVAL_TIMES_FILE, &annotations.arrival_times)
    }
}
