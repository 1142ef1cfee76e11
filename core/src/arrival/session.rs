use crate::arrival::estimator::mark_arrival;
use crate::arrival::port::{AnnotationPort, AnnotationRequest, Trace};
use crate::ingest::normalize::StationArchive;
use crate::prelude::{ProcessingError, ProcessingResult};
use crate::processing::bank::{FilterBand, FilterBank};
use crate::store::annotations::AnnotationStorage;
use crate::store::convolved::ConvolvedStore;
use crate::telemetry::log::LogManager;
use crate::telemetry::metrics::{MetricsRecorder, MetricsSnapshot};

pub const RAW_TRACE_LABEL: &str = "raw";

/// Outcome of one pass over the stations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionSummary {
    pub annotated: usize,
    pub skipped: usize,
    pub already_done: usize,
}

/// Resumable annotation pass over every station that has no arrival yet.
pub struct AnnotationSession<'a> {
    archive: &'a StationArchive,
    bank: &'a FilterBank,
    filtered: &'a dyn ConvolvedStore,
    logger: LogManager,
    metrics: MetricsRecorder,
}

impl<'a> AnnotationSession<'a> {
    pub fn new(
        archive: &'a StationArchive,
        bank: &'a FilterBank,
        filtered: &'a dyn ConvolvedStore,
    ) -> Self {
        Self {
            archive,
            bank,
            filtered,
            logger: LogManager::for_component("annotate"),
            metrics: MetricsRecorder::new(),
        }
    }

    /// Stations annotated, skipped and failed over every pass of this session.
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Offers each unannotated station to `port` once, persisting after every success.
    ///
    /// Stations with a non-zero stored arrival are never offered. An aborted
    /// interaction leaves the station pending for the next pass.
    pub fn run<P, S>(&self, port: &mut P, storage: &mut S) -> ProcessingResult<SessionSummary>
    where
        P: AnnotationPort + ?Sized,
        S: AnnotationStorage + ?Sized,
    {
        let stations = self.archive.station_count();
        let mut annotations = storage.load(stations)?;
        let mut summary = SessionSummary {
            already_done: annotations.annotated_count(),
            ..Default::default()
        };
        self.logger.record(&format!(
            "{} of {} stations already annotated",
            summary.already_done, stations
        ));

        let pending: Vec<usize> = annotations.pending().collect();
        for station in pending {
            let Some(view) = self.archive.station(station) else {
                continue;
            };
            if view.times.is_empty() {
                self.logger
                    .warn(&format!("station {:03} has no recorded samples", station));
                self.metrics.record_skipped();
                summary.skipped += 1;
                continue;
            }

            let times = view.times.to_vec();
            let owned = self.traces_for(station, times.len())?;
            let traces: Vec<Trace<'_>> = owned
                .iter()
                .map(|(label, samples)| Trace { label, samples })
                .collect();
            let request = AnnotationRequest {
                station,
                distance: view.distance,
                times: &times,
                traces: &traces,
            };

            match mark_arrival(port, &request) {
                Ok(annotation) => {
                    annotations.record(station, annotation.arrival_time, annotation.validity);
                    if let Err(err) = storage.persist(&annotations) {
                        self.metrics.record_error();
                        return Err(err);
                    }
                    self.metrics.record_processed();
                    summary.annotated += 1;
                    self.logger.record(&format!(
                        "station {:03} arrival {:.3} validity {:.3}",
                        station, annotation.arrival_time, annotation.validity
                    ));
                }
                Err(ProcessingError::NoAnnotationProvided(_)) => {
                    self.metrics.record_skipped();
                    summary.skipped += 1;
                    self.logger
                        .warn(&format!("station {:03} left unannotated", station));
                }
                Err(err) => {
                    self.metrics.record_error();
                    return Err(err);
                }
            }
        }

        Ok(summary)
    }

    /// Raw trace plus every stored filtered variant, trimmed to the native length.
    fn traces_for(&self, station: usize, native: usize) -> ProcessingResult<Vec<(String, Vec<f64>)>> {
        let raw: Vec<f64> = self
            .archive
            .data
            .row(station)
            .iter()
            .take(native)
            .copied()
            .collect();
        let mut traces = vec![(RAW_TRACE_LABEL.to_string(), raw)];

        for band in FilterBand::ALL {
            let Some(signal) = self.filtered.get(band, station)? else {
                self.logger.debug(&format!(
                    "station {:03} has no {} trace",
                    station,
                    band.label()
                ));
                continue;
            };
            let offset = self.alignment_offset(band, signal.len())?;
            let aligned: Vec<f64> = signal.iter().skip(offset).take(native).copied().collect();
            traces.push((band.label().to_string(), aligned));
        }
        Ok(traces)
    }

    /// Leading samples to drop so a stored trace lines up with the raw one.
    fn alignment_offset(&self, band: FilterBand, stored_len: usize) -> ProcessingResult<usize> {
        let width = self.archive.max_len();
        let kernel_len = self.bank.kernel(band).len();
        if stored_len == width {
            Ok(0)
        } else if stored_len == width + kernel_len - 1 {
            Ok((kernel_len - 1) / 2)
        } else {
            Err(ProcessingError::Format(format!(
                "{} trace of {} samples does not match matrix width {}",
                band.label(),
                stored_len,
                width
            )))
        }
    }
}
