use crate::generator::profile::{build_network, recording_json};
use crate::reports::{self, figures};
use crate::workflow::config::WorkflowConfig;
use anyhow::{bail, Context};
use infracore::arrival::port::AnnotationPort;
use infracore::arrival::session::{AnnotationSession, SessionSummary};
use infracore::fit::{fit_velocity, VelocityEstimate};
use infracore::ingest::normalize::{ingest, StationArchive};
use infracore::ingest::record::RawRecording;
use infracore::prelude::{ProcessingResult, ProcessingStage, StageConfig, StageInput};
use infracore::processing::bank::{FilterBand, FilterKernel};
use infracore::processing::filter::FilterStage;
use infracore::store::annotations::{AnnotationStorage, FileAnnotationStore};
use infracore::store::convolved::{ConvolvedStore, DirectoryStore};
use infracore::telemetry::metrics::{MetricsRecorder, MetricsSnapshot};
use std::fs;
use std::path::PathBuf;
use tokio::runtime::Builder as TokioBuilder;
use tokio::task::JoinSet;

/// Filtered variants of one station, in bank order.
type StationFilters = (usize, ProcessingResult<Vec<(FilterBand, Vec<f64>)>>);

#[derive(Clone)]
pub struct Runner {
    config: WorkflowConfig,
}

impl Runner {
    pub fn new(config: WorkflowConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &WorkflowConfig {
        &self.config
    }

    /// Writes one synthetic raw recording per station into `raw_dir`.
    pub fn generate_synthetic(&self) -> anyhow::Result<Vec<PathBuf>> {
        let stations = build_network(&self.config.synthetic, &self.config.reference)
            .context("building synthetic network")?;
        fs::create_dir_all(&self.config.raw_dir)
            .with_context(|| format!("creating {}", self.config.raw_dir.display()))?;

        let mut written = Vec::with_capacity(stations.len());
        for (index, station) in stations.iter().enumerate() {
            let path = self.config.raw_dir.join(format!("station_{:03}.json", index));
            fs::write(&path, recording_json(station)?)
                .with_context(|| format!("writing {}", path.display()))?;
            log::debug!(
                "synthetic station {:03}: {:.1} km, pulse at +{:.1} s",
                index,
                station.distance_m / 1000.0,
                station.arrival_offset
            );
            written.push(path);
        }
        log::info!(
            "generated {} synthetic recordings in {}",
            written.len(),
            self.config.raw_dir.display()
        );
        Ok(written)
    }

    /// Reads every raw recording in name order and writes the station archive.
    pub fn ingest(&self) -> anyhow::Result<StationArchive> {
        let raw_dir = &self.config.raw_dir;
        let mut paths: Vec<PathBuf> = fs::read_dir(raw_dir)
            .with_context(|| format!("listing raw recordings in {}", raw_dir.display()))?
            .filter_map(|entry| entry.ok().map(|entry| entry.path()))
            .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
            .collect();
        paths.sort();
        if paths.is_empty() {
            bail!("no raw recordings found in {}", raw_dir.display());
        }

        let recordings = paths
            .iter()
            .map(|path| {
                let contents = fs::read_to_string(path)
                    .with_context(|| format!("reading {}", path.display()))?;
                RawRecording::from_json(&contents)
                    .with_context(|| format!("parsing {}", path.display()))
            })
            .collect::<anyhow::Result<Vec<_>>>()?;

        let archive = ingest(&recordings, &self.config.to_ingest_config()).context("ingest stage")?;
        archive
            .save(&self.config.archive_path)
            .with_context(|| format!("writing archive {}", self.config.archive_path.display()))?;
        log::info!(
            "ingested {} stations into {}",
            archive.station_count(),
            self.config.archive_path.display()
        );
        Ok(archive)
    }

    pub fn load_archive(&self) -> anyhow::Result<StationArchive> {
        StationArchive::load(&self.config.archive_path).with_context(|| {
            format!(
                "loading archive {} (run --ingest first)",
                self.config.archive_path.display()
            )
        })
    }

    /// Configured sampling rate, or the sample spacing of the first multi-sample station.
    pub fn sampling_rate(&self, archive: &StationArchive) -> anyhow::Result<f64> {
        if let Some(rate) = self.config.sampling_rate {
            return Ok(rate);
        }
        for station in 0..archive.station_count() {
            if archive.native_len(station) < 2 {
                continue;
            }
            let step = archive.times[[station, 1]] - archive.times[[station, 0]];
            if step > 0.0 {
                return Ok(1.0 / step);
            }
        }
        bail!("cannot derive a sampling rate from the archive; set sampling_rate")
    }

    pub fn stage_config(&self, archive: &StationArchive) -> anyhow::Result<StageConfig> {
        Ok(self.config.to_stage_config(self.sampling_rate(archive)?))
    }

    /// Convolves every station with every kernel and stores the results.
    ///
    /// Stations are filtered concurrently in batches of `workers`; writes happen
    /// afterwards on the calling thread.
    pub fn apply_filters(&self, archive: &StationArchive) -> anyhow::Result<MetricsSnapshot> {
        let bank = self.config.filter_bank()?;
        let stage_config = self.config.to_stage_config(self.config.sampling_rate.unwrap_or(1.0));
        let workers = self.config.workers.max(1);
        let metrics = MetricsRecorder::new();
        let mut store = DirectoryStore::new(&self.config.convolved_dir);

        let runtime = TokioBuilder::new_multi_thread()
            .worker_threads(workers)
            .enable_all()
            .build()
            .context("creating filter runtime")?;

        let mut stations: Vec<usize> = Vec::with_capacity(archive.station_count());
        for station in 0..archive.station_count() {
            if archive.native_len(station) == 0 {
                metrics.record_skipped();
                log::warn!("station {:03} has no samples, not filtered", station);
            } else {
                stations.push(station);
            }
        }
        for batch in stations.chunks(workers) {
            let mut results = runtime.block_on(async {
                let mut tasks = JoinSet::new();
                for &station in batch {
                    let row = archive.data.row(station).to_vec();
                    let kernels = bank.kernels().to_vec();
                    let config = stage_config.clone();
                    tasks.spawn_blocking(move || (station, filter_station(row, station, kernels, &config)));
                }
                let mut joined: Vec<StationFilters> = Vec::with_capacity(batch.len());
                while let Some(result) = tasks.join_next().await {
                    joined.push(result.context("filter task panicked")?);
                }
                Ok::<_, anyhow::Error>(joined)
            })?;
            results.sort_by_key(|(station, _)| *station);

            for (station, outcome) in results {
                match outcome {
                    Ok(filtered) => {
                        for (band, signal) in filtered {
                            store
                                .put(band, station, &signal)
                                .with_context(|| format!("storing {} x{:03}", band.label(), station))?;
                        }
                        metrics.record_processed();
                    }
                    Err(err) => {
                        metrics.record_error();
                        log::warn!("station {:03} not filtered: {}", station, err);
                    }
                }
            }
        }

        let snapshot = metrics.snapshot();
        log::info!(
            "apply-filters: {} stations filtered, {} skipped, {} failed, output in {}",
            snapshot.processed,
            snapshot.skipped,
            snapshot.errors,
            store.root().display()
        );
        Ok(snapshot)
    }

    /// Runs one resumable annotation pass through `port`.
    pub fn annotate<P: AnnotationPort + ?Sized>(
        &self,
        archive: &StationArchive,
        port: &mut P,
    ) -> anyhow::Result<SessionSummary> {
        let bank = self.config.filter_bank()?;
        let filtered = DirectoryStore::new(&self.config.convolved_dir);
        let mut storage = FileAnnotationStore::new(&self.config.annotations_dir);
        let session = AnnotationSession::new(archive, &bank, &filtered);
        let outcome = session.run(port, &mut storage);
        let metrics = session.metrics();
        log::info!(
            "annotate: {} stations annotated, {} skipped, {} failed",
            metrics.processed,
            metrics.skipped,
            metrics.errors
        );
        let summary = outcome.context("annotation stage")?;
        log::info!("annotate: {} stations previously done", summary.already_done);
        Ok(summary)
    }

    pub fn fit_velocity(&self, archive: &StationArchive) -> anyhow::Result<VelocityEstimate> {
        let annotations = FileAnnotationStore::new(&self.config.annotations_dir)
            .load(archive.station_count())
            .context("loading annotations")?;
        let distances = archive.distances.to_vec();
        let estimate = fit_velocity(
            &distances,
            &annotations.arrival_times,
            &annotations.validity,
            self.config.fit_degree,
        )
        .context("velocity fit stage")?;
        reports::write_report(&self.config.reports_dir, "velocity.json", &estimate)?;
        log::info!(
            "fit-velocity: {:.1} m/s from {} stations",
            estimate.velocity,
            estimate.stations_used
        );
        Ok(estimate)
    }

    pub fn render_map(&self, archive: &StationArchive) -> anyhow::Result<()> {
        let report = figures::station_map(archive, self.config.reference);
        reports::write_report(&self.config.reports_dir, "map.json", &report)
    }

    pub fn render_distances(&self, archive: &StationArchive) -> anyhow::Result<()> {
        let report = figures::distance_summary(archive).context("distance report")?;
        log::info!(
            "closest station {:.1} km, farthest {:.1} km",
            report.closest_km,
            report.farthest_km
        );
        reports::write_report(&self.config.reports_dir, "distances.json", &report)
    }

    /// Kernel responses need a sampling rate, so an archive is only consulted when none is set.
    pub fn render_filters(&self, archive: Option<&StationArchive>) -> anyhow::Result<()> {
        let sampling_rate = match (self.config.sampling_rate, archive) {
            (Some(rate), _) => rate,
            (None, Some(archive)) => self.sampling_rate(archive)?,
            (None, None) => 1.0,
        };
        let bank = self.config.filter_bank()?;
        let report = figures::filter_responses(&bank, sampling_rate)?;
        reports::write_report(&self.config.reports_dir, "filter_responses.json", &report)
    }

    pub fn render_spectra(&self, archive: &StationArchive, station: usize) -> anyhow::Result<()> {
        let bank = self.config.filter_bank()?;
        let stage_config = self.stage_config(archive)?;
        let report = figures::station_spectra(archive, &bank, station, &stage_config)
            .context("spectra stage")?;
        reports::write_report(
            &self.config.reports_dir,
            &format!("spectra_x{:03}.json", station),
            &report,
        )
    }

    pub fn render_sections(&self, archive: &StationArchive) -> anyhow::Result<()> {
        let filtered = DirectoryStore::new(&self.config.convolved_dir);
        let sections =
            figures::distance_time_sections(archive, &filtered, self.config.section_decimation)
                .context("section stage")?;
        reports::write_report(&self.config.reports_dir, "sections.json", &sections)
    }
}

fn filter_station(
    row: Vec<f64>,
    station: usize,
    kernels: Vec<FilterKernel>,
    config: &StageConfig,
) -> ProcessingResult<Vec<(FilterBand, Vec<f64>)>> {
    let mut filtered = Vec::with_capacity(kernels.len());
    for kernel in kernels {
        let band = kernel.band;
        let mut stage = FilterStage::new(kernel);
        stage.initialize(config)?;
        let output = stage.execute(StageInput {
            samples: row.clone(),
            station: Some(station),
        })?;
        stage.cleanup();
        filtered.push((band, output.samples));
    }
    Ok(filtered)
}
