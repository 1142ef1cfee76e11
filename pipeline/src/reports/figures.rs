use anyhow::Context;
use infracore::ingest::normalize::StationArchive;
use infracore::math::geo::GeoPoint;
use infracore::math::stats::StatsHelper;
use infracore::prelude::{ProcessingStage, StageConfig, StageInput};
use infracore::processing::bank::{FilterBand, FilterBank};
use infracore::processing::filter::FilterStage;
use infracore::processing::spectrum::{dtft, Spectrum, SpectrumStage};
use infracore::store::convolved::ConvolvedStore;
use serde::Serialize;

/// Frequency points used to draw kernel responses.
pub const RESPONSE_POINTS: usize = 512;

#[derive(Debug, Serialize)]
pub struct StationPin {
    pub index: usize,
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Serialize)]
pub struct MapReport {
    pub reference: GeoPoint,
    pub stations: Vec<StationPin>,
}

pub fn station_map(archive: &StationArchive, reference: GeoPoint) -> MapReport {
    let stations = (0..archive.station_count())
        .map(|index| StationPin {
            index,
            latitude: archive.lats[index],
            longitude: archive.lons[index],
        })
        .collect();
    MapReport {
        reference,
        stations,
    }
}

#[derive(Debug, Serialize)]
pub struct DistanceReport {
    /// Station indices ordered by distance.
    pub order: Vec<usize>,
    pub distances_km: Vec<f64>,
    pub closest_km: f64,
    pub farthest_km: f64,
}

pub fn distance_summary(archive: &StationArchive) -> anyhow::Result<DistanceReport> {
    anyhow::ensure!(
        archive.station_count() > 0,
        "archive holds no station distances"
    );
    let mut order: Vec<usize> = (0..archive.station_count()).collect();
    order.sort_by(|&a, &b| archive.distances[a].total_cmp(&archive.distances[b]));
    let distances_km: Vec<f64> = order
        .iter()
        .map(|&idx| archive.distances[idx] / 1000.0)
        .collect();
    Ok(DistanceReport {
        closest_km: distances_km[0],
        farthest_km: distances_km[distances_km.len() - 1],
        order,
        distances_km,
    })
}

#[derive(Debug, Serialize)]
pub struct KernelResponse {
    pub band: FilterBand,
    pub coefficients: Vec<f64>,
    pub response: Spectrum,
}

pub fn filter_responses(bank: &FilterBank, sampling_rate: f64) -> anyhow::Result<Vec<KernelResponse>> {
    bank.kernels()
        .iter()
        .map(|kernel| {
            let response = dtft(&kernel.coefficients, Some(RESPONSE_POINTS), sampling_rate)
                .with_context(|| format!("{} response", kernel.band.label()))?;
            Ok(KernelResponse {
                band: kernel.band,
                coefficients: kernel.coefficients.clone(),
                response,
            })
        })
        .collect()
}

#[derive(Debug, Serialize)]
pub struct TraceSpectrum {
    pub label: String,
    pub peak_frequency: Option<f64>,
    pub frequencies: Vec<f64>,
    pub magnitude: Vec<f64>,
}

#[derive(Debug, Serialize)]
pub struct SpectraReport {
    pub station: usize,
    pub sampling_rate: f64,
    pub traces: Vec<TraceSpectrum>,
}

/// Spectra of one station's native trace and of each filtered variant.
pub fn station_spectra(
    archive: &StationArchive,
    bank: &FilterBank,
    station: usize,
    stage_config: &StageConfig,
) -> anyhow::Result<SpectraReport> {
    let view = archive
        .station(station)
        .with_context(|| format!("station {} not in archive", station))?;
    let raw = view.samples.to_vec();

    let mut labeled = vec![("raw".to_string(), raw.clone())];
    for kernel in bank.kernels() {
        let mut filter = FilterStage::new(kernel.clone());
        filter.initialize(stage_config)?;
        let output = filter.execute(StageInput {
            samples: raw.clone(),
            station: Some(station),
        })?;
        filter.cleanup();
        labeled.push((kernel.band.label().to_string(), output.samples));
    }

    let mut spectrum = SpectrumStage::new();
    spectrum.initialize(stage_config)?;
    let mut traces = Vec::with_capacity(labeled.len());
    for (label, samples) in labeled {
        let output = spectrum
            .execute(StageInput {
                samples,
                station: Some(station),
            })
            .with_context(|| format!("{} spectrum of station {}", label, station))?;
        traces.push(TraceSpectrum {
            label,
            peak_frequency: output.metadata.peak_frequency,
            frequencies: output.metadata.frequencies.unwrap_or_default(),
            magnitude: output.samples,
        });
    }
    spectrum.cleanup();

    Ok(SpectraReport {
        station,
        sampling_rate: stage_config.sampling_rate,
        traces,
    })
}

#[derive(Debug, Serialize)]
pub struct SectionTrace {
    pub station: usize,
    pub distance_km: f64,
    pub source: String,
    /// Seconds relative to the earliest sample in the archive.
    pub times: Vec<f64>,
    /// Samples normalized to unit peak.
    pub samples: Vec<f64>,
}

/// Distance-time section: one decimated, peak-normalized trace per station, nearest first.
///
/// The bandpass variant is used where it has been computed, the raw trace otherwise.
pub fn distance_time_sections(
    archive: &StationArchive,
    filtered: &dyn ConvolvedStore,
    decimation: usize,
) -> anyhow::Result<Vec<SectionTrace>> {
    let step = decimation.max(1);
    let epoch = (0..archive.station_count())
        .filter_map(|idx| archive.station(idx))
        .filter_map(|view| view.times.first().copied())
        .fold(f64::INFINITY, f64::min);

    let mut order: Vec<usize> = (0..archive.station_count()).collect();
    order.sort_by(|&a, &b| archive.distances[a].total_cmp(&archive.distances[b]));

    let mut sections = Vec::with_capacity(order.len());
    for station in order {
        let Some(view) = archive.station(station) else {
            continue;
        };
        let native = view.times.len();
        if native == 0 {
            continue;
        }
        // full-mode traces carry (K - 1) / 2 extra leading samples
        let (source, samples) = match filtered.get(FilterBand::Bandpass, station)? {
            Some(signal) if signal.len() >= archive.max_len() => {
                let offset = (signal.len() - archive.max_len()) / 2;
                ("bandpass", signal[offset..offset + native].to_vec())
            }
            _ => ("raw", view.samples.to_vec()),
        };
        let peak = StatsHelper::peak_abs(&samples);
        let norm = if peak > 0.0 { peak } else { 1.0 };

        sections.push(SectionTrace {
            station,
            distance_km: view.distance / 1000.0,
            source: source.to_string(),
            times: view.times.iter().step_by(step).map(|t| t - epoch).collect(),
            samples: samples.iter().step_by(step).map(|v| v / norm).collect(),
        });
    }
    Ok(sections)
}
