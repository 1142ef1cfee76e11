use anyhow::{ensure, Context};
use infracore::ingest::record::{RawRecording, RawWaveform};
use infracore::math::geo::{GeoPoint, MEAN_EARTH_RADIUS_M};
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::f64::consts::PI;

/// Configuration for generating a synthetic station network.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub stations: usize,
    /// Longest native recording; shorter ones are drawn down to half of it.
    pub samples: usize,
    pub delta: f64,
    /// Recording start, which is also the synthetic origin time.
    pub starttime: String,
    /// Propagation speed of the synthetic pressure wave in m/s.
    pub speed: f64,
    pub min_distance_km: f64,
    pub max_distance_km: f64,
    /// Width of the pressure pulse in seconds.
    pub pulse_width: f64,
    pub noise: f64,
    pub seed: u64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            stations: 12,
            samples: 40_000,
            delta: 0.5,
            starttime: "2022-01-15T04:14:45.000000Z".to_string(),
            speed: 315.0,
            min_distance_km: 300.0,
            max_distance_km: 2_500.0,
            pulse_width: 120.0,
            noise: 0.05,
            seed: 0,
        }
    }
}

/// One synthetic station together with the arrival it was built around.
#[derive(Debug, Clone)]
pub struct SyntheticStation {
    pub recording: RawRecording,
    pub distance_m: f64,
    /// Seconds after the recording start at which the pulse begins.
    pub arrival_offset: f64,
}

fn destination(origin: &GeoPoint, bearing_deg: f64, distance_m: f64) -> GeoPoint {
    let angular = distance_m / MEAN_EARTH_RADIUS_M;
    let bearing = bearing_deg.to_radians();
    let lat1 = origin.latitude.to_radians();
    let lon1 = origin.longitude.to_radians();

    let lat2 = (lat1.sin() * angular.cos() + lat1.cos() * angular.sin() * bearing.cos()).asin();
    let lon2 = lon1
        + (bearing.sin() * angular.sin() * lat1.cos())
            .atan2(angular.cos() - lat1.sin() * lat2.sin());
    let lon2 = (lon2.to_degrees() + 540.0) % 360.0 - 180.0;
    GeoPoint::new(lat2.to_degrees(), lon2)
}

fn build_samples(
    config: &GeneratorConfig,
    len: usize,
    arrival_offset: f64,
    amplitude: f64,
    rng: &mut StdRng,
) -> Vec<f64> {
    let width = config.pulse_width.max(config.delta);
    (0..len)
        .map(|k| {
            let t = k as f64 * config.delta;
            // Ricker pulse whose leading edge sits at the arrival
            let tau = (t - arrival_offset - 2.0 * width) / width;
            let pulse = amplitude * (1.0 - tau * tau) * (-0.5 * tau * tau).exp();
            let microbarom = 0.1 * (2.0 * PI * 0.2 * t).sin();
            let jitter = if config.noise > 0.0 {
                rng.gen_range(-config.noise..config.noise)
            } else {
                0.0
            };
            pulse + microbarom + jitter
        })
        .collect()
}

pub fn build_network(
    config: &GeneratorConfig,
    reference: &GeoPoint,
) -> anyhow::Result<Vec<SyntheticStation>> {
    ensure!(config.stations > 0, "synthetic network needs at least one station");
    ensure!(config.samples > 1, "synthetic recordings need at least two samples");
    ensure!(config.delta > 0.0, "synthetic delta must be positive");
    ensure!(config.speed > 0.0, "synthetic speed must be positive");
    ensure!(
        config.min_distance_km > 0.0 && config.min_distance_km <= config.max_distance_km,
        "synthetic distance range is empty"
    );

    let span = config.samples as f64 * config.delta;
    let latest_arrival = config.max_distance_km * 1000.0 / config.speed;
    ensure!(
        latest_arrival + 4.0 * config.pulse_width < span / 2.0,
        "recordings of {:.0} s cannot hold a pulse arriving after {:.0} s",
        span / 2.0,
        latest_arrival
    );

    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut stations = Vec::with_capacity(config.stations);
    for index in 0..config.stations {
        let distance_km = rng.gen_range(config.min_distance_km..=config.max_distance_km);
        let bearing = rng.gen_range(0.0..360.0);
        let location = destination(reference, bearing, distance_km * 1000.0);
        let distance_m = reference.haversine_m(&location);

        let len = rng.gen_range(config.samples / 2..=config.samples);
        let arrival_offset = distance_m / config.speed;
        let amplitude = 2.0 * (1.0e6 / distance_m).sqrt();
        let samples = build_samples(config, len, arrival_offset, amplitude, &mut rng);

        let mut waveforms = BTreeMap::new();
        waveforms.insert(
            format!("SY.S{:03}..BDF", index),
            RawWaveform {
                starttime: Some(config.starttime.clone()),
                delta: Some(config.delta),
                samples,
            },
        );
        stations.push(SyntheticStation {
            recording: RawRecording {
                latitude: Some(location.latitude),
                longitude: Some(location.longitude),
                waveforms,
            },
            distance_m,
            arrival_offset,
        });
    }

    Ok(stations)
}

/// Serializes one synthetic recording the way the raw archive export lays it out.
pub fn recording_json(station: &SyntheticStation) -> anyhow::Result<String> {
    serde_json::to_string(&station.recording).context("serializing synthetic recording")
}
