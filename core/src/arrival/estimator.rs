use crate::arrival::port::{AnnotationPort, AnnotationRequest};
use crate::math::stats::StatsHelper;
use crate::prelude::{ProcessingError, ProcessingResult};

/// Arrival time and validity for one station.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Annotation {
    pub arrival_time: f64,
    pub validity: f64,
}

/// Asks the port for one point and turns it into an annotation.
///
/// The arrival time is the point's time as given; a point at time 0 counts as no answer. Validity is scored against the trace
/// that was active when the point was marked, falling back to the raw (first) trace
/// for unknown labels.
pub fn mark_arrival<P: AnnotationPort + ?Sized>(
    port: &mut P,
    request: &AnnotationRequest<'_>,
) -> ProcessingResult<Annotation> {
    let raw = request.traces.first().ok_or_else(|| {
        ProcessingError::InvalidSignal(format!("station {}: no traces to annotate", request.station))
    })?;
    if request.times.is_empty() {
        return Err(ProcessingError::InvalidSignal(format!(
            "station {}: empty time axis",
            request.station
        )));
    }

    let point = port
        .request_annotation(request)
        .ok_or(ProcessingError::NoAnnotationProvided(request.station))?;
    // a zero time is the "not annotated" sentinel and cannot be stored as an arrival
    if !(point.time.is_finite() && point.amplitude.is_finite()) || point.time == 0.0 {
        return Err(ProcessingError::NoAnnotationProvided(request.station));
    }

    let active = request
        .traces
        .iter()
        .find(|trace| trace.label == point.trace)
        .unwrap_or(raw);

    Ok(Annotation {
        arrival_time: point.time,
        validity: validity_score(point.amplitude, active.samples),
    })
}

/// 1 for a point above the axis, otherwise `amplitude / max|samples|` clamped to [-1, 0].
pub fn validity_score(amplitude: f64, samples: &[f64]) -> f64 {
    if amplitude > 0.0 {
        return 1.0;
    }
    let peak = StatsHelper::peak_abs(samples);
    if peak == 0.0 {
        return 0.0;
    }
    (amplitude / peak).clamp(-1.0, 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arrival::port::{MarkedPoint, Trace};

    struct FixedPort {
        point: Option<MarkedPoint>,
        calls: usize,
    }

    impl AnnotationPort for FixedPort {
        fn request_annotation(&mut self, _request: &AnnotationRequest<'_>) -> Option<MarkedPoint> {
            self.calls += 1;
            self.point.clone()
        }
    }

    fn point(time: f64, amplitude: f64, trace: &str) -> MarkedPoint {
        MarkedPoint {
            time,
            amplitude,
            trace: trace.to_string(),
        }
    }

    const TIMES: [f64; 4] = [100.0, 100.5, 101.0, 101.5];
    const RAW: [f64; 4] = [0.5, -4.0, 2.0, 1.0];
    const LOW: [f64; 4] = [0.1, -0.5, 0.25, 0.2];

    fn with_request<R>(f: impl FnOnce(&AnnotationRequest<'_>) -> R) -> R {
        let traces = [
            Trace {
                label: "raw",
                samples: &RAW,
            },
            Trace {
                label: "lowpass",
                samples: &LOW,
            },
        ];
        let request = AnnotationRequest {
            station: 2,
            distance: 1.0e6,
            times: &TIMES,
            traces: &traces,
        };
        f(&request)
    }

    #[test]
    fn positive_amplitude_is_fully_valid() {
        for amplitude in [1e-12, 0.3, 250.0] {
            assert_eq!(validity_score(amplitude, &RAW), 1.0);
            assert_eq!(validity_score(amplitude, &[]), 1.0);
        }
    }

    #[test]
    fn most_negative_peak_scores_minus_one() {
        assert!((validity_score(-4.0, &RAW) + 1.0).abs() < 1e-12);
        assert!((validity_score(-1.0, &RAW) + 0.25).abs() < 1e-12);
        assert_eq!(validity_score(0.0, &RAW), 0.0);
        assert_eq!(validity_score(-9.0, &RAW), -1.0);
        assert_eq!(validity_score(-1.0, &[0.0, 0.0]), 0.0);
    }

    #[test]
    fn arrival_time_is_taken_unsnapped_and_scored_on_active_trace() {
        let mut port = FixedPort {
            point: Some(point(100.7321, -0.25, "lowpass")),
            calls: 0,
        };
        let annotation = with_request(|request| mark_arrival(&mut port, request)).unwrap();
        assert_eq!(port.calls, 1);
        assert_eq!(annotation.arrival_time, 100.7321);
        assert!((annotation.validity + 0.5).abs() < 1e-12);
    }

    #[test]
    fn unknown_trace_label_falls_back_to_raw() {
        let mut port = FixedPort {
            point: Some(point(101.0, -2.0, "bogus")),
            calls: 0,
        };
        let annotation = with_request(|request| mark_arrival(&mut port, request)).unwrap();
        assert!((annotation.validity + 0.5).abs() < 1e-12);
    }

    #[test]
    fn aborted_interaction_is_reported() {
        let mut port = FixedPort {
            point: None,
            calls: 0,
        };
        let result = with_request(|request| mark_arrival(&mut port, request));
        assert!(matches!(result, Err(ProcessingError::NoAnnotationProvided(2))));

        let mut port = FixedPort {
            point: Some(point(f64::NAN, 1.0, "raw")),
            calls: 0,
        };
        let result = with_request(|request| mark_arrival(&mut port, request));
        assert!(matches!(result, Err(ProcessingError::NoAnnotationProvided(2))));
    }

    #[test]
    fn zero_time_is_not_an_arrival() {
        let mut port = FixedPort {
            point: Some(point(0.0, -1.0, "raw")),
            calls: 0,
        };
        let result = with_request(|request| mark_arrival(&mut port, request));
        assert!(matches!(result, Err(ProcessingError::NoAnnotationProvided(2))));
        assert_eq!(port.calls, 1);
    }
}
