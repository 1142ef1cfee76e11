//! Boundary between the annotation driver and whoever marks the arrivals.

/// One labeled trace shown to the analyst, time-aligned with the request's time axis.
#[derive(Debug, Clone, Copy)]
pub struct Trace<'a> {
    pub label: &'a str,
    pub samples: &'a [f64],
}

/// Everything the analyst sees for one station.
#[derive(Debug, Clone, Copy)]
pub struct AnnotationRequest<'a> {
    pub station: usize,
    /// Meters from the source.
    pub distance: f64,
    /// Absolute sample times over the station's native length.
    pub times: &'a [f64],
    /// Raw trace first, then its filtered variants.
    pub traces: &'a [Trace<'a>],
}

/// The single point supplied by the analyst.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkedPoint {
    pub time: f64,
    pub amplitude: f64,
    /// Label of the trace that was active when the point was marked.
    pub trace: String,
}

/// Blocking, single-shot interaction: returns exactly one point, or `None` if the
/// analyst aborted.
pub trait AnnotationPort {
    fn request_annotation(&mut self, request: &AnnotationRequest<'_>) -> Option<MarkedPoint>;
}
