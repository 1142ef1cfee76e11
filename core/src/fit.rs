//! Confidence-weighted fit of arrival time against distance from the source.

use crate::math::matrix::MatrixHelper;
use crate::prelude::{ProcessingError, ProcessingResult};
use crate::telemetry::log::LogManager;
use ndarray::{Array1, Array2};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VelocityEstimate {
    /// Polynomial coefficients of `arrival_time(distance)`, highest degree first.
    pub coefficients: Vec<f64>,
    pub stations_used: usize,
    /// Apparent propagation velocity in m/s, the reciprocal of the linear term.
    pub velocity: f64,
    /// Fitted arrival time at zero distance.
    pub origin_time: f64,
}

impl VelocityEstimate {
    /// Evaluates the fitted polynomial at `distance`.
    pub fn predict(&self, distance: f64) -> f64 {
        self.coefficients
            .iter()
            .fold(0.0, |acc, &coefficient| acc * distance + coefficient)
    }
}

/// Weighted least-squares polynomial fit of arrival time vs. distance.
///
/// Each residual is multiplied by the station's validity. Stations without an arrival
/// (time 0) or with zero validity do not take part.
pub fn fit_velocity(
    distances: &[f64],
    arrivals: &[f64],
    validity: &[f64],
    degree: usize,
) -> ProcessingResult<VelocityEstimate> {
    if distances.len() != arrivals.len() || arrivals.len() != validity.len() {
        return Err(ProcessingError::InvalidSignal(format!(
            "length mismatch: {} distances, {} arrivals, {} validity scores",
            distances.len(),
            arrivals.len(),
            validity.len()
        )));
    }
    if degree == 0 {
        return Err(ProcessingError::InvalidConfig(
            "velocity fit needs a linear term".into(),
        ));
    }

    let used: Vec<usize> = (0..arrivals.len())
        .filter(|&i| arrivals[i] != 0.0 && validity[i] != 0.0)
        .filter(|&i| distances[i].is_finite() && arrivals[i].is_finite() && validity[i].is_finite())
        .collect();
    if used.len() < degree + 1 {
        return Err(ProcessingError::InvalidSignal(format!(
            "{} annotated stations cannot constrain a degree {} fit",
            used.len(),
            degree
        )));
    }

    // Distances are scaled to [-1, 1] and times shifted to the earliest arrival to keep
    // the normal equations well conditioned.
    let scale = used
        .iter()
        .fold(0.0_f64, |acc, &i| acc.max(distances[i].abs()));
    let scale = if scale > 0.0 { scale } else { 1.0 };
    let time_ref = used
        .iter()
        .fold(f64::INFINITY, |acc, &i| acc.min(arrivals[i]));

    let columns = degree + 1;
    let mut design = Array2::<f64>::zeros((used.len(), columns));
    let mut target = Array1::<f64>::zeros(used.len());
    for (row, &i) in used.iter().enumerate() {
        let u = distances[i] / scale;
        let weight = validity[i];
        for col in 0..columns {
            design[[row, col]] = weight * u.powi((degree - col) as i32);
        }
        target[row] = weight * (arrivals[i] - time_ref);
    }

    let normal = MatrixHelper::multiply(design.t(), design.view());
    let rhs = design.t().dot(&target);
    let scaled = MatrixHelper::solve(&normal, &rhs).ok_or_else(|| {
        ProcessingError::InvalidSignal("distances do not constrain the fit".into())
    })?;

    let mut coefficients: Vec<f64> = scaled
        .iter()
        .enumerate()
        .map(|(col, &c)| c / scale.powi((degree - col) as i32))
        .collect();
    coefficients[degree] += time_ref;

    let slope = coefficients[degree - 1];
    let velocity = if slope != 0.0 { 1.0 / slope } else { f64::INFINITY };
    let estimate = VelocityEstimate {
        origin_time: coefficients[degree],
        coefficients,
        stations_used: used.len(),
        velocity,
    };

    LogManager::for_component("fit").record(&format!(
        "{} stations -> apparent velocity {:.2} m/s",
        estimate.stations_used, estimate.velocity
    ));
    Ok(estimate)
}
