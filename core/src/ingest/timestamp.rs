use crate::prelude::{ProcessingError, ProcessingResult};
use chrono::NaiveDateTime;

/// Fixed-point ISO-8601 layout of recording start times.
pub const START_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.fZ";

/// Parses a UTC start time into seconds since the Unix epoch.
pub fn parse_start_time(value: &str) -> ProcessingResult<f64> {
    let naive = NaiveDateTime::parse_from_str(value, START_TIME_FORMAT).map_err(|err| {
        ProcessingError::MalformedTimestamp {
            value: value.to_string(),
            reason: err.to_string(),
        }
    })?;
    let utc = naive.and_utc();
    Ok(utc.timestamp() as f64 + f64::from(utc.timestamp_subsec_nanos()) * 1e-9)
}
