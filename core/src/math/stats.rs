pub struct StatsHelper;

impl StatsHelper {
    pub fn rms(samples: &[f64]) -> f64 {
        if samples.is_empty() {
            return 0.0;
        }
        let sum_sq: f64 = samples.iter().map(|&v| v * v).sum();
        (sum_sq / samples.len() as f64).sqrt()
    }

    /// Largest absolute amplitude, 0 for an empty slice.
    pub fn peak_abs(samples: &[f64]) -> f64 {
        samples.iter().fold(0.0, |acc: f64, &v| acc.max(v.abs()))
    }

    /// Index of the largest absolute amplitude.
    pub fn argmax_abs(samples: &[f64]) -> Option<usize> {
        samples
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| a.abs().total_cmp(&b.abs()))
            .map(|(idx, _)| idx)
    }

    pub fn all_finite(samples: &[f64]) -> bool {
        samples.iter().all(|v| v.is_finite())
    }
}
