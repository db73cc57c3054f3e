//! Score Summary Module
//! Descriptive statistics over a score column, ignoring missing values.

use serde::Serialize;

/// Statistics for the valid (non-NaN) values of a score column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreSummary {
    pub count: usize,
    pub missing: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub median: f64,
}

impl Default for ScoreSummary {
    fn default() -> Self {
        Self {
            count: 0,
            missing: 0,
            min: f64::NAN,
            max: f64::NAN,
            mean: f64::NAN,
            median: f64::NAN,
        }
    }
}

impl ScoreSummary {
    /// Compute descriptive statistics, skipping NaN entries.
    pub fn from_values(values: &[f64]) -> Self {
        let mut sorted: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
        let missing = values.len() - sorted.len();
        let n = sorted.len();
        if n == 0 {
            return Self {
                missing,
                ..Self::default()
            };
        }

        sorted.sort_by(|a, b| a.total_cmp(b));

        let mean = sorted.iter().sum::<f64>() / n as f64;
        let median = if n % 2 == 0 {
            (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
        } else {
            sorted[n / 2]
        };

        Self {
            count: n,
            missing,
            min: sorted[0],
            max: sorted[n - 1],
            mean,
            median,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

/// Min and max of the non-NaN values, `None` when there are none.
pub fn value_range(values: &[f64]) -> Option<(f64, f64)> {
    values
        .iter()
        .copied()
        .filter(|v| !v.is_nan())
        .fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
}
