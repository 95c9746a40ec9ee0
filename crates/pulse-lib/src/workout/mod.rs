//! Workout (power meter / heart-rate strap) analysis over a tabular time series.

pub mod performance;
pub mod summary;
pub mod zones;

use serde::{Deserialize, Serialize};

/// One column of a workout export. Missing or unparsable cells are `None`.
pub type Column = Vec<Option<f64>>;

/// Tabular workout record. Every channel except the time axis is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkoutRecord {
    /// Seconds since the first record.
    pub time_s: Vec<f64>,
    pub heart_rate: Option<Column>,
    pub power: Option<Column>,
    /// Cumulative distance in metres.
    pub distance: Option<Column>,
    /// Altitude in metres.
    pub altitude: Option<Column>,
}

impl WorkoutRecord {
    pub fn len(&self) -> usize {
        self.time_s.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time_s.is_empty()
    }

    /// Elapsed time between the first and last record.
    pub fn duration_s(&self) -> f64 {
        match (self.time_s.first(), self.time_s.last()) {
            (Some(first), Some(last)) => last - first,
            _ => 0.0,
        }
    }

    pub fn heart_rate_values(&self) -> Vec<f64> {
        present(self.heart_rate.as_ref())
    }

    pub fn power_values(&self) -> Vec<f64> {
        present(self.power.as_ref())
    }

    pub fn distance_values(&self) -> Vec<f64> {
        present(self.distance.as_ref())
    }

    pub fn altitude_values(&self) -> Vec<f64> {
        present(self.altitude.as_ref())
    }
}

fn present(column: Option<&Column>) -> Vec<f64> {
    column
        .map(|c| c.iter().flatten().copied().collect())
        .unwrap_or_default()
}

pub(crate) fn max_of(values: &[f64]) -> Option<f64> {
    values.iter().copied().reduce(f64::max)
}

pub(crate) fn min_of(values: &[f64]) -> Option<f64> {
    values.iter().copied().reduce(f64::min)
}

#[cfg(test)]
pub(crate) fn record_at_1hz(heart_rate: &[f64], power: Option<&[f64]>) -> WorkoutRecord {
    WorkoutRecord {
        time_s: (0..heart_rate.len()).map(|i| i as f64).collect(),
        heart_rate: Some(heart_rate.iter().map(|&v| Some(v)).collect()),
        power: power.map(|p| p.iter().map(|&v| Some(v)).collect()),
        distance: None,
        altitude: None,
    }
}
