//! Whole-session performance estimates: calories and VO2max.

use super::{
    max_of, min_of,
    zones::{aggregate, zone_bounds, ZoneAggregates, DEFAULT_CADENCE_HZ},
    WorkoutRecord,
};
use crate::{
    detectors::peaks::MaxHeartRate,
    error::{PulseError, Result},
    stats,
};
use log::warn;
use serde::{Deserialize, Serialize};

/// Body data of the person who performed the workout.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubjectProfile {
    pub weight_kg: f64,
    pub age: f64,
    pub resting_hr: f64,
    /// Overrides the max HR observed in the record for zone analysis.
    pub max_hr: Option<f64>,
}

impl Default for SubjectProfile {
    fn default() -> Self {
        Self {
            weight_kg: 70.0,
            age: 30.0,
            resting_hr: 60.0,
            max_hr: None,
        }
    }
}

impl SubjectProfile {
    /// Reject body data that would make the estimates meaningless: a non-positive or
    /// non-finite `max_hr` or `weight_kg`.
    pub fn validate(&self) -> Result<()> {
        if let Some(max_hr) = self.max_hr {
            MaxHeartRate::new(max_hr)?;
        }
        if !(self.weight_kg.is_finite() && self.weight_kg > 0.0) {
            return Err(PulseError::Config(format!(
                "weight_kg must be a positive number, got {}",
                self.weight_kg
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceSummary {
    pub avg_hr: Option<f64>,
    pub max_hr: Option<f64>,
    pub min_hr: Option<f64>,
    pub avg_power: Option<f64>,
    pub max_power: Option<f64>,
    pub total_time_min: f64,
    pub calories_kcal: Option<f64>,
    pub vo2max_est: Option<f64>,
    pub zones: Option<ZoneAggregates>,
}

/// Energy expenditure in kcal from average heart rate (Keytel et al. regression).
///
/// `_resting_hr` is accepted for interface compatibility and does not enter the formula.
pub fn estimate_calories(
    avg_hr: f64,
    weight_kg: f64,
    age: f64,
    duration_min: f64,
    _resting_hr: f64,
) -> f64 {
    (avg_hr * 0.6309 + weight_kg * 0.1988 + age * 0.2017 - 55.0969) * duration_min / 4.184
}

/// Fit mean power against mean heart rate over the populated zones, extrapolate to `max_hr`,
/// and convert the peak power with the ACSM cycling equation. `None` with fewer than two zones
/// carrying both heart rate and power, or when the fit is degenerate.
pub fn estimate_vo2max(zones: &ZoneAggregates, weight_kg: f64, max_hr: f64) -> Option<f64> {
    let points: Vec<(f64, f64)> = zones
        .zones
        .iter()
        .filter(|z| z.sample_count > 0)
        .filter_map(|z| Some((z.mean_hr?, z.mean_power?)))
        .collect();
    if points.len() < 2 {
        warn!(
            "VO2max needs at least two zones with data, found {}",
            points.len()
        );
        return None;
    }
    if weight_kg <= 0.0 {
        return None;
    }
    let (slope, intercept) = stats::linear_fit(&points)?;
    let peak_power = slope * max_hr + intercept;
    Some(peak_power * 10.8 / weight_kg + 7.0)
}

/// Heart-rate/power statistics plus calorie and VO2max estimates for a workout sampled at
/// `cadence_hz`. Channels missing from the record leave their fields empty.
pub fn performance_analysis(
    record: &WorkoutRecord,
    subject: &SubjectProfile,
    cadence_hz: f64,
) -> PerformanceSummary {
    let hr = record.heart_rate_values();
    let power = record.power_values();
    let cadence = if cadence_hz > 0.0 {
        cadence_hz
    } else {
        DEFAULT_CADENCE_HZ
    };
    let total_time_min = record.len() as f64 / cadence / 60.0;

    let avg_hr = stats::mean(&hr);
    let max_hr = max_of(&hr);
    let calories_kcal = avg_hr.map(|avg| {
        estimate_calories(
            avg,
            subject.weight_kg,
            subject.age,
            total_time_min,
            subject.resting_hr,
        )
    });

    let zone_max = subject.max_hr.or(max_hr);
    let zones = zone_max.map(|m| aggregate(record, &zone_bounds(m), cadence));
    let vo2max_est = match (&zones, zone_max) {
        (Some(zones), Some(m)) => estimate_vo2max(zones, subject.weight_kg, m),
        _ => None,
    };

    PerformanceSummary {
        avg_hr,
        max_hr,
        min_hr: min_of(&hr),
        avg_power: stats::mean(&power),
        max_power: max_of(&power),
        total_time_min,
        calories_kcal,
        vo2max_est,
        zones,
    }
}
