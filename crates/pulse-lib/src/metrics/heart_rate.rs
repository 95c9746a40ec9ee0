use crate::{signal::RRSeries, stats};
use serde::{Deserialize, Serialize};

/// Beat-to-beat heart rate placed at the midpoint between its two bounding peaks.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InstantHeartRate {
    pub time_ms: f64,
    pub bpm: f64,
}

/// Heart-rate statistics for one analysed recording.
///
/// `average_pp_ms` equals `average_rr_ms`: P waves are not detected separately, so the PP
/// interval is approximated by the RR interval.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeartRateProfile {
    pub beat_count: usize,
    pub average_hr_bpm: u32,
    pub instantaneous: Vec<InstantHeartRate>,
    pub min_hr_bpm: f64,
    pub max_hr_bpm: f64,
    pub variability_ms: f64,
    pub average_rr_ms: f64,
    pub average_pp_ms: f64,
    pub rmssd_ms: f64,
    pub pnn50: f64,
}

/// RR-only QRS statistics with a message suitable for reports.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QrsSummary {
    pub beat_count: usize,
    pub rr_avg_ms: Option<f64>,
    pub rr_std_ms: Option<f64>,
    pub message: String,
}

pub fn heart_rate_profile(peak_times_ms: &[f64]) -> HeartRateProfile {
    let rr = RRSeries::from_peak_times_ms(peak_times_ms);
    let instantaneous = instantaneous_hr(peak_times_ms);
    let average_rr_ms = average_rr_interval_ms(&rr);
    HeartRateProfile {
        beat_count: peak_times_ms.len(),
        average_hr_bpm: average_hr(&rr),
        min_hr_bpm: min_hr(&instantaneous),
        max_hr_bpm: max_hr(&instantaneous),
        instantaneous,
        variability_ms: variability_ms(&rr),
        average_rr_ms,
        average_pp_ms: average_rr_ms,
        rmssd_ms: rmssd_ms(&rr),
        pnn50: pnn50(&rr),
    }
}

/// `60 / mean(RR)` rounded to whole bpm; 0 without at least one interval.
pub fn average_hr(rr: &RRSeries) -> u32 {
    match stats::mean(&rr.rr) {
        Some(avg) if avg > 0.0 => (60.0 / avg).round() as u32,
        _ => 0,
    }
}

pub fn instantaneous_hr(peak_times_ms: &[f64]) -> Vec<InstantHeartRate> {
    peak_times_ms
        .windows(2)
        .map(|w| InstantHeartRate {
            time_ms: 0.5 * (w[0] + w[1]),
            bpm: 60_000.0 / (w[1] - w[0]),
        })
        .collect()
}

pub fn min_hr(instantaneous: &[InstantHeartRate]) -> f64 {
    instantaneous
        .iter()
        .map(|h| h.bpm)
        .reduce(f64::min)
        .unwrap_or(0.0)
}

pub fn max_hr(instantaneous: &[InstantHeartRate]) -> f64 {
    instantaneous
        .iter()
        .map(|h| h.bpm)
        .reduce(f64::max)
        .unwrap_or(0.0)
}

/// Population standard deviation of RR in ms, two decimals. 0 with fewer than two intervals.
pub fn variability_ms(rr: &RRSeries) -> f64 {
    if rr.len() < 2 {
        return 0.0;
    }
    stats::population_std(&rr.to_millis())
        .map(|sd| stats::round_to(sd, 2))
        .unwrap_or(0.0)
}

pub fn average_rr_interval_ms(rr: &RRSeries) -> f64 {
    stats::mean(&rr.to_millis())
        .map(|m| stats::round_to(m, 2))
        .unwrap_or(0.0)
}

/// Alias of [`average_rr_interval_ms`]; no separate atrial detection is performed.
pub fn average_pp_interval_ms(rr: &RRSeries) -> f64 {
    average_rr_interval_ms(rr)
}

pub fn rmssd_ms(rr: &RRSeries) -> f64 {
    let n = rr.len();
    if n < 2 {
        return 0.0;
    }
    let sum: f64 = rr.rr.windows(2).map(|w| (w[1] - w[0]).powi(2)).sum();
    (sum / (n as f64 - 1.0)).sqrt() * 1000.0
}

/// Fraction of successive RR differences above 50 ms.
pub fn pnn50(rr: &RRSeries) -> f64 {
    let n = rr.len();
    if n < 2 {
        return 0.0;
    }
    let count = rr
        .rr
        .windows(2)
        .filter(|w| (w[1] - w[0]).abs() > 0.050)
        .count();
    count as f64 / (n as f64 - 1.0)
}

pub fn qrs_summary(peak_times_ms: &[f64]) -> QrsSummary {
    let rr = RRSeries::from_peak_times_ms(peak_times_ms);
    let millis = rr.to_millis();
    match (stats::mean(&millis), stats::population_std(&millis)) {
        (Some(avg), Some(sd)) => QrsSummary {
            beat_count: peak_times_ms.len(),
            rr_avg_ms: Some(stats::round_to(avg, 2)),
            rr_std_ms: Some(stats::round_to(sd, 2)),
            message: "basic QRS analysis (RR statistics only)".into(),
        },
        _ => QrsSummary {
            beat_count: peak_times_ms.len(),
            rr_avg_ms: None,
            rr_std_ms: None,
            message: "QRS analysis not possible: too few peaks detected".into(),
        },
    }
}
