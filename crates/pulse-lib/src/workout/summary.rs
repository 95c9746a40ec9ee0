use super::{max_of, WorkoutRecord};
use crate::stats;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sport {
    Cycling,
    Running,
    Swimming,
    Other,
}

/// Sport-specific overview of a workout export. Fields whose source channel is missing stay
/// `None`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkoutSummary {
    pub sport: Sport,
    pub duration_hours: f64,
    pub duration_label: String,
    pub avg_power_w: Option<f64>,
    pub distance_km: Option<f64>,
    pub distance_m: Option<f64>,
    pub avg_speed_kmh: Option<f64>,
    pub pace_min_per_km: Option<f64>,
    pub pace_label: Option<String>,
    pub pace_min_per_100m: Option<f64>,
    pub avg_hr: Option<f64>,
    pub max_hr: Option<f64>,
    pub elevation_gain_m: Option<f64>,
}

pub fn workout_summary(record: &WorkoutRecord, sport: Sport) -> WorkoutSummary {
    let duration_hours = record.duration_s() / 3600.0;
    // Cumulative distance, so the furthest reading is the total.
    let distance_m = max_of(&record.distance_values()).filter(|d| *d > 0.0);
    let hr = record.heart_rate_values();

    let mut summary = WorkoutSummary {
        sport,
        duration_hours,
        duration_label: format_duration(duration_hours),
        avg_power_w: None,
        distance_km: None,
        distance_m: None,
        avg_speed_kmh: None,
        pace_min_per_km: None,
        pace_label: None,
        pace_min_per_100m: None,
        avg_hr: stats::mean(&hr),
        max_hr: max_of(&hr),
        elevation_gain_m: elevation_gain(record),
    };
    let has_time = duration_hours > 0.0;

    match sport {
        Sport::Cycling => {
            summary.avg_power_w = stats::mean(&record.power_values());
            summary.distance_km = distance_m.map(|d| d / 1000.0);
            if has_time {
                summary.avg_speed_kmh = summary.distance_km.map(|km| km / duration_hours);
            }
        }
        Sport::Running => {
            summary.distance_km = distance_m.map(|d| d / 1000.0);
            if has_time {
                summary.avg_speed_kmh = summary.distance_km.map(|km| km / duration_hours);
                summary.pace_min_per_km = summary.distance_km.map(|km| duration_hours * 60.0 / km);
                summary.pace_label = summary.pace_min_per_km.map(format_pace);
            }
        }
        Sport::Swimming => {
            summary.distance_m = distance_m;
            if has_time {
                summary.pace_min_per_100m = distance_m.map(|m| duration_hours * 60.0 / (m / 100.0));
            }
        }
        Sport::Other => {
            summary.distance_m = distance_m;
        }
    }
    summary
}

/// Total climb: sum of positive steps between consecutive altitude readings.
pub fn elevation_gain(record: &WorkoutRecord) -> Option<f64> {
    let altitude = record.altitude.as_ref()?;
    if altitude.iter().all(Option::is_none) {
        return None;
    }
    let gain = altitude
        .windows(2)
        .filter_map(|w| match (w[0], w[1]) {
            (Some(a), Some(b)) => Some((b - a).max(0.0)),
            _ => None,
        })
        .sum();
    Some(gain)
}

/// `"1h 5min"`, or `"42min"` under an hour.
pub fn format_duration(hours: f64) -> String {
    let total_minutes = (hours * 60.0).max(0.0) as u64;
    let h = total_minutes / 60;
    let m = total_minutes % 60;
    if h > 0 {
        format!("{h}h {m}min")
    } else {
        format!("{m}min")
    }
}

/// Minutes per kilometre as `m:ss`.
pub fn format_pace(min_per_km: f64) -> String {
    let minutes = min_per_km.trunc();
    let seconds = ((min_per_km - minutes) * 60.0) as u64;
    format!("{}:{:02}", minutes as u64, seconds)
}
