//! Five heart-rate training zones at fixed fractions of maximum heart rate.

use super::WorkoutRecord;
use crate::stats;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Band edges as percent of max HR: Zone 1 starts at 50 %, Zone 5 ends at 100 %.
const ZONE_EDGES_PCT: [f64; 6] = [50.0, 60.0, 70.0, 80.0, 90.0, 100.0];

/// Sampling cadence assumed for time-in-zone when the source does not say otherwise.
pub const DEFAULT_CADENCE_HZ: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Zone {
    #[serde(rename = "Zone_1")]
    Zone1,
    #[serde(rename = "Zone_2")]
    Zone2,
    #[serde(rename = "Zone_3")]
    Zone3,
    #[serde(rename = "Zone_4")]
    Zone4,
    #[serde(rename = "Zone_5")]
    Zone5,
}

impl Zone {
    pub const ALL: [Zone; 5] = [Zone::Zone1, Zone::Zone2, Zone::Zone3, Zone::Zone4, Zone::Zone5];

    pub fn label(self) -> &'static str {
        match self {
            Zone::Zone1 => "Zone_1",
            Zone::Zone2 => "Zone_2",
            Zone::Zone3 => "Zone_3",
            Zone::Zone4 => "Zone_4",
            Zone::Zone5 => "Zone_5",
        }
    }
}

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Half-open band `[low_bpm, high_bpm)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZoneBand {
    pub zone: Zone,
    pub low_bpm: f64,
    pub high_bpm: f64,
}

impl ZoneBand {
    pub fn contains(&self, hr: f64) -> bool {
        self.low_bpm <= hr && hr < self.high_bpm
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneBounds {
    pub max_hr: f64,
    pub bands: [ZoneBand; 5],
}

impl ZoneBounds {
    pub fn band(&self, zone: Zone) -> &ZoneBand {
        &self.bands[zone as usize]
    }
}

pub fn zone_bounds(max_hr: f64) -> ZoneBounds {
    let bands = Zone::ALL.map(|zone| {
        let i = zone as usize;
        ZoneBand {
            zone,
            low_bpm: max_hr * ZONE_EDGES_PCT[i] / 100.0,
            high_bpm: max_hr * ZONE_EDGES_PCT[i + 1] / 100.0,
        }
    });
    ZoneBounds { max_hr, bands }
}

/// Zone whose band contains `hr`.
///
/// Readings at or above the Zone 5 floor always map to Zone 5, so max HR itself (and anything
/// above it) lands there even though the band is nominally open at the top.
///
/// Readings below the Zone 1 floor map to Zone 1. Out-of-band readings do not fall through to
/// Zone 5. [`aggregate`] relies on this mapping, so below-floor and above-max readings are
/// counted (and enter the VO2max regression) instead of being dropped.
pub fn assign_zone(hr: f64, bounds: &ZoneBounds) -> Zone {
    if let Some(band) = bounds.bands.iter().find(|band| band.contains(hr)) {
        return band.zone;
    }
    if hr < bounds.band(Zone::Zone1).low_bpm {
        Zone::Zone1
    } else {
        Zone::Zone5
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneAggregate {
    pub zone: Zone,
    pub low_bpm: f64,
    pub high_bpm: f64,
    pub sample_count: usize,
    pub minutes: f64,
    pub mean_hr: Option<f64>,
    /// `None` when the record has no power channel or no power in this zone.
    pub mean_power: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneAggregates {
    pub cadence_hz: f64,
    pub zones: Vec<ZoneAggregate>,
}

impl ZoneAggregates {
    pub fn get(&self, zone: Zone) -> Option<&ZoneAggregate> {
        self.zones.iter().find(|z| z.zone == zone)
    }

    pub fn total_minutes(&self) -> f64 {
        self.zones.iter().map(|z| z.minutes).sum()
    }
}

/// Per-zone sample count, time in zone and mean power. Time is `count / cadence_hz`, so callers
/// must pass the real cadence for sources not recorded at 1 Hz. Rows without a heart-rate value
/// are skipped.
pub fn aggregate(record: &WorkoutRecord, bounds: &ZoneBounds, cadence_hz: f64) -> ZoneAggregates {
    let mut hr_by_zone: [Vec<f64>; 5] = Default::default();
    let mut power_by_zone: [Vec<f64>; 5] = Default::default();

    if let Some(heart_rate) = &record.heart_rate {
        for (row, hr) in heart_rate.iter().enumerate() {
            let Some(hr) = *hr else { continue };
            let zone = assign_zone(hr, bounds) as usize;
            hr_by_zone[zone].push(hr);
            let power = record
                .power
                .as_ref()
                .and_then(|p| p.get(row).copied().flatten());
            if let Some(power) = power {
                power_by_zone[zone].push(power);
            }
        }
    }

    let cadence = if cadence_hz > 0.0 {
        cadence_hz
    } else {
        DEFAULT_CADENCE_HZ
    };
    let zones = Zone::ALL
        .iter()
        .map(|&zone| {
            let band = bounds.band(zone);
            let hrs = &hr_by_zone[zone as usize];
            ZoneAggregate {
                zone,
                low_bpm: band.low_bpm,
                high_bpm: band.high_bpm,
                sample_count: hrs.len(),
                minutes: hrs.len() as f64 / cadence / 60.0,
                mean_hr: stats::mean(hrs),
                mean_power: stats::mean(&power_by_zone[zone as usize]),
            }
        })
        .collect();
    ZoneAggregates {
        cadence_hz: cadence,
        zones,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workout::record_at_1hz;

    #[test]
    fn bounds_at_fixed_fractions() {
        let bounds = zone_bounds(180.0);
        let z3 = bounds.band(Zone::Zone3);
        assert_eq!((z3.low_bpm, z3.high_bpm), (126.0, 144.0));
        assert_eq!(bounds.band(Zone::Zone1).low_bpm, 90.0);
        assert_eq!(bounds.band(Zone::Zone5).high_bpm, 180.0);
        for pair in bounds.bands.windows(2) {
            assert_eq!(pair[0].high_bpm, pair[1].low_bpm);
        }
    }

    #[test]
    fn assigns_band_edges() {
        let bounds = zone_bounds(180.0);
        assert_eq!(assign_zone(143.9, &bounds), Zone::Zone3);
        assert_eq!(assign_zone(144.0, &bounds), Zone::Zone4);
        assert_eq!(assign_zone(180.0, &bounds), Zone::Zone5);
        assert_eq!(assign_zone(195.0, &bounds), Zone::Zone5);
        assert_eq!(assign_zone(60.0, &bounds), Zone::Zone1);
    }

    #[test]
    fn max_hr_always_lands_in_zone_5() {
        for max_hr in [150.0, 171.0, 183.3, 199.0, 220.0] {
            let bounds = zone_bounds(max_hr);
            assert_eq!(assign_zone(max_hr, &bounds), Zone::Zone5);
            let mut hr = 0.0;
            while hr <= max_hr {
                // Total: never panics and always yields one of the five zones.
                let zone = assign_zone(hr, &bounds);
                assert!(Zone::ALL.contains(&zone));
                hr += 0.7;
            }
        }
    }

    #[test]
    fn labels_serialize_with_underscore() {
        assert_eq!(serde_json::to_string(&Zone::Zone2).unwrap(), "\"Zone_2\"");
        assert_eq!(Zone::Zone4.to_string(), "Zone_4");
    }

    #[test]
    fn aggregates_time_and_power_per_zone() {
        let mut hr = vec![100.0; 120];
        hr.extend(vec![150.0; 60]);
        let mut power = vec![120.0; 120];
        power.extend(vec![240.0; 60]);
        let record = record_at_1hz(&hr, Some(power.as_slice()));
        let agg = aggregate(&record, &zone_bounds(180.0), DEFAULT_CADENCE_HZ);

        let z1 = agg.get(Zone::Zone1).unwrap();
        assert_eq!(z1.sample_count, 120);
        assert!((z1.minutes - 2.0).abs() < 1e-12);
        assert_eq!(z1.mean_power, Some(120.0));
        let z4 = agg.get(Zone::Zone4).unwrap();
        assert_eq!(z4.sample_count, 60);
        assert_eq!(z4.mean_hr, Some(150.0));
        assert_eq!(z4.mean_power, Some(240.0));
        assert_eq!(agg.get(Zone::Zone2).unwrap().sample_count, 0);
        assert!((agg.total_minutes() - 3.0).abs() < 1e-12);
    }

    #[test]
    fn aggregates_respect_cadence_and_missing_power() {
        let record = record_at_1hz(&[100.0; 240], None);
        let agg = aggregate(&record, &zone_bounds(180.0), 4.0);
        let z1 = agg.get(Zone::Zone1).unwrap();
        assert!((z1.minutes - 1.0).abs() < 1e-12);
        assert!(z1.mean_power.is_none());
    }

    #[test]
    fn out_of_band_readings_are_counted_in_edge_zones() {
        // max 180: Zone 1 starts at 90, Zone 5 ends at 180
        let record = record_at_1hz(&[60.0, 85.0, 185.0], Some(&[50.0, 60.0, 400.0][..]));
        let agg = aggregate(&record, &zone_bounds(180.0), DEFAULT_CADENCE_HZ);
        let z1 = agg.get(Zone::Zone1).unwrap();
        assert_eq!(z1.sample_count, 2);
        assert_eq!(z1.mean_power, Some(55.0));
        let z5 = agg.get(Zone::Zone5).unwrap();
        assert_eq!(z5.sample_count, 1);
        assert_eq!(z5.mean_hr, Some(185.0));
    }
}
