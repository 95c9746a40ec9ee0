use crate::{
    error::{PulseError, Result},
    workout::{Column, WorkoutRecord},
};
use csv::{ReaderBuilder, StringRecord, Trim};
use log::debug;
use std::{fs::File, path::Path};

const TIME_COLUMNS: [&str; 3] = ["time_seconds", "time", "elapsed_time"];
const HEART_RATE_COLUMNS: [&str; 2] = ["heart_rate", "heartrate"];
const POWER_COLUMNS: [&str; 2] = ["power", "poweroriginal"];
const DISTANCE_COLUMNS: [&str; 1] = ["distance"];
const ALTITUDE_COLUMNS: [&str; 2] = ["altitude", "enhanced_altitude"];

/// Read a comma-separated workout export with a header row.
///
/// Recognised columns are matched case-insensitively; every channel is optional. Without a
/// time column, rows are assumed to be one second apart.
pub fn read_workout_csv(path: &Path) -> Result<WorkoutRecord> {
    let file = File::open(path).map_err(|e| PulseError::io(path, e))?;
    parse_workout(file)
}

pub fn parse_workout_csv(text: &str) -> Result<WorkoutRecord> {
    parse_workout(text.as_bytes())
}

fn parse_workout<R: std::io::Read>(input: R) -> Result<WorkoutRecord> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(input);
    let headers = reader.headers()?.clone();

    let time_idx = locate_column(&headers, &TIME_COLUMNS);
    let hr_idx = locate_column(&headers, &HEART_RATE_COLUMNS);
    let power_idx = locate_column(&headers, &POWER_COLUMNS);
    let distance_idx = locate_column(&headers, &DISTANCE_COLUMNS);
    let altitude_idx = locate_column(&headers, &ALTITUDE_COLUMNS);
    debug!(
        "workout columns: time={:?} hr={:?} power={:?} distance={:?} altitude={:?}",
        time_idx, hr_idx, power_idx, distance_idx, altitude_idx
    );

    let mut time_s = Vec::new();
    let mut heart_rate: Column = Vec::new();
    let mut power: Column = Vec::new();
    let mut distance: Column = Vec::new();
    let mut altitude: Column = Vec::new();

    for (row, record) in reader.records().enumerate() {
        let record = record?;
        let time = match time_idx {
            Some(idx) => cell(&record, Some(idx)).ok_or_else(|| PulseError::Parse {
                line: row + 2,
                message: "missing or non-numeric time value".into(),
            })?,
            None => row as f64,
        };
        time_s.push(time);
        heart_rate.push(cell(&record, hr_idx));
        power.push(cell(&record, power_idx));
        distance.push(cell(&record, distance_idx));
        altitude.push(cell(&record, altitude_idx));
    }

    // Rebase to seconds since the first record.
    if let Some(&start) = time_s.first() {
        for t in &mut time_s {
            *t -= start;
        }
    }

    Ok(WorkoutRecord {
        time_s,
        heart_rate: hr_idx.map(|_| heart_rate),
        power: power_idx.map(|_| power),
        distance: distance_idx.map(|_| distance),
        altitude: altitude_idx.map(|_| altitude),
    })
}

fn locate_column(headers: &StringRecord, names: &[&str]) -> Option<usize> {
    headers
        .iter()
        .position(|h| names.iter().any(|name| h.eq_ignore_ascii_case(name)))
}

fn cell(record: &StringRecord, idx: Option<usize>) -> Option<f64> {
    record
        .get(idx?)
        .and_then(|v| v.parse::<f64>().ok())
        .filter(|v| v.is_finite())
}
