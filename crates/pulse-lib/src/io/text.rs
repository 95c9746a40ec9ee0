use crate::error::{PulseError, Result};
use std::path::Path;

/// Parse newline-delimited floating point series, ignoring blank/comment lines.
pub fn parse_f64_series(text: &str) -> Result<Vec<f64>> {
    Ok(numbered_values(text)?.into_iter().map(|(_, v)| v).collect())
}

/// Values paired with their 1-based line numbers.
fn numbered_values(text: &str) -> Result<Vec<(usize, f64)>> {
    let mut out = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let val: f64 = trimmed.parse().map_err(|_| PulseError::Parse {
            line: idx + 1,
            message: format!("not a number: {trimmed}"),
        })?;
        out.push((idx + 1, val));
    }
    Ok(out)
}

/// Read a newline-delimited floating point series from disk.
pub fn read_f64_series(path: &Path) -> Result<Vec<f64>> {
    let text = std::fs::read_to_string(path).map_err(|e| PulseError::io(path, e))?;
    parse_f64_series(&text)
}

/// Parse RR intervals in seconds. Non-positive durations are rejected.
pub fn parse_rr_seconds(text: &str) -> Result<Vec<f64>> {
    let values = numbered_values(text)?;
    if let Some(&(line, bad)) = values.iter().find(|(_, v)| !(*v > 0.0)) {
        return Err(PulseError::Parse {
            line,
            message: format!("RR intervals must be positive seconds, got {bad}"),
        });
    }
    Ok(values.into_iter().map(|(_, v)| v).collect())
}

pub fn read_rr_seconds(path: &Path) -> Result<Vec<f64>> {
    let text = std::fs::read_to_string(path).map_err(|e| PulseError::io(path, e))?;
    parse_rr_seconds(&text)
}
