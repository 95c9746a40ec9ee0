use crate::stats;
use serde::{Deserialize, Serialize};

/// One EKG reading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub time_ms: f64,
    pub amplitude_mv: f64,
    /// Set by peak detection for consumers that plot the trace.
    #[serde(default)]
    pub is_peak: bool,
}

impl Sample {
    pub fn new(time_ms: f64, amplitude_mv: f64) -> Self {
        Self {
            time_ms,
            amplitude_mv,
            is_peak: false,
        }
    }
}

/// Timestamped amplitude trace. Timestamps are non-decreasing but need not be evenly spaced.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Signal {
    pub samples: Vec<Sample>,
}

impl Signal {
    pub fn new(samples: Vec<Sample>) -> Self {
        Self { samples }
    }

    /// Build from parallel amplitude/time columns; extra entries in the longer column are ignored.
    pub fn from_columns(amplitudes_mv: &[f64], times_ms: &[f64]) -> Self {
        let samples = amplitudes_mv
            .iter()
            .zip(times_ms)
            .map(|(&amplitude, &time)| Sample::new(time, amplitude))
            .collect();
        Self { samples }
    }

    /// Build from evenly spaced samples at `fs` Hz, starting at t = 0.
    pub fn from_uniform(fs: f64, data: &[f64]) -> Self {
        let dt_ms = 1000.0 / fs;
        let samples = data
            .iter()
            .enumerate()
            .map(|(i, &amplitude)| Sample::new(i as f64 * dt_ms, amplitude))
            .collect();
        Self { samples }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn times_ms(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.time_ms).collect()
    }

    pub fn amplitudes(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.amplitude_mv).collect()
    }

    pub fn duration_ms(&self) -> f64 {
        match (self.samples.first(), self.samples.last()) {
            (Some(first), Some(last)) => last.time_ms - first.time_ms,
            _ => 0.0,
        }
    }

    /// Median spacing between consecutive timestamps. Robust against isolated gaps and
    /// duplicate timestamps.
    pub fn median_interval_ms(&self) -> Option<f64> {
        if self.samples.len() < 2 {
            return None;
        }
        let deltas: Vec<f64> = self
            .samples
            .windows(2)
            .map(|w| w[1].time_ms - w[0].time_ms)
            .collect();
        stats::median(&deltas)
    }

    /// Representative sampling rate, `1000 / median_interval_ms`. `None` when undefined.
    pub fn sampling_rate_hz(&self) -> Option<f64> {
        self.median_interval_ms()
            .filter(|dt| *dt > 0.0 && dt.is_finite())
            .map(|dt| 1000.0 / dt)
    }

    /// Indices whose peak marker is set.
    pub fn peak_indices(&self) -> Vec<usize> {
        self.samples
            .iter()
            .enumerate()
            .filter(|(_, s)| s.is_peak)
            .map(|(i, _)| i)
            .collect()
    }

    /// Reset every peak marker, then set it for the given peaks.
    pub fn tag_peaks(&mut self, peaks: &PeakSet) {
        for sample in &mut self.samples {
            sample.is_peak = false;
        }
        for &idx in &peaks.indices {
            if let Some(sample) = self.samples.get_mut(idx) {
                sample.is_peak = true;
            }
        }
    }
}

/// Detected beat locations as sorted sample indices.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeakSet {
    pub indices: Vec<usize>,
}

impl PeakSet {
    pub fn from_indices(indices: Vec<usize>) -> Self {
        Self { indices }
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Timestamps of the peaks. Indices outside the signal are skipped.
    pub fn times_ms(&self, signal: &Signal) -> Vec<f64> {
        self.indices
            .iter()
            .filter_map(|&i| signal.samples.get(i).map(|s| s.time_ms))
            .collect()
    }
}

/// RR intervals (seconds)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RRSeries {
    pub rr: Vec<f64>,
}

impl RRSeries {
    pub fn from_peaks(signal: &Signal, peaks: &PeakSet) -> Self {
        Self::from_peak_times_ms(&peaks.times_ms(signal))
    }

    pub fn from_peak_times_ms(times_ms: &[f64]) -> Self {
        let rr = times_ms
            .windows(2)
            .map(|w| (w[1] - w[0]) / 1000.0)
            .collect();
        Self { rr }
    }

    pub fn len(&self) -> usize {
        self.rr.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rr.is_empty()
    }

    pub fn to_millis(&self) -> Vec<f64> {
        self.rr.iter().map(|s| s * 1000.0).collect()
    }
}
