//! Synthetic EKG traces for demos and tests.

use crate::signal::{Sample, Signal};
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::f64::consts::PI;

const FIRST_BEAT_S: f64 = 0.5;
const BEAT_WIDTH_S: f64 = 0.04;
const BEAT_AMPLITUDE_MV: f64 = 1.2;
const BASELINE_MV: f64 = 0.05;

/// Gaussian beats at the given RR intervals (seconds) riding on a slow 1 Hz baseline wander,
/// sampled evenly at `fs` Hz. The first beat sits at 0.5 s and the trace ends 1 s after the last.
pub fn synthetic_ekg(fs: f64, rr: &[f64]) -> Signal {
    let beats = beat_times(rr);
    let duration = beats.last().copied().unwrap_or(FIRST_BEAT_S) + 1.0;
    let samples = (duration * fs) as usize;
    let mut data = Vec::with_capacity(samples);
    for i in 0..samples {
        let time = i as f64 / fs;
        data.push(waveform(time, &beats));
    }
    Signal::from_uniform(fs, &data)
}

/// Same waveform, with each timestamp shifted by uniform noise in `[-jitter_ms, jitter_ms]`.
/// Timestamps stay non-decreasing.
pub fn synthetic_ekg_jittered(fs: f64, rr: &[f64], jitter_ms: f64, seed: u64) -> Signal {
    let base = synthetic_ekg(fs, rr);
    if jitter_ms <= 0.0 {
        return base;
    }
    let beats = beat_times(rr);
    let mut rng = StdRng::seed_from_u64(seed);
    let mut last = f64::MIN;
    let samples = base
        .samples
        .iter()
        .map(|s| {
            let shifted = (s.time_ms + rng.gen_range(-jitter_ms..=jitter_ms)).max(last);
            last = shifted;
            Sample::new(shifted, waveform(shifted / 1000.0, &beats))
        })
        .collect();
    Signal::new(samples)
}

fn beat_times(rr: &[f64]) -> Vec<f64> {
    let mut beats = Vec::with_capacity(rr.len() + 1);
    let mut t = FIRST_BEAT_S;
    beats.push(t);
    for &interval in rr {
        t += interval;
        beats.push(t);
    }
    beats
}

fn waveform(time: f64, beats: &[f64]) -> f64 {
    let mut v = BASELINE_MV * (2.0 * PI * time).sin();
    for &bt in beats {
        let amp = (-0.5 * ((time - bt) / BEAT_WIDTH_S).powi(2)).exp();
        v += BEAT_AMPLITUDE_MV * amp;
    }
    v
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trace_covers_all_beats() {
        let signal = synthetic_ekg(250.0, &[1.0, 1.0]);
        assert_eq!(signal.len(), 875);
        assert_eq!(signal.sampling_rate_hz(), Some(250.0));
        let top = signal.samples[125].amplitude_mv;
        assert!(top > 1.1, "beat amplitude {top}");
    }

    #[test]
    fn jitter_is_reproducible_and_monotonic() {
        let a = synthetic_ekg_jittered(250.0, &[0.8, 0.9], 0.5, 7);
        let b = synthetic_ekg_jittered(250.0, &[0.8, 0.9], 0.5, 7);
        assert_eq!(a.times_ms(), b.times_ms());
        assert!(a.samples.windows(2).all(|w| w[1].time_ms >= w[0].time_ms));
        let fs = a.sampling_rate_hz().unwrap();
        assert!((fs - 250.0).abs() < 25.0);
    }
}
