use crate::{
    error::{PulseError, Result},
    signal::{PeakSet, Signal},
    stats,
};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

/// Highest heart rate considered physiologically plausible unless configured otherwise.
pub const DEFAULT_MAX_PLAUSIBLE_HR: f64 = 220.0;
/// Floor used by [`MaxHeartRate::clamped`].
pub const MIN_SAFE_HR: f64 = 30.0;
/// Percentile of the amplitude series used as the default peak height.
pub const DEFAULT_HEIGHT_PERCENTILE: f64 = 90.0;

/// Validated maximum plausible heart rate in bpm. Always finite and positive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct MaxHeartRate(f64);

impl MaxHeartRate {
    pub fn new(bpm: f64) -> Result<Self> {
        if bpm.is_finite() && bpm > 0.0 {
            Ok(Self(bpm))
        } else {
            Err(PulseError::InvalidMaxHeartRate(bpm))
        }
    }

    /// Accept any input, clamping to [`MIN_SAFE_HR`] instead of failing.
    pub fn clamped(bpm: f64) -> Self {
        if bpm.is_finite() {
            Self(bpm.max(MIN_SAFE_HR))
        } else {
            Self(MIN_SAFE_HR)
        }
    }

    pub fn bpm(self) -> f64 {
        self.0
    }

    /// Refractory period implied by this heart rate.
    pub fn min_distance_ms(self) -> f64 {
        60_000.0 / self.0
    }
}

impl Default for MaxHeartRate {
    fn default() -> Self {
        Self(DEFAULT_MAX_PLAUSIBLE_HR)
    }
}

impl TryFrom<f64> for MaxHeartRate {
    type Error = PulseError;

    fn try_from(value: f64) -> Result<Self> {
        Self::new(value)
    }
}

impl From<MaxHeartRate> for f64 {
    fn from(value: MaxHeartRate) -> Self {
        value.0
    }
}

/// Parameters of the distance-constrained peak detector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PeakDetectorConfig {
    pub max_plausible_hr: MaxHeartRate,
    /// Minimum peak amplitude in mV. `None` uses the 90th percentile of the signal.
    pub amplitude_height: Option<f64>,
}

impl PeakDetectorConfig {
    pub fn new(max_plausible_hr: MaxHeartRate, amplitude_height: Option<f64>) -> Self {
        Self {
            max_plausible_hr,
            amplitude_height,
        }
    }
}

/// Minimum peak spacing in whole samples for a given sampling interval, truncated.
pub fn min_distance_samples(max_hr: MaxHeartRate, sampling_interval_ms: f64) -> usize {
    if sampling_interval_ms <= 0.0 || !sampling_interval_ms.is_finite() {
        return 0;
    }
    (max_hr.min_distance_ms() / sampling_interval_ms).floor() as usize
}

/// Default amplitude threshold: the 90th percentile of the trace.
pub fn default_amplitude_height(signal: &Signal) -> Option<f64> {
    stats::percentile(&signal.amplitudes(), DEFAULT_HEIGHT_PERCENTILE)
}

/// Detect beat peaks: local maxima at or above the amplitude threshold, thinned so that no two
/// survivors are closer than the refractory distance implied by the maximum heart rate.
///
/// The sampling interval is the median timestamp spacing; see [`find_peaks_at_interval`] to
/// supply it.
pub fn find_peaks(signal: &Signal, cfg: &PeakDetectorConfig) -> PeakSet {
    find_peaks_at_interval(signal, cfg, None)
}

/// [`find_peaks`] with an explicit sampling interval in ms for the refractory distance.
/// `None` (or a non-positive interval) falls back to the median timestamp spacing.
pub fn find_peaks_at_interval(
    signal: &Signal,
    cfg: &PeakDetectorConfig,
    interval_ms: Option<f64>,
) -> PeakSet {
    if signal.len() < 3 {
        return PeakSet::default();
    }
    let Some(interval_ms) = interval_ms
        .filter(|dt| *dt > 0.0 && dt.is_finite())
        .or_else(|| signal.median_interval_ms())
        .filter(|dt| *dt > 0.0 && dt.is_finite())
    else {
        warn!(
            "sampling rate undefined for {} samples; no peaks detected",
            signal.len()
        );
        return PeakSet::default();
    };

    let amplitudes = signal.amplitudes();
    let height = match cfg.amplitude_height.or_else(|| default_amplitude_height(signal)) {
        Some(h) => h,
        None => return PeakSet::default(),
    };
    let distance = min_distance_samples(cfg.max_plausible_hr, interval_ms);
    debug!(
        "find_peaks: n={} interval={:.3}ms height={:.4}mV distance={} samples",
        amplitudes.len(),
        interval_ms,
        height,
        distance
    );

    let candidates: Vec<usize> = local_maxima(&amplitudes)
        .into_iter()
        .filter(|&i| amplitudes[i] >= height)
        .collect();
    let peaks = if distance > 1 {
        select_by_distance(&candidates, &amplitudes, distance)
    } else {
        candidates
    };
    PeakSet::from_indices(peaks)
}

/// Interior local maxima. A flat top reports its middle sample (left-middle for even widths).
fn local_maxima(x: &[f64]) -> Vec<usize> {
    let mut peaks = Vec::new();
    if x.len() < 3 {
        return peaks;
    }
    let i_max = x.len() - 1;
    let mut i = 1;
    while i < i_max {
        if x[i - 1] < x[i] {
            let mut ahead = i + 1;
            while ahead < i_max && x[ahead] == x[i] {
                ahead += 1;
            }
            if x[ahead] < x[i] {
                peaks.push((i + ahead - 1) / 2);
                i = ahead;
            }
        }
        i += 1;
    }
    peaks
}

/// Keep the highest peaks first (earliest index on ties) and drop any neighbour closer than
/// `distance` samples to a kept one.
fn select_by_distance(peaks: &[usize], x: &[f64], distance: usize) -> Vec<usize> {
    let mut order: Vec<usize> = (0..peaks.len()).collect();
    order.sort_by(|&a, &b| x[peaks[b]].total_cmp(&x[peaks[a]]).then(a.cmp(&b)));

    let mut keep = vec![true; peaks.len()];
    for &j in &order {
        if !keep[j] {
            continue;
        }
        let mut k = j;
        while k > 0 && peaks[j] - peaks[k - 1] < distance {
            k -= 1;
            keep[k] = false;
        }
        let mut k = j + 1;
        while k < peaks.len() && peaks[k] - peaks[j] < distance {
            keep[k] = false;
            k += 1;
        }
    }

    peaks
        .iter()
        .zip(keep)
        .filter(|(_, kept)| *kept)
        .map(|(&p, _)| p)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synth::synthetic_ekg;

    fn spikes(len: usize, at: &[(usize, f64)]) -> Signal {
        let mut data = vec![0.0; len];
        for &(idx, amp) in at {
            data[idx] = amp;
        }
        Signal::from_uniform(250.0, &data)
    }

    #[test]
    fn rejects_non_positive_max_hr() {
        assert!(MaxHeartRate::new(0.0).is_err());
        assert!(MaxHeartRate::new(-10.0).is_err());
        assert!(MaxHeartRate::new(f64::NAN).is_err());
        assert_eq!(MaxHeartRate::clamped(0.0).bpm(), MIN_SAFE_HR);
        assert_eq!(MaxHeartRate::clamped(180.0).bpm(), 180.0);
    }

    #[test]
    fn distance_is_truncated_to_whole_samples() {
        let hr = MaxHeartRate::new(220.0).unwrap();
        // 60000 / 220 = 272.7 ms at 4 ms spacing
        assert_eq!(min_distance_samples(hr, 4.0), 68);
    }

    #[test]
    fn close_equal_peaks_keep_the_earliest() {
        let signal = spikes(150, &[(10, 1.0), (60, 1.0), (110, 1.0)]);
        let peaks = find_peaks(&signal, &PeakDetectorConfig::default());
        assert_eq!(peaks.indices, vec![10, 110]);
    }

    #[test]
    fn close_peaks_keep_the_highest() {
        let signal = spikes(150, &[(10, 1.0), (60, 1.5), (110, 1.0)]);
        let peaks = find_peaks(&signal, &PeakDetectorConfig::default());
        assert_eq!(peaks.indices, vec![60]);

        let signal = spikes(150, &[(10, 1.0), (60, 0.9), (110, 1.2)]);
        let peaks = find_peaks(&signal, &PeakDetectorConfig::default());
        assert_eq!(peaks.indices, vec![10, 110]);
    }

    #[test]
    fn explicit_height_filters_candidates() {
        let signal = spikes(400, &[(50, 0.4), (150, 1.0), (250, 0.6), (350, 1.1)]);
        let cfg = PeakDetectorConfig::new(MaxHeartRate::default(), Some(0.5));
        let peaks = find_peaks(&signal, &cfg);
        assert_eq!(peaks.indices, vec![150, 250, 350]);
    }

    #[test]
    fn plateau_reports_middle_sample() {
        let x = [0.0, 1.0, 2.0, 2.0, 2.0, 1.0, 0.0, 3.0, 3.0, 0.0];
        assert_eq!(local_maxima(&x), vec![3, 7]);
    }

    #[test]
    fn edges_are_never_peaks() {
        let x = [5.0, 1.0, 0.0, 1.0, 5.0];
        assert!(local_maxima(&x).is_empty());
    }

    #[test]
    fn empty_and_tiny_signals_have_no_peaks() {
        let cfg = PeakDetectorConfig::default();
        assert!(find_peaks(&Signal::default(), &cfg).is_empty());
        assert!(find_peaks(&Signal::from_uniform(250.0, &[1.0, 2.0]), &cfg).is_empty());
    }

    #[test]
    fn detects_regular_beats() {
        let rr = [0.82, 0.78, 0.8, 0.79, 0.81, 0.77, 0.84, 0.88];
        let signal = synthetic_ekg(250.0, &rr);
        let peaks = find_peaks(&signal, &PeakDetectorConfig::default());
        assert_eq!(peaks.len(), rr.len() + 1);
    }

    #[test]
    fn consecutive_peaks_respect_refractory_distance() {
        let rr = [0.5, 0.3, 0.6, 0.28, 0.9, 0.31, 0.7];
        let signal = synthetic_ekg(250.0, &rr);
        let hr = MaxHeartRate::new(180.0).unwrap();
        let peaks = find_peaks(&signal, &PeakDetectorConfig::new(hr, None));
        let times = peaks.times_ms(&signal);
        let tolerance = signal.median_interval_ms().unwrap();
        for w in times.windows(2) {
            assert!(
                w[1] - w[0] >= hr.min_distance_ms() - tolerance,
                "peaks {} ms apart",
                w[1] - w[0]
            );
        }
    }

    #[test]
    fn detection_is_idempotent() {
        let signal = synthetic_ekg(360.0, &[0.9, 0.85, 0.88, 0.86, 0.82]);
        let cfg = PeakDetectorConfig::default();
        assert_eq!(find_peaks(&signal, &cfg), find_peaks(&signal, &cfg));
    }

    #[test]
    fn explicit_interval_sets_refractory_distance() {
        let mut data = vec![0.0; 300];
        data[50] = 1.0;
        data[200] = 0.9;
        let signal = Signal::from_uniform(250.0, &data);
        let cfg = PeakDetectorConfig::new(MaxHeartRate::default(), Some(0.5));
        // 4 ms timestamps: 68-sample distance keeps both spikes
        assert_eq!(find_peaks(&signal, &cfg).indices, vec![50, 200]);
        // 1 ms interval: 272-sample distance drops the lower one
        assert_eq!(
            find_peaks_at_interval(&signal, &cfg, Some(1.0)).indices,
            vec![50]
        );
        assert_eq!(
            find_peaks_at_interval(&signal, &cfg, Some(0.0)).indices,
            vec![50, 200]
        );
    }
}
