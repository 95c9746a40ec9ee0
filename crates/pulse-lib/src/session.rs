//! One EKG analysis: a signal, its detector settings and the cached peak set.
//!
//! Every metric goes through [`EkgSession::ensure_peaks`], which runs detection with the session
//! configuration the first time it is needed. Re-running detection with other parameters
//! replaces the cache.

use crate::{
    detectors::peaks::{find_peaks_at_interval, PeakDetectorConfig},
    error::{PulseError, Result},
    metrics::{
        heart_rate::{self, HeartRateProfile, InstantHeartRate, QrsSummary},
        irregularity::{detect_irregularities, IrregularityReport, DEFAULT_IRREGULARITY_TOLERANCE},
    },
    signal::{PeakSet, RRSeries, Signal},
};
use log::debug;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    pub detector: PeakDetectorConfig,
    pub irregularity_tolerance: f64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            detector: PeakDetectorConfig::default(),
            irregularity_tolerance: DEFAULT_IRREGULARITY_TOLERANCE,
        }
    }
}

/// Serializable snapshot of everything derived from one recording.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EkgReport {
    pub sample_count: usize,
    pub duration_ms: f64,
    pub sampling_rate_hz: Option<f64>,
    pub peaks: PeakSet,
    pub heart_rate: HeartRateProfile,
    pub irregularities: IrregularityReport,
    pub qrs: QrsSummary,
}

#[derive(Debug, Clone)]
pub struct EkgSession {
    signal: Signal,
    config: SessionConfig,
    sampling_rate_hz: Option<f64>,
    peaks: Option<PeakSet>,
}

impl EkgSession {
    pub fn new(signal: Signal, config: SessionConfig) -> Self {
        let sampling_rate_hz = signal.sampling_rate_hz();
        Self {
            signal,
            config,
            sampling_rate_hz,
            peaks: None,
        }
    }

    /// Build a session from externally prepared fields, e.g. an uploaded recording whose
    /// sampling rate or peaks were computed elsewhere. Seeded peaks must be strictly increasing
    /// indices into the signal.
    pub fn from_parts(
        signal: Signal,
        config: SessionConfig,
        sampling_rate_hz: Option<f64>,
        peaks: Option<PeakSet>,
    ) -> Result<Self> {
        if let Some(fs) = sampling_rate_hz {
            if !(fs.is_finite() && fs > 0.0) {
                return Err(PulseError::Config(format!(
                    "sampling rate must be positive, got {fs}"
                )));
            }
        }
        let mut session = Self {
            sampling_rate_hz: sampling_rate_hz.or_else(|| signal.sampling_rate_hz()),
            signal,
            config,
            peaks: None,
        };
        if let Some(peaks) = peaks {
            session.set_peaks(peaks)?;
        }
        Ok(session)
    }

    pub fn signal(&self) -> &Signal {
        &self.signal
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn sampling_rate_hz(&self) -> Option<f64> {
        self.sampling_rate_hz
    }

    /// Cached peaks, if detection has run or peaks were seeded.
    pub fn cached_peaks(&self) -> Option<&PeakSet> {
        self.peaks.as_ref()
    }

    /// Replace the cached peaks with a validated, externally supplied set.
    pub fn set_peaks(&mut self, peaks: PeakSet) -> Result<()> {
        if let Some(&last) = peaks.indices.last() {
            if last >= self.signal.len() {
                return Err(PulseError::InvalidPeaks(format!(
                    "index {last} outside signal of {} samples",
                    self.signal.len()
                )));
            }
        }
        if peaks.indices.windows(2).any(|w| w[1] <= w[0]) {
            return Err(PulseError::InvalidPeaks(
                "indices must be strictly increasing".into(),
            ));
        }
        self.signal.tag_peaks(&peaks);
        self.peaks = Some(peaks);
        Ok(())
    }

    /// Run detection with the session configuration, replacing any cached peaks.
    pub fn find_peaks(&mut self) -> &PeakSet {
        let cfg = self.config.detector;
        self.find_peaks_with(cfg)
    }

    /// Run detection with explicit parameters; they become the session configuration.
    ///
    /// The refractory distance is measured in samples at the session's sampling rate, which
    /// may have been supplied to [`EkgSession::from_parts`] instead of inferred.
    pub fn find_peaks_with(&mut self, cfg: PeakDetectorConfig) -> &PeakSet {
        self.config.detector = cfg;
        let interval_ms = self.sampling_rate_hz.map(|fs| 1000.0 / fs);
        let peaks = find_peaks_at_interval(&self.signal, &cfg, interval_ms);
        debug!(
            "detected {} peaks in {} samples",
            peaks.len(),
            self.signal.len()
        );
        self.signal.tag_peaks(&peaks);
        self.peaks.insert(peaks)
    }

    /// Populate the peak cache on first use.
    pub fn ensure_peaks(&mut self) -> &PeakSet {
        if self.peaks.is_none() {
            self.find_peaks();
        }
        self.peaks.get_or_insert_with(PeakSet::default)
    }

    pub fn peak_times_ms(&mut self) -> Vec<f64> {
        self.ensure_peaks();
        match &self.peaks {
            Some(peaks) => peaks.times_ms(&self.signal),
            None => Vec::new(),
        }
    }

    pub fn rr_intervals(&mut self) -> RRSeries {
        RRSeries::from_peak_times_ms(&self.peak_times_ms())
    }

    pub fn estimate_average_hr(&mut self) -> u32 {
        heart_rate::average_hr(&self.rr_intervals())
    }

    pub fn instantaneous_hr(&mut self) -> Vec<InstantHeartRate> {
        heart_rate::instantaneous_hr(&self.peak_times_ms())
    }

    pub fn min_hr(&mut self) -> f64 {
        heart_rate::min_hr(&self.instantaneous_hr())
    }

    pub fn max_hr(&mut self) -> f64 {
        heart_rate::max_hr(&self.instantaneous_hr())
    }

    pub fn variability_ms(&mut self) -> f64 {
        heart_rate::variability_ms(&self.rr_intervals())
    }

    pub fn average_rr_interval_ms(&mut self) -> f64 {
        heart_rate::average_rr_interval_ms(&self.rr_intervals())
    }

    pub fn average_pp_interval_ms(&mut self) -> f64 {
        heart_rate::average_pp_interval_ms(&self.rr_intervals())
    }

    pub fn heart_rate_profile(&mut self) -> HeartRateProfile {
        heart_rate::heart_rate_profile(&self.peak_times_ms())
    }

    pub fn detect_irregularities(&mut self, tolerance: f64) -> IrregularityReport {
        detect_irregularities(&self.rr_intervals(), tolerance)
    }

    pub fn qrs_summary(&mut self) -> QrsSummary {
        heart_rate::qrs_summary(&self.peak_times_ms())
    }

    pub fn report(&mut self) -> EkgReport {
        let peaks = self.ensure_peaks().clone();
        let tolerance = self.config.irregularity_tolerance;
        EkgReport {
            sample_count: self.signal.len(),
            duration_ms: self.signal.duration_ms(),
            sampling_rate_hz: self.sampling_rate_hz,
            peaks,
            heart_rate: self.heart_rate_profile(),
            irregularities: self.detect_irregularities(tolerance),
            qrs: self.qrs_summary(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{detectors::peaks::MaxHeartRate, synth::synthetic_ekg};

    fn session(rr: &[f64]) -> EkgSession {
        EkgSession::new(synthetic_ekg(250.0, rr), SessionConfig::default())
    }

    #[test]
    fn metrics_compute_peaks_lazily() {
        let mut s = session(&[1.0, 1.0, 1.0, 1.0]);
        assert!(s.cached_peaks().is_none());
        assert_eq!(s.estimate_average_hr(), 60);
        assert_eq!(s.cached_peaks().map(PeakSet::len), Some(5));
        assert_eq!(s.signal().peak_indices(), s.cached_peaks().unwrap().indices);
    }

    #[test]
    fn instantaneous_length_tracks_peaks() {
        let mut s = session(&[0.8, 0.9, 0.85]);
        let peaks = s.ensure_peaks().len();
        assert_eq!(s.instantaneous_hr().len(), peaks - 1);
        let mut lone = session(&[]);
        assert_eq!(lone.ensure_peaks().len(), 1);
        assert!(lone.instantaneous_hr().is_empty());
    }

    #[test]
    fn redetection_overwrites_cache() {
        let mut s = session(&[0.4, 0.4, 0.4]);
        assert_eq!(s.find_peaks().len(), 4);
        let slow = MaxHeartRate::new(100.0).unwrap();
        let peaks = s.find_peaks_with(PeakDetectorConfig::new(slow, None)).clone();
        assert_eq!(peaks.indices.len(), 2);
        assert_eq!(s.config().detector.max_plausible_hr, slow);
        assert_eq!(s.signal().peak_indices(), peaks.indices);
    }

    #[test]
    fn empty_signal_reports_sentinels() {
        let mut s = EkgSession::new(Signal::default(), SessionConfig::default());
        assert!(s.sampling_rate_hz().is_none());
        assert!(s.ensure_peaks().is_empty());
        assert_eq!(s.estimate_average_hr(), 0);
        assert_eq!(s.min_hr(), 0.0);
        assert_eq!(s.max_hr(), 0.0);
        assert_eq!(s.variability_ms(), 0.0);
        assert_eq!(s.average_rr_interval_ms(), 0.0);
        assert!(!s.detect_irregularities(0.1).irregular_rr);
        let report = s.report();
        assert!(report.qrs.rr_avg_ms.is_none());
    }

    #[test]
    fn seeded_peaks_skip_detection() {
        let signal = Signal::from_uniform(250.0, &[0.0; 1000]);
        let seeded = PeakSet::from_indices(vec![100, 300, 500, 750]);
        let mut s =
            EkgSession::from_parts(signal, SessionConfig::default(), Some(250.0), Some(seeded))
                .unwrap();
        assert_eq!(s.ensure_peaks().indices, vec![100, 300, 500, 750]);
        assert_eq!(s.average_rr_interval_ms(), 866.67);
        assert!(s.detect_irregularities(0.10).irregular_rr);
        assert_eq!(s.average_pp_interval_ms(), s.average_rr_interval_ms());
    }

    #[test]
    fn seeded_peaks_are_validated() {
        let signal = Signal::from_uniform(250.0, &[0.0; 10]);
        let out_of_range = PeakSet::from_indices(vec![2, 10]);
        assert!(EkgSession::from_parts(
            signal.clone(),
            SessionConfig::default(),
            None,
            Some(out_of_range)
        )
        .is_err());
        let unsorted = PeakSet::from_indices(vec![5, 3]);
        assert!(
            EkgSession::from_parts(signal.clone(), SessionConfig::default(), None, Some(unsorted))
                .is_err()
        );
        assert!(
            EkgSession::from_parts(signal, SessionConfig::default(), Some(0.0), None).is_err()
        );
    }

    #[test]
    fn report_bundles_metrics() {
        let mut s = session(&[0.8, 0.8, 0.8, 1.0]);
        let report = s.report();
        assert_eq!(report.peaks.len(), 5);
        assert_eq!(report.sampling_rate_hz, Some(250.0));
        assert_eq!(report.heart_rate.instantaneous.len(), 4);
        assert!(report.irregularities.irregular_rr);
        assert_eq!(report.irregularities.flagged.len(), 1);
        assert_eq!(report.irregularities.flagged[0].index, 3);
    }

    #[test]
    fn supplied_sampling_rate_drives_detection() {
        let mut data = vec![0.0; 300];
        data[50] = 1.0;
        data[200] = 0.9;
        let signal = Signal::from_uniform(250.0, &data);
        let mut inferred = EkgSession::new(signal.clone(), SessionConfig::default());
        assert_eq!(inferred.ensure_peaks().indices, vec![50, 200]);

        let mut supplied =
            EkgSession::from_parts(signal, SessionConfig::default(), Some(1000.0), None).unwrap();
        assert_eq!(supplied.sampling_rate_hz(), Some(1000.0));
        assert_eq!(supplied.ensure_peaks().indices, vec![50]);
    }
}
