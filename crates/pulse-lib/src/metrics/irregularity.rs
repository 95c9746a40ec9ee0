use crate::{signal::RRSeries, stats};
use serde::{Deserialize, Serialize};

/// Relative deviation from the mean RR interval above which a beat is flagged.
pub const DEFAULT_IRREGULARITY_TOLERANCE: f64 = 0.10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IrregularInterval {
    pub index: usize,
    pub duration_ms: f64,
    pub deviation_pct: f64,
    pub label: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IrregularityReport {
    pub irregular_rr: bool,
    /// Mirrors `irregular_rr`; PP intervals are approximated by RR intervals.
    pub irregular_pp: bool,
    pub tolerance: f64,
    pub interval_count: usize,
    pub flagged: Vec<IrregularInterval>,
}

impl IrregularityReport {
    fn regular(tolerance: f64, interval_count: usize) -> Self {
        Self {
            tolerance,
            interval_count,
            ..Self::default()
        }
    }
}

/// Flag intervals whose relative deviation from the mean interval is strictly greater than
/// `tolerance`. Fewer than two intervals always report a regular rhythm.
pub fn detect_irregularities(rr: &RRSeries, tolerance: f64) -> IrregularityReport {
    if rr.len() < 2 {
        return IrregularityReport::regular(tolerance, rr.len());
    }
    let mean = match stats::mean(&rr.rr) {
        Some(m) if m > 0.0 => m,
        _ => return IrregularityReport::regular(tolerance, rr.len()),
    };

    let flagged: Vec<IrregularInterval> = rr
        .rr
        .iter()
        .enumerate()
        .filter_map(|(index, &interval)| {
            let deviation = (interval / mean - 1.0).abs();
            (deviation > tolerance).then(|| {
                let duration_ms = interval * 1000.0;
                let deviation_pct = deviation * 100.0;
                IrregularInterval {
                    index,
                    duration_ms,
                    deviation_pct,
                    label: format!(
                        "interval {index}: {:.3} s, deviation {deviation_pct:.1}%",
                        interval
                    ),
                }
            })
        })
        .collect();

    let irregular = !flagged.is_empty();
    IrregularityReport {
        irregular_rr: irregular,
        irregular_pp: irregular,
        tolerance,
        interval_count: rr.len(),
        flagged,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_only_the_outlier() {
        let rr = RRSeries {
            rr: vec![0.8, 0.8, 0.8, 1.0],
        };
        let report = detect_irregularities(&rr, DEFAULT_IRREGULARITY_TOLERANCE);
        assert!(report.irregular_rr);
        assert!(report.irregular_pp);
        assert_eq!(report.flagged.len(), 1);
        let flagged = &report.flagged[0];
        assert_eq!(flagged.index, 3);
        assert!((flagged.duration_ms - 1000.0).abs() < 1e-9);
        assert!((flagged.deviation_pct - 17.647).abs() < 1e-2);
        assert!(flagged.label.starts_with("interval 3"));
    }

    #[test]
    fn deviation_equal_to_tolerance_is_not_flagged() {
        let rr = RRSeries {
            rr: vec![0.75, 1.25],
        };
        let report = detect_irregularities(&rr, 0.25);
        assert!(!report.irregular_rr);
        assert!(report.flagged.is_empty());
        assert!(detect_irregularities(&rr, 0.2).irregular_rr);
    }

    #[test]
    fn too_few_intervals_are_regular() {
        for rr in [vec![], vec![0.4]] {
            let report = detect_irregularities(&RRSeries { rr }, 0.1);
            assert!(!report.irregular_rr);
            assert!(!report.irregular_pp);
            assert!(report.flagged.is_empty());
        }
    }
}
