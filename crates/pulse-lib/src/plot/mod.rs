use crate::{metrics::heart_rate::InstantHeartRate, session::EkgSession};
use serde::{Deserialize, Serialize};

/// Points kept per line series unless a caller asks for a different limit.
pub const DEFAULT_MAX_POINTS: usize = 4096;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Axis {
    pub label: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Style {
    pub width: f32,
    pub dash: Option<[f32; 2]>,
    pub color: Color,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color(pub u32);

impl Color {
    pub fn rgb(self) -> (u8, u8, u8) {
        (
            ((self.0 >> 16) & 0xFF) as u8,
            ((self.0 >> 8) & 0xFF) as u8,
            (self.0 & 0xFF) as u8,
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineSeries {
    pub name: String,
    pub points: Vec<[f64; 2]>,
    pub style: Style,
}

/// Unconnected points, drawn as filled circles.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarkerSeries {
    pub name: String,
    pub points: Vec<[f64; 2]>,
    pub radius: u32,
    pub color: Color,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Series {
    Line(LineSeries),
    Markers(MarkerSeries),
}

impl Series {
    pub fn points(&self) -> &[[f64; 2]] {
        match self {
            Series::Line(line) => &line.points,
            Series::Markers(markers) => &markers.points,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Figure {
    pub title: Option<String>,
    pub x: Axis,
    pub y: Axis,
    pub series: Vec<Series>,
}

impl Figure {
    pub fn new(title: impl Into<Option<String>>) -> Self {
        Self {
            title: title.into(),
            x: Axis { label: None },
            y: Axis { label: None },
            series: Vec::new(),
        }
    }

    pub fn with_axes(mut self, x: &str, y: &str) -> Self {
        self.x.label = Some(x.into());
        self.y.label = Some(y.into());
        self
    }

    pub fn add_series(&mut self, series: Series) {
        self.series.push(series);
    }

    /// `(x_min, x_max, y_min, y_max)` over every series, or `None` for an empty figure.
    pub fn bounds(&self) -> Option<(f64, f64, f64, f64)> {
        let mut points = self.series.iter().flat_map(|s| s.points().iter());
        let first = points.next()?;
        let init = (first[0], first[0], first[1], first[1]);
        Some(points.fold(init, |(x0, x1, y0, y1), p| {
            (x0.min(p[0]), x1.max(p[0]), y0.min(p[1]), y1.max(p[1]))
        }))
    }
}

pub trait PlotBackend {
    fn draw(&mut self, fig: &Figure) -> anyhow::Result<()>;
}

pub fn decimate_points(points: &[[f64; 2]], max_points: usize) -> Vec<[f64; 2]> {
    if points.len() <= max_points {
        return points.to_vec();
    }
    let bucket_size = points.len() as f64 / max_points as f64;
    let mut result = Vec::with_capacity(max_points);
    for i in 0..max_points {
        let start = (i as f64 * bucket_size).floor() as usize;
        if start >= points.len() {
            break;
        }
        result.push(points[start]);
    }
    result
}

/// EKG trace with detected peaks overlaid as markers.
///
/// `window_ms` limits both the trace and the markers to the first milliseconds of the
/// recording (measured from its first sample). Peaks are detected on demand.
pub fn figure_from_session(
    session: &mut EkgSession,
    window_ms: Option<f64>,
    max_points: usize,
) -> Figure {
    let peak_indices = session.ensure_peaks().indices.clone();
    let signal = session.signal();
    let start = signal.samples.first().map(|s| s.time_ms).unwrap_or(0.0);
    let in_window = |t: f64| window_ms.map_or(true, |w| t - start <= w);

    let trace: Vec<[f64; 2]> = signal
        .samples
        .iter()
        .take_while(|s| in_window(s.time_ms))
        .map(|s| [s.time_ms, s.amplitude_mv])
        .collect();
    let peaks: Vec<[f64; 2]> = peak_indices
        .iter()
        .filter_map(|&i| signal.samples.get(i))
        .filter(|s| in_window(s.time_ms))
        .map(|s| [s.time_ms, s.amplitude_mv])
        .collect();

    let mut fig = Figure::new(Some("EKG".to_string())).with_axes("time (ms)", "amplitude (mV)");
    fig.add_series(Series::Line(LineSeries {
        name: "EKG".into(),
        points: decimate_points(&trace, max_points),
        style: Style {
            width: 1.2,
            dash: None,
            color: Color(0x1F77B4),
        },
    }));
    fig.add_series(Series::Markers(MarkerSeries {
        name: format!("peaks ({})", peaks.len()),
        points: peaks,
        radius: 4,
        color: Color(0xD62728),
    }));
    fig
}

/// Heart rate over time, one point per beat interval, x in seconds.
pub fn figure_from_instantaneous_hr(hr: &[InstantHeartRate]) -> Figure {
    let points: Vec<[f64; 2]> = hr.iter().map(|h| [h.time_ms / 1000.0, h.bpm]).collect();
    let mut fig =
        Figure::new(Some("Heart rate".to_string())).with_axes("time (s)", "heart rate (bpm)");
    fig.add_series(Series::Line(LineSeries {
        name: "HR".into(),
        points: decimate_points(&points, DEFAULT_MAX_POINTS),
        style: Style {
            width: 2.0,
            dash: None,
            color: Color(0xFF0077),
        },
    }));
    fig
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{metrics::heart_rate::instantaneous_hr, session::SessionConfig, synth};

    #[test]
    fn decimation_keeps_short_series() {
        let pts: Vec<[f64; 2]> = (0..10).map(|i| [i as f64, 0.0]).collect();
        assert_eq!(decimate_points(&pts, 100).len(), 10);
        let pts: Vec<[f64; 2]> = (0..1000).map(|i| [i as f64, 0.0]).collect();
        let out = decimate_points(&pts, 100);
        assert_eq!(out.len(), 100);
        assert_eq!(out[1][0], 10.0);
    }

    #[test]
    fn session_figure_marks_peaks_inside_window() {
        let signal = synth::synthetic_ekg(250.0, &[0.8, 0.8, 0.8, 0.8]);
        let mut session = EkgSession::new(signal, SessionConfig::default());
        let fig = figure_from_session(&mut session, None, DEFAULT_MAX_POINTS);
        assert_eq!(fig.series.len(), 2);
        match &fig.series[1] {
            Series::Markers(m) => assert_eq!(m.points.len(), 5),
            other => panic!("expected markers, got {other:?}"),
        }

        // first beat at 500 ms, second at 1300 ms
        let windowed = figure_from_session(&mut session, Some(1000.0), DEFAULT_MAX_POINTS);
        assert_eq!(windowed.series[1].points().len(), 1);
        let (_, x_max, _, _) = windowed.bounds().unwrap();
        assert!(x_max <= 1000.0);
    }

    #[test]
    fn hr_figure_has_one_point_per_interval() {
        let hr = instantaneous_hr(&[0.0, 1000.0, 1500.0]);
        let fig = figure_from_instantaneous_hr(&hr);
        let pts = fig.series[0].points();
        assert_eq!(pts.len(), 2);
        assert_eq!(pts[0][1], 60.0);
        assert_eq!(pts[1][1], 120.0);
    }

    #[test]
    fn empty_figure_has_no_bounds() {
        assert!(Figure::new(None).bounds().is_none());
        assert_eq!(Color(0xFF0077).rgb(), (0xFF, 0x00, 0x77));
    }
}
