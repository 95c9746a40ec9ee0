use thiserror::Error;

pub type Result<T> = std::result::Result<T, PulseError>;

/// Errors raised for malformed input or invalid configuration.
///
/// Insufficient data (too few samples, peaks or zones) is never reported through this type;
/// those cases resolve to sentinel values in the metric accessors.
#[derive(Debug, Error)]
pub enum PulseError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("line {line}: {message}")]
    Parse { line: usize, message: String },
    #[error("missing required column '{0}'")]
    MissingColumn(String),
    #[error("timestamps must be non-decreasing (line {line}: {time_ms} ms after {previous_ms} ms)")]
    NonMonotonicTime {
        line: usize,
        time_ms: f64,
        previous_ms: f64,
    },
    #[error("maximum heart rate must be a positive number of bpm, got {0}")]
    InvalidMaxHeartRate(f64),
    #[error("invalid peak set: {0}")]
    InvalidPeaks(String),
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl PulseError {
    pub(crate) fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        PulseError::Io {
            path: path.display().to_string(),
            source,
        }
    }
}
