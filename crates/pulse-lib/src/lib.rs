pub mod config;
pub mod detectors;
pub mod error;
pub mod io;
pub mod metrics;
pub mod plot;
pub mod session;
pub mod signal;
pub mod stats;
pub mod synth;
pub mod workout;

pub use detectors::*;
pub use error::{PulseError, Result};
pub use metrics::*;
pub use session::{EkgReport, EkgSession, SessionConfig};
pub use signal::*;
