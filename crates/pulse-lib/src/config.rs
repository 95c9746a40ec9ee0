//! TOML analysis settings.
//!
//! ```toml
//! [ekg]
//! max_plausible_hr = 200
//! irregularity_tolerance = 0.12
//!
//! [subject]
//! weight_kg = 72
//! age = 34
//! resting_hr = 55
//! max_hr = 186
//! ```

use crate::{
    detectors::peaks::{MaxHeartRate, PeakDetectorConfig, DEFAULT_MAX_PLAUSIBLE_HR},
    error::{PulseError, Result},
    metrics::irregularity::DEFAULT_IRREGULARITY_TOLERANCE,
    session::SessionConfig,
    workout::performance::SubjectProfile,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub ekg: EkgSettings,
    pub subject: SubjectProfile,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EkgSettings {
    pub max_plausible_hr: f64,
    pub irregularity_tolerance: f64,
    pub amplitude_height: Option<f64>,
}

impl Default for EkgSettings {
    fn default() -> Self {
        Self {
            max_plausible_hr: DEFAULT_MAX_PLAUSIBLE_HR,
            irregularity_tolerance: DEFAULT_IRREGULARITY_TOLERANCE,
            amplitude_height: None,
        }
    }
}

impl EkgSettings {
    /// Validate and convert into session settings.
    pub fn session_config(&self) -> Result<SessionConfig> {
        let max_hr = MaxHeartRate::new(self.max_plausible_hr)?;
        if !(self.irregularity_tolerance.is_finite() && self.irregularity_tolerance >= 0.0) {
            return Err(PulseError::Config(format!(
                "irregularity_tolerance must be a non-negative number, got {}",
                self.irregularity_tolerance
            )));
        }
        Ok(SessionConfig {
            detector: PeakDetectorConfig::new(max_hr, self.amplitude_height),
            irregularity_tolerance: self.irregularity_tolerance,
        })
    }
}

impl AnalysisConfig {
    /// Parse and validate the subject section. EKG settings are checked by
    /// [`EkgSettings::session_config`].
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let cfg: Self = toml::from_str(text).map_err(|e| PulseError::Config(e.to_string()))?;
        cfg.subject.validate()?;
        Ok(cfg)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| PulseError::io(path, e))?;
        Self::from_toml_str(&text)
    }
}
