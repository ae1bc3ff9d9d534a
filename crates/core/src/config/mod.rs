use std::{fs, path::Path};

use serde::{Deserialize, Serialize};

use crate::{CurveKind, Result};

/// Top-level configuration structure for the application.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub automation: AutomationConfig,
}

impl AppConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let config = Self::from_json_str(&fs::read_to_string(path)?)?;
        tracing::debug!(path = %path.display(), ?config, "loaded configuration");
        Ok(config)
    }
}

/// Defaults applied when a property is automated without an explicit
/// duration or curve, and pacing for the polling loop.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutomationConfig {
    /// Seconds a value change takes when the caller gives no duration.
    pub default_duration: f64,
    /// Curve used when neither the caller nor the property names one.
    pub default_curve: CurveKind,
    /// Seconds between two polling frames.
    pub frame_interval: f64,
    /// Upper bound on polling frames per settle run.
    pub max_frames: usize,
}

impl Default for AutomationConfig {
    fn default() -> Self {
        Self {
            default_duration: 0.008,
            default_curve: CurveKind::Linear,
            frame_interval: 1.0 / 60.0,
            max_frames: 600,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let config = AppConfig::from_json_str("{}").unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.automation.default_duration, 0.008);
    }

    #[test]
    fn partial_automation_section_is_merged() {
        let config =
            AppConfig::from_json_str(r#"{ "automation": { "default_curve": "exponential" } }"#)
                .unwrap();

        assert_eq!(config.automation.default_curve, CurveKind::Exponential);
        assert_eq!(config.automation.max_frames, 600);
    }

    #[test]
    fn rejects_unknown_curve_names() {
        let err = AppConfig::from_json_str(r#"{ "automation": { "default_curve": "wobble" } }"#)
            .unwrap_err();
        assert!(format!("{err}").contains("wobble"));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = AppConfig::load("/definitely/not/here.json").unwrap_err();
        assert!(matches!(err, crate::AutomationError::Io(_)));
    }
}
