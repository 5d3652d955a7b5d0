use serde::{Deserialize, Deserializer};

use super::error::CaptureError;
use super::recognition::RecognitionMode;

/// Sentinel override value that disables the worklet path.
pub const IGNORE_WORKLET: &str = "ignore";

/// Worklet module override supplied at construction.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum WorkletModuleSetting {
    /// No override: the built-in speech processor module is registered lazily.
    #[default]
    Builtin,
    /// A caller-provided module URL.
    Url(String),
    /// Never use the worklet path.
    Ignore,
}

impl WorkletModuleSetting {
    /// Parse the raw override value. `"ignore"` is matched case-insensitively.
    pub fn from_override(value: &str) -> Self {
        let value = value.trim();
        if value.is_empty() {
            Self::Builtin
        } else if value.eq_ignore_ascii_case(IGNORE_WORKLET) {
            Self::Ignore
        } else {
            Self::Url(value.to_string())
        }
    }

    pub fn is_ignore(&self) -> bool {
        matches!(self, Self::Ignore)
    }
}

impl<'de> Deserialize<'de> for WorkletModuleSetting {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.map(|v| Self::from_override(&v)).unwrap_or_default())
    }
}

/// Configuration for a `Recorder`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RecorderConfig {
    /// Worklet override (`"ignore"`, a module URL, or absent).
    pub worklet_module: WorkletModuleSetting,

    /// Stop every device track when media resources are released.
    pub stop_input_on_release: bool,
}

impl RecorderConfig {
    pub fn validate(&self) -> Result<(), String> {
        if let WorkletModuleSetting::Url(url) = &self.worklet_module {
            if url.chars().any(char::is_whitespace) {
                return Err(format!("worklet module url contains whitespace: {url:?}"));
            }
        }
        Ok(())
    }

    /// Load and validate a JSON configuration document.
    pub fn from_json(json: &str) -> Result<Self, CaptureError> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| CaptureError::InvalidConfiguration(e.to_string()))?;
        config.validate().map_err(CaptureError::InvalidConfiguration)?;
        Ok(config)
    }
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            worklet_module: WorkletModuleSetting::Builtin,
            stop_input_on_release: true,
        }
    }
}

/// Configuration for a `TurnController`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TurnConfig {
    /// Mode passed to every `recognize` call (default: conversation).
    pub recognition_mode: RecognitionMode,

    /// Capacity of the event broadcast channel.
    pub event_capacity: usize,
}

impl TurnConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.event_capacity == 0 {
            return Err("event capacity must be positive".into());
        }
        Ok(())
    }
}

impl Default for TurnConfig {
    fn default() -> Self {
        Self {
            recognition_mode: RecognitionMode::Conversation,
            event_capacity: 64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ignore_override_is_case_insensitive() {
        assert_eq!(WorkletModuleSetting::from_override("IGNORE"), WorkletModuleSetting::Ignore);
        assert_eq!(WorkletModuleSetting::from_override(" Ignore "), WorkletModuleSetting::Ignore);
        assert_eq!(WorkletModuleSetting::from_override(""), WorkletModuleSetting::Builtin);
        assert_eq!(
            WorkletModuleSetting::from_override("https://cdn/processor.js"),
            WorkletModuleSetting::Url("https://cdn/processor.js".into())
        );
    }

    #[test]
    fn recorder_config_from_json() {
        let config = RecorderConfig::from_json(
            r#"{ "worklet_module": "ignore", "stop_input_on_release": false }"#,
        )
        .unwrap();
        assert!(config.worklet_module.is_ignore());
        assert!(!config.stop_input_on_release);
    }

    #[test]
    fn recorder_config_defaults_when_fields_missing() {
        let config = RecorderConfig::from_json("{}").unwrap();
        assert_eq!(config, RecorderConfig::default());

        let config = RecorderConfig::from_json(r#"{ "worklet_module": null }"#).unwrap();
        assert_eq!(config.worklet_module, WorkletModuleSetting::Builtin);
    }

    #[test]
    fn recorder_config_rejects_bad_url() {
        let err = RecorderConfig::from_json(r#"{ "worklet_module": "a b" }"#).unwrap_err();
        assert!(matches!(err, CaptureError::InvalidConfiguration(_)));
    }

    #[test]
    fn turn_config_validation() {
        assert!(TurnConfig::default().validate().is_ok());
        let config = TurnConfig {
            event_capacity: 0,
            ..TurnConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
