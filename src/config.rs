// config.rs - viewer settings loaded from an optional JSON file

use crate::adapter::ViewContext;
use crate::control::DEFAULT_MEDIA_BASE;
use crate::error::ConfigError;
use crate::stereo::MonoEye;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub mono_eye: MonoEye,
    pub legacy_half_turn: bool,
    pub plane_height: f32,
    pub model_target_size: f32,
    /// WebSocket URL of the selection server, e.g. `ws://localhost:8080/`.
    pub control_url: Option<String>,
    /// HTTP base URL used for the initial `api/last-selection` query.
    pub server_url: Option<String>,
    /// Prefix joined to file names arriving on the control channel.
    pub media_base: String,
    /// Directory relative media paths are resolved against.
    pub data_root: PathBuf,
    pub reconnect_delay_ms: u64,
    pub reload_delay_ms: u64,
    pub vsync: bool,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        let ctx = ViewContext::default();
        Self {
            mono_eye: ctx.mono_eye,
            legacy_half_turn: ctx.legacy_half_turn,
            plane_height: ctx.plane_height,
            model_target_size: ctx.model_target_size,
            control_url: None,
            server_url: None,
            media_base: DEFAULT_MEDIA_BASE.to_string(),
            data_root: PathBuf::from("."),
            reconnect_delay_ms: 1000,
            reload_delay_ms: 150,
            vsync: true,
        }
    }
}

impl ViewerConfig {
    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: ViewerConfig =
            serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("plane_height", self.plane_height)?;
        positive("model_target_size", self.model_target_size)?;
        if let Some(url) = &self.control_url {
            if !(url.starts_with("ws://") || url.starts_with("wss://")) {
                return Err(ConfigError::Invalid {
                    field: "control_url",
                    reason: format!("{url} is not a ws:// or wss:// URL"),
                });
            }
        }
        Ok(())
    }

    pub fn view_context(&self) -> ViewContext {
        ViewContext {
            mono_eye: self.mono_eye,
            legacy_half_turn: self.legacy_half_turn,
            plane_height: self.plane_height,
            model_target_size: self.model_target_size,
            ..ViewContext::default()
        }
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    pub fn reload_delay(&self) -> Duration {
        Duration::from_millis(self.reload_delay_ms)
    }
}

fn positive(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            field,
            reason: format!("{value} must be a positive number"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"mono_eye": "right", "legacy_half_turn": true}}"#).unwrap();

        let config = ViewerConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config.mono_eye, MonoEye::Right);
        assert!(config.legacy_half_turn);
        assert_eq!(config.plane_height, 3.0);
        assert_eq!(config.media_base, "data/");
        assert_eq!(config.reconnect_delay(), Duration::from_secs(1));

        let ctx = config.view_context();
        assert_eq!(ctx.mono_eye, MonoEye::Right);
        assert_eq!(ctx.model_target_size, 0.5);
    }

    #[test]
    fn rejects_non_positive_sizes() {
        let config = ViewerConfig {
            plane_height: 0.0,
            ..ViewerConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { field: "plane_height", .. })
        ));
    }

    #[test]
    fn rejects_http_control_url() {
        let config = ViewerConfig {
            control_url: Some("http://localhost:8080".into()),
            ..ViewerConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn reports_parse_errors_with_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("viewer.json");
        std::fs::write(&path, "{ not json").unwrap();
        let err = ViewerConfig::from_json_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("viewer.json"));
    }
}
