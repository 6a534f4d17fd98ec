use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::Result;
use crate::paths::Paths;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendConfig {
    /// Chat endpoint of the local answer service.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Upper bound on the page text sent along with each question.
    #[serde(default = "default_page_content_limit")]
    pub page_content_limit: usize,
}

fn default_endpoint() -> String {
    "http://localhost:5000/api/chat".to_string()
}

fn default_request_timeout_secs() -> u64 {
    60
}

fn default_page_content_limit() -> usize {
    4000
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            request_timeout_secs: default_request_timeout_secs(),
            page_content_limit: default_page_content_limit(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionConfig {
    /// How long the detector observes page mutations before giving up.
    #[serde(default = "default_detection_timeout_ms")]
    pub timeout_ms: u64,
    /// Identity used when no name can be resolved. Expected, normal
    /// behavior on pages without a signed-in user, not an error.
    #[serde(default = "default_fallback_name")]
    pub fallback_name: String,
}

fn default_detection_timeout_ms() -> u64 {
    5000
}

fn default_fallback_name() -> String {
    "Guest".to_string()
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_detection_timeout_ms(),
            fallback_name: default_fallback_name(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WidgetConfig {
    #[serde(default = "default_widget_width")]
    pub width: f64,
    #[serde(default = "default_widget_height")]
    pub height: f64,
    #[serde(default = "default_viewport_width")]
    pub viewport_width: f64,
    #[serde(default = "default_viewport_height")]
    pub viewport_height: f64,
}

fn default_widget_width() -> f64 {
    320.0
}

fn default_widget_height() -> f64 {
    420.0
}

fn default_viewport_width() -> f64 {
    1280.0
}

fn default_viewport_height() -> f64 {
    800.0
}

impl Default for WidgetConfig {
    fn default() -> Self {
        Self {
            width: default_widget_width(),
            height: default_widget_height(),
            viewport_width: default_viewport_width(),
            viewport_height: default_viewport_height(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub detection: DetectionConfig,
    #[serde(default)]
    pub widget: WidgetConfig,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    pub fn load_or_default(paths: &Paths) -> Result<Self> {
        let config_path = paths.config_file();
        if config_path.exists() {
            Self::load(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = Config::default();
        assert_eq!(cfg.backend.endpoint, "http://localhost:5000/api/chat");
        assert_eq!(cfg.detection.timeout_ms, 5000);
        assert_eq!(cfg.detection.fallback_name, "Guest");
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let raw = r#"{
  "detection": { "fallbackName": "Visitor" }
}"#;
        let cfg: Config = serde_json::from_str(raw).unwrap();
        assert_eq!(cfg.detection.fallback_name, "Visitor");
        assert_eq!(cfg.detection.timeout_ms, 5000);
        assert_eq!(cfg.backend.request_timeout_secs, 60);
    }
}
