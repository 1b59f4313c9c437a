use std::path::Path;

use serde::{
    Deserialize,
    Serialize
};

use crate::DEFAULT_MAX_FRAME_RATE;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not read config, reason='{0}'")]
    IoError(#[from] std::io::Error),

    #[error("Could not parse config, reason='{0}'")]
    ParseError(#[from] serde_json::Error),
}

/// Stage settings; every field is optional in the JSON file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StageConfig {
    /// Upper bound on frames per second.
    pub max_frame_rate: f32,
    /// Container size used by in-memory and windowed surfaces.
    pub container_width: f32,
    pub container_height: f32,
    /// Id of the container element when running in a browser.
    pub container_id: String,
}

impl Default for StageConfig {
    fn default() -> Self {
        Self {
            max_frame_rate: DEFAULT_MAX_FRAME_RATE,
            container_width: 800.0,
            container_height: 600.0,
            container_id: String::from("game"),
        }
    }
}

impl StageConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }
}

#[test]
fn test_config_defaults_fill_missing_fields() {
    let config = StageConfig::from_json_str(r#"{"maxFrameRate": 30}"#).unwrap();
    assert_eq!(config.max_frame_rate, 30.0);
    assert_eq!(config.container_width, 800.0);
    assert_eq!(config.container_id, "game");
}

#[test]
fn test_config_bad_json_is_parse_error() {
    let result = StageConfig::from_json_str("{ maxFrameRate: ");
    assert!(matches!(result, Err(ConfigError::ParseError(_))));
}

#[test]
fn test_config_missing_file_is_io_error() {
    let result = StageConfig::from_json_file("/definitely/not/here/stage.json");
    assert!(matches!(result, Err(ConfigError::IoError(_))));
}
