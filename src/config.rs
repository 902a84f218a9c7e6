use std::path::PathBuf;

use crate::error::ConfigError;

const CAMERA_ENV: &str = "VIRTUAL_MOUSE_CAMERA";
const PROCESS_INTERVAL_ENV: &str = "VIRTUAL_MOUSE_PROCESS_INTERVAL";
const SCREENSHOT_DIR_ENV: &str = "VIRTUAL_MOUSE_SCREENSHOT_DIR";
const MODELS_DIR_ENV: &str = "VIRTUAL_MOUSE_MODELS_DIR";
const PREVIEW_ENV: &str = "VIRTUAL_MOUSE_PREVIEW";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppConfig {
    pub camera_index: u32,
    pub frame_width: u32,
    pub frame_height: u32,
    pub target_fps: u32,
    /// Classify every Nth frame.
    pub process_interval: u32,
    pub screenshot_dir: PathBuf,
    pub models_dir: PathBuf,
    /// Show the camera window. Without it the session runs headless.
    pub preview: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            camera_index: 0,
            frame_width: 640,
            frame_height: 480,
            target_fps: 15,
            process_interval: 2,
            screenshot_dir: PathBuf::from("."),
            models_dir: PathBuf::from("models"),
            preview: true,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(value) = lookup(CAMERA_ENV) {
            config.camera_index = parse_u32(CAMERA_ENV, &value)?;
        }
        if let Some(value) = lookup(PROCESS_INTERVAL_ENV) {
            let interval = parse_u32(PROCESS_INTERVAL_ENV, &value)?;
            if interval == 0 {
                return Err(ConfigError::Zero {
                    key: PROCESS_INTERVAL_ENV,
                });
            }
            config.process_interval = interval;
        }
        if let Some(value) = lookup(SCREENSHOT_DIR_ENV).filter(|v| !v.is_empty()) {
            config.screenshot_dir = PathBuf::from(value);
        }
        if let Some(value) = lookup(MODELS_DIR_ENV).filter(|v| !v.is_empty()) {
            config.models_dir = PathBuf::from(value);
        }
        if let Some(value) = lookup(PREVIEW_ENV) {
            config.preview = parse_flag(PREVIEW_ENV, &value)?;
        }

        Ok(config)
    }
}

fn parse_u32(key: &'static str, value: &str) -> Result<u32, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::NotAnInteger {
            key,
            value: value.to_string(),
        })
}

fn parse_flag(key: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::NotAFlag {
            key,
            value: value.to_string(),
        }),
    }
}
