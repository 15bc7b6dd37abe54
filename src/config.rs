use crate::errors::AdapterError;
use crate::geometry::SurfaceSize;
use crate::render::Color;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Verbosity of the log output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Off => log::LevelFilter::Off,
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Initial window geometry
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "Demo".to_string(),
            width: 800,
            height: 600,
        }
    }
}

/// Presentation layer configuration. Every field is optional in JSON.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub window: WindowConfig,
    /// Color the surface is cleared to before each frame, as `#rrggbb`
    pub clear_color: Color,
    /// Pixel height of the default font
    pub font_height: f32,
    /// How long an idle session blocks waiting for the next event
    pub idle_timeout_ms: u64,
    /// Frames polled without blocking after activity, before waiting again
    pub poll_frames: u32,
    pub log_level: LogLevel,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            window: WindowConfig::default(),
            clear_color: Color::from_rgb24(0x30_30_30),
            font_height: 15.0,
            idle_timeout_ms: 100,
            poll_frames: 4,
            log_level: LogLevel::default(),
        }
    }
}

impl Config {
    pub fn from_json(json: &str) -> Result<Self, AdapterError> {
        let config: Config = serde_json::from_str(json).map_err(|e| AdapterError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses a JSON configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, AdapterError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        log::debug!("loading configuration from {}", path.display());
        Self::from_json(&contents)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_millis(self.idle_timeout_ms)
    }

    pub fn surface_size(&self) -> SurfaceSize {
        SurfaceSize::new(self.window.width, self.window.height)
    }

    fn validate(&self) -> Result<(), AdapterError> {
        if !(self.font_height.is_finite() && self.font_height > 0.0) {
            return Err(AdapterError::Config(format!("font_height must be positive, got {}", self.font_height)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_match_demo_window() {
        let config = Config::default();
        assert_eq!(config.surface_size(), SurfaceSize::new(800, 600));
        assert_eq!(config.clear_color.to_rgb24(), 0x30_30_30);
        assert_eq!(config.poll_frames, 4);
        assert_eq!(config.idle_timeout(), Duration::from_millis(100));
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config = Config::from_json(r##"{ "window": { "width": 320 }, "clear_color": "#102030", "log_level": "debug" }"##)
            .unwrap();

        assert_eq!(config.window.width, 320);
        assert_eq!(config.window.height, 600);
        assert_eq!(config.clear_color.to_rgb24(), 0x10_20_30);
        assert_eq!(config.log_level, LogLevel::Debug);
        assert_eq!(config.font_height, 15.0);
        assert_eq!(log::LevelFilter::from(config.log_level), log::LevelFilter::Debug);
    }

    #[test]
    fn invalid_values_are_config_errors() {
        assert!(matches!(
            Config::from_json(r#"{ "clear_color": "purple" }"#),
            Err(AdapterError::Config(_))
        ));
        assert!(matches!(
            Config::from_json(r#"{ "font_height": 0 }"#),
            Err(AdapterError::Config(_))
        ));
    }

    #[test]
    fn load_reads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "idle_timeout_ms": 16 }}"#).unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.idle_timeout(), Duration::from_millis(16));

        assert!(matches!(Config::load("/nonexistent/uibridge.json"), Err(AdapterError::Io(_))));
    }
}
