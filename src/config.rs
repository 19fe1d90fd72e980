//! Configuration for the capture tool.
//!
//! Loads settings from config.json at startup. Provides the default capture
//! method, black-frame threshold, settle delays, auto-capture timing and OCR
//! options.

use anyhow::{Context, Result};
use log::LevelFilter;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::capture::{
    ActivatedCapture, AutoCaptureSettings, CaptureMethod, CaptureSettings, DEFAULT_BLACK_THRESHOLD,
    SettleDelays,
};

/// Text recognition options.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// Run recognition on every saved capture
    pub enabled: bool,
    /// Explicit path to the tesseract executable
    pub tesseract_path: Option<PathBuf>,
    /// Tesseract language code(s), e.g. "eng" or "eng+jpn"
    pub language: String,
    /// Records at or below this confidence (0.0-1.0) are dropped
    pub min_confidence: f32,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            tesseract_path: None,
            language: "eng".to_string(),
            min_confidence: 0.8,
        }
    }
}

/// Complete tool configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Method used when none is given on the command line
    pub default_method: CaptureMethod,
    /// Mean luminance (0-255) below which a frame counts as black
    pub black_threshold: f32,
    /// Wait after basic activation (milliseconds)
    pub basic_settle_ms: u64,
    /// Wait after forced activation (milliseconds)
    pub forced_settle_ms: u64,
    /// Wait after restoring a minimized window without focus (milliseconds)
    pub restore_settle_ms: u64,
    /// Strategy used once the window has been activated
    pub activated_capture: ActivatedCapture,
    /// Seconds between auto-captures, at least 1
    pub auto_capture_interval_secs: u64,
    pub auto_capture_tick_ms: u64,
    /// How long stopping auto-capture waits for the loop (milliseconds)
    pub stop_timeout_ms: u64,
    /// off, error, warn, info, debug or trace
    pub log_level: String,
    /// Where captures are saved; relative paths are under the exe directory
    pub output_dir: Option<PathBuf>,
    pub ocr: OcrConfig,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            default_method: CaptureMethod::Smart,
            black_threshold: DEFAULT_BLACK_THRESHOLD,
            basic_settle_ms: 500,
            forced_settle_ms: 1000,
            restore_settle_ms: 500,
            activated_capture: ActivatedCapture::Standard,
            auto_capture_interval_secs: 5,
            auto_capture_tick_ms: 1000,
            stop_timeout_ms: 1000,
            log_level: "info".to_string(),
            output_dir: None,
            ocr: OcrConfig::default(),
        }
    }
}

impl CaptureConfig {
    pub fn capture_settings(&self) -> CaptureSettings {
        CaptureSettings {
            black_threshold: self.black_threshold,
            delays: SettleDelays {
                basic: Duration::from_millis(self.basic_settle_ms),
                forced: Duration::from_millis(self.forced_settle_ms),
                restore: Duration::from_millis(self.restore_settle_ms),
            },
            activated_capture: self.activated_capture,
        }
    }

    pub fn auto_capture_settings(&self) -> AutoCaptureSettings {
        AutoCaptureSettings {
            interval: Duration::from_secs(self.auto_capture_interval_secs.max(1)),
            tick: Duration::from_millis(self.auto_capture_tick_ms),
        }
    }

    pub fn stop_timeout(&self) -> Duration {
        Duration::from_millis(self.stop_timeout_ms)
    }

    /// The configured level, or `Info` if it cannot be parsed.
    pub fn level_filter(&self) -> LevelFilter {
        LevelFilter::from_str(self.log_level.trim()).unwrap_or_else(|_| {
            log::warn!("Unknown log_level \"{}\"; using info", self.log_level);
            LevelFilter::Info
        })
    }
}

/// Reads and parses a config file.
pub fn read_config(path: &Path) -> Result<CaptureConfig> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let config = serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    Ok(config)
}

/// Loads configuration from `path` (or config.json next to the executable)
/// and falls back to defaults when it is missing or invalid.
pub fn load_config(path: Option<&Path>) -> CaptureConfig {
    let config_path = path
        .map(Path::to_path_buf)
        .unwrap_or_else(crate::paths::get_config_path);

    log::info!("Looking for config at: {}", config_path.display());

    if !config_path.exists() {
        log::info!("{} not found. Using default config.", config_path.display());
        return CaptureConfig::default();
    }

    match read_config(&config_path) {
        Ok(config) => {
            log::info!("Config loaded from {}", config_path.display());
            config
        }
        Err(e) => {
            log::warn!("{:#}. Using defaults.", e);
            CaptureConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_partial_config_keeps_defaults() {
        let file = write_config(r#"{ "default_method": "background", "basic_settle_ms": 250 }"#);

        let config = load_config(Some(file.path()));

        assert_eq!(config.default_method, CaptureMethod::Background);
        assert_eq!(config.basic_settle_ms, 250);
        assert_eq!(config.forced_settle_ms, 1000);
        assert_eq!(config.ocr, OcrConfig::default());
    }

    #[test]
    fn test_invalid_config_falls_back_to_defaults() {
        let file = write_config("{ not json");
        assert!(read_config(file.path()).is_err());
        assert_eq!(load_config(Some(file.path())), CaptureConfig::default());
    }

    #[test]
    fn test_missing_config_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(Some(&dir.path().join("absent.json")));
        assert_eq!(config, CaptureConfig::default());
    }

    #[test]
    fn test_shipped_config_matches_defaults() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("config.json");
        assert_eq!(read_config(&path).unwrap(), CaptureConfig::default());
    }

    #[test]
    fn test_settings_conversion() {
        let config = CaptureConfig {
            black_threshold: 12.5,
            restore_settle_ms: 0,
            activated_capture: ActivatedCapture::Handle,
            auto_capture_interval_secs: 2,
            auto_capture_tick_ms: 100,
            ..CaptureConfig::default()
        };

        let settings = config.capture_settings();
        assert_eq!(settings.black_threshold, 12.5);
        assert_eq!(settings.delays.basic, Duration::from_millis(500));
        assert_eq!(settings.delays.restore, Duration::ZERO);
        assert_eq!(settings.activated_capture, ActivatedCapture::Handle);

        let auto = config.auto_capture_settings();
        assert_eq!(auto.interval, Duration::from_secs(2));
        assert_eq!(auto.tick, Duration::from_millis(100));
    }

    #[test]
    fn test_zero_interval_is_raised_to_one_second() {
        let file = write_config(r#"{ "auto_capture_interval_secs": 0 }"#);
        let config = read_config(file.path()).unwrap();

        assert_eq!(config.auto_capture_settings().interval, Duration::from_secs(1));
    }

    #[test]
    fn test_level_filter() {
        let mut config = CaptureConfig::default();
        assert_eq!(config.level_filter(), LevelFilter::Info);
        config.log_level = "DEBUG".to_string();
        assert_eq!(config.level_filter(), LevelFilter::Debug);
        config.log_level = "chatty".to_string();
        assert_eq!(config.level_filter(), LevelFilter::Info);
    }
}
