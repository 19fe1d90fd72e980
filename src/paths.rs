use std::path::{Path, PathBuf};
use std::sync::OnceLock;

static EXE_DIR: OnceLock<PathBuf> = OnceLock::new();

/// Returns the directory containing the executable.
pub fn get_exe_dir() -> &'static PathBuf {
    EXE_DIR.get_or_init(|| {
        std::env::current_exe()
            .ok()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()))
            .unwrap_or_else(|| PathBuf::from("."))
    })
}

/// Returns the default config file: `<exe_dir>/config.json`
pub fn get_config_path() -> PathBuf {
    get_exe_dir().join("config.json")
}

/// Returns the logs directory: `<exe_dir>/logs/`
pub fn get_logs_dir() -> PathBuf {
    get_exe_dir().join("logs")
}

/// Returns the log file: `<exe_dir>/logs/window_capture.log`
pub fn get_log_file() -> PathBuf {
    get_logs_dir().join("window_capture.log")
}

/// Returns the captures directory: the configured one, or `<exe_dir>/captures/`
pub fn get_captures_dir(configured: Option<&Path>) -> PathBuf {
    match configured {
        Some(dir) if dir.is_absolute() => dir.to_path_buf(),
        Some(dir) => get_exe_dir().join(dir),
        None => get_exe_dir().join("captures"),
    }
}

/// Returns the per-user tesseract directory: `<data_local_dir>/window-capture/tesseract/`
pub fn get_user_tesseract_dir() -> Option<PathBuf> {
    dirs::data_local_dir().map(|d| d.join("window-capture").join("tesseract"))
}

/// Ensures all output directories exist. Call at startup.
pub fn ensure_directories(captures_dir: &Path) -> std::io::Result<()> {
    std::fs::create_dir_all(get_logs_dir())?;
    std::fs::create_dir_all(captures_dir)?;
    Ok(())
}
