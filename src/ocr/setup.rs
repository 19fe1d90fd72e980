use std::path::{Path, PathBuf};
use std::process::Command;

#[cfg(windows)]
const EXECUTABLE_NAME: &str = "tesseract.exe";
#[cfg(not(windows))]
const EXECUTABLE_NAME: &str = "tesseract";

/// Finds the Tesseract executable: the configured path first, then the
/// per-user install directory, then `PATH`.
pub fn find_tesseract_executable(configured: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = configured {
        if path.exists() {
            return Some(path.to_path_buf());
        }
        log::warn!(
            "Configured tesseract_path {} does not exist; searching elsewhere",
            path.display()
        );
    }

    if let Some(dir) = crate::paths::get_user_tesseract_dir() {
        let local_exe = dir.join(EXECUTABLE_NAME);
        if local_exe.exists() {
            return Some(local_exe);
        }
    }

    match Command::new("tesseract").arg("--version").output() {
        Ok(output) if output.status.success() => Some(PathBuf::from("tesseract")),
        _ => None,
    }
}

/// Finds a tessdata directory next to the executable, falling back to
/// `TESSDATA_PREFIX`. `None` leaves the choice to Tesseract itself.
pub fn find_tessdata_dir(executable: &Path) -> Option<PathBuf> {
    let sibling = executable.parent().map(|dir| dir.join("tessdata"));
    if let Some(dir) = sibling.filter(|d| d.is_dir()) {
        return Some(dir);
    }

    std::env::var_os("TESSDATA_PREFIX")
        .map(PathBuf::from)
        .filter(|p| p.is_dir())
}
