//! Console and file logger behind the `log` facade.
//!
//! Every record is printed with a timestamp and appended to the log file.

use chrono::Local;
use log::{LevelFilter, Log, Metadata, Record};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

struct Logger {
    file: Mutex<Option<File>>,
}

impl Log for Logger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let line = format_line(record);
        print!("{}", line);
        if let Ok(mut file) = self.file.lock() {
            if let Some(file) = file.as_mut() {
                let _ = file.write_all(line.as_bytes());
            }
        }
    }

    fn flush(&self) {
        let _ = std::io::stdout().flush();
        if let Ok(mut file) = self.file.lock() {
            if let Some(file) = file.as_mut() {
                let _ = file.flush();
            }
        }
    }
}

/// `[HH:MM:SS.mmm] message`, with the level for anything other than info.
fn format_line(record: &Record) -> String {
    let timestamp = Local::now().format("%H:%M:%S%.3f");
    match record.level() {
        log::Level::Info => format!("[{}] {}\n", timestamp, record.args()),
        level => format!("[{}] {} {}\n", timestamp, level, record.args()),
    }
}

/// Installs the logger. The file is opened in append mode; if it cannot be
/// opened, logging continues on the console only.
pub fn init(log_file: &Path, level: LevelFilter) -> Result<(), log::SetLoggerError> {
    let file = OpenOptions::new().create(true).append(true).open(log_file);
    let file_error = file.as_ref().err().map(|e| e.to_string());

    log::set_boxed_logger(Box::new(Logger {
        file: Mutex::new(file.ok()),
    }))?;
    log::set_max_level(level);

    if let Some(e) = file_error {
        log::warn!("Could not open {}: {}", log_file.display(), e);
    }
    Ok(())
}

/// Changes the level after startup, e.g. once the config is loaded.
pub fn set_level(level: LevelFilter) {
    log::set_max_level(level);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    #[test]
    fn test_format_line() {
        let info = format_line(
            &Record::builder()
                .args(format_args!("Capture started"))
                .level(log::Level::Info)
                .build(),
        );
        assert!(info.starts_with('['));
        assert!(info.ends_with("] Capture started\n"));
        // [HH:MM:SS.mmm]
        assert_eq!(info.find(']'), Some(13));

        let warn = format_line(
            &Record::builder()
                .args(format_args!("attach refused"))
                .level(log::Level::Warn)
                .build(),
        );
        assert!(warn.ends_with("] WARN attach refused\n"));
    }

    #[test]
    fn test_file_sink_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.log");
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .unwrap();
        let logger = Logger {
            file: Mutex::new(Some(file)),
        };

        log::set_max_level(LevelFilter::Trace);
        for msg in ["first", "second"] {
            logger.log(
                &Record::builder()
                    .args(format_args!("{}", msg))
                    .level(log::Level::Error)
                    .build(),
            );
        }
        logger.flush();

        let mut contents = String::new();
        File::open(&path)
            .unwrap()
            .read_to_string(&mut contents)
            .unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("ERROR first"));
        assert!(lines[1].ends_with("ERROR second"));
    }
}
