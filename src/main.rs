//! Window Capture Tool
//!
//! Captures the contents of another process's top-level window, including
//! minimized, occluded and GPU-composited ones, by escalating from a
//! background capture to basic and then forced window activation.

mod capture;
mod cli;
mod commands;
mod config;
mod logging;
mod ocr;
mod paths;
mod platform;

use anyhow::Result;
use log::LevelFilter;
use std::path::PathBuf;

fn main() -> Result<()> {
    // Log panics to the log file as well as stderr
    std::panic::set_hook(Box::new(|panic_info| {
        let msg = if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };
        let location = panic_info
            .location()
            .map(|loc| format!(" at {}:{}:{}", loc.file(), loc.line(), loc.column()))
            .unwrap_or_default();
        eprintln!("[PANIC]{} {}", location, msg);
        log::error!("[PANIC]{} {}", location, msg);
    }));

    let matches = cli::build_cli().get_matches();
    let verbose = matches.get_flag("verbose");

    let _ = std::fs::create_dir_all(paths::get_logs_dir());
    let startup_level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    if let Err(e) = logging::init(&paths::get_log_file(), startup_level) {
        eprintln!("Failed to initialise logging: {}", e);
    }

    let config = config::load_config(matches.get_one::<PathBuf>("config").map(PathBuf::as_path));
    let level = if verbose {
        config.level_filter().max(LevelFilter::Debug)
    } else {
        config.level_filter()
    };
    logging::set_level(level);

    let captures_dir = paths::get_captures_dir(config.output_dir.as_deref());
    paths::ensure_directories(&captures_dir)?;

    let result = commands::run_command(&matches, &config, &captures_dir);
    if let Err(e) = &result {
        log::error!("{:#}", e);
    }
    result
}
