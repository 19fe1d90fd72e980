//! Command handlers: platform wiring, persistence and console output.

use anyhow::{Context, Result, anyhow, bail};
use chrono::{DateTime, Local};
use clap::ArgMatches;
use std::fs;
use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use crate::capture::{
    AutoCapture, AutoCaptureEvent, Bitmap, CaptureMethod, CaptureOrchestrator, CaptureReport,
    WindowId,
};
use crate::cli::Target;
use crate::config::{CaptureConfig, OcrConfig};
use crate::ocr::{TesseractRecognizer, TextRecognizer, TextRecord, annotate};
use crate::platform::{WindowLocator, WindowSystem};

struct Platform {
    system: Arc<dyn WindowSystem>,
    locator: Box<dyn WindowLocator>,
}

#[cfg(windows)]
fn platform() -> Result<Platform> {
    use crate::platform::win32::{Win32WindowLocator, Win32WindowSystem, enable_dpi_awareness};

    enable_dpi_awareness();
    Ok(Platform {
        system: Arc::new(Win32WindowSystem::new()),
        locator: Box::new(Win32WindowLocator),
    })
}

#[cfg(not(windows))]
fn platform() -> Result<Platform> {
    bail!("window capture is only supported on Windows")
}

pub fn run_command(matches: &ArgMatches, config: &CaptureConfig, captures_dir: &Path) -> Result<()> {
    let platform = platform()?;

    match matches.subcommand() {
        Some(("list", sub)) => handle_list(&platform, sub),
        Some(("capture", sub)) => handle_capture(&platform, sub, config, captures_dir),
        Some(("watch", sub)) => handle_watch(&platform, sub, config, captures_dir),
        _ => bail!("unknown command"),
    }
}

fn handle_list(platform: &Platform, matches: &ArgMatches) -> Result<()> {
    let keyword = matches
        .get_one::<String>("keyword")
        .ok_or_else(|| anyhow!("missing keyword"))?;
    let records = platform.locator.find(keyword);

    if matches.get_flag("json") {
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }

    if records.is_empty() {
        println!("No windows match \"{}\"", keyword);
        return Ok(());
    }
    println!("{:>8}  {:<12}  {:<28}  TITLE", "PID", "HANDLE", "PROCESS");
    for r in &records {
        println!(
            "{:>8}  {:<12}  {:<28}  {}",
            r.process_id,
            r.window.to_string(),
            r.process_name,
            r.window_title
        );
    }
    Ok(())
}

fn resolve_target(platform: &Platform, matches: &ArgMatches) -> Result<WindowId> {
    match Target::from_matches(matches) {
        Some(Target::Window(window)) => Ok(window),
        Some(Target::Find(keyword)) => {
            let records = platform.locator.find(&keyword);
            let first = records
                .first()
                .ok_or_else(|| anyhow!("No visible window matches \"{}\"", keyword))?;
            if records.len() > 1 {
                log::warn!(
                    "{} windows match \"{}\"; using the first",
                    records.len(),
                    keyword
                );
            }
            log::info!(
                "Target: {} \"{}\" ({}, pid {})",
                first.window,
                first.window_title,
                first.process_name,
                first.process_id
            );
            Ok(first.window)
        }
        None => bail!("either --window or --find is required"),
    }
}

fn method(matches: &ArgMatches, config: &CaptureConfig) -> CaptureMethod {
    matches
        .get_one::<CaptureMethod>("method")
        .copied()
        .unwrap_or(config.default_method)
}

/// A missing Tesseract disables recognition; captures are still saved.
fn optional_recognizer(wanted: bool, config: &OcrConfig) -> Option<TesseractRecognizer> {
    if !wanted {
        return None;
    }
    match TesseractRecognizer::from_config(config) {
        Ok(recognizer) => Some(recognizer),
        Err(e) => {
            log::warn!("Text recognition disabled: {}", e);
            None
        }
    }
}

fn recognizer(matches: &ArgMatches, config: &CaptureConfig) -> Option<TesseractRecognizer> {
    optional_recognizer(matches.get_flag("ocr") || config.ocr.enabled, &config.ocr)
}

/// `<process>_<pid>` when the owning process is known, else `window_<handle>`.
fn capture_prefix(platform: &Platform, window: WindowId) -> String {
    let described = platform
        .locator
        .describe(window)
        .filter(|r| !r.process_name.is_empty());
    match described {
        Some(record) => {
            let stem = Path::new(&record.process_name)
                .file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_else(|| record.process_name.clone());
            format!("{}_{}", sanitize_file_part(&stem), record.process_id)
        }
        None => format!("window_{}", window),
    }
}

fn handle_capture(
    platform: &Platform,
    matches: &ArgMatches,
    config: &CaptureConfig,
    captures_dir: &Path,
) -> Result<()> {
    let window = resolve_target(platform, matches)?;
    let method = method(matches, config);
    let recognizer = recognizer(matches, config);

    let orchestrator = CaptureOrchestrator::new(platform.system.clone(), config.capture_settings());
    let report = orchestrator.capture(window, method);
    print_report(&report);

    let bitmap = match report.outcome {
        Ok(bitmap) => bitmap,
        Err(e) => bail!("capture failed ({}): {}", e.kind(), e),
    };

    let path = match matches.get_one::<PathBuf>("output") {
        Some(path) => path.clone(),
        None => {
            let prefix = capture_prefix(platform, window);
            unique_capture_path(captures_dir, &prefix, Local::now())
        }
    };
    let records = persist_capture(
        &bitmap,
        &path,
        recognizer.as_ref().map(|r| r as &dyn TextRecognizer),
    )?;
    println!("Saved {}", path.display());
    for record in &records {
        println!("  {:.2}  {}", record.confidence, record.text);
    }
    Ok(())
}

fn handle_watch(
    platform: &Platform,
    matches: &ArgMatches,
    config: &CaptureConfig,
    captures_dir: &Path,
) -> Result<()> {
    let window = resolve_target(platform, matches)?;
    let method = method(matches, config);
    let recognizer = recognizer(matches, config);
    let prefix = capture_prefix(platform, window);

    let mut settings = config.auto_capture_settings();
    if let Some(secs) = matches.get_one::<u64>("interval") {
        settings.interval = Duration::from_secs(*secs);
    }

    let orchestrator = Arc::new(CaptureOrchestrator::new(
        platform.system.clone(),
        config.capture_settings(),
    ));
    let dir = captures_dir.to_path_buf();

    let auto = AutoCapture::start(orchestrator, window, method, settings, move |event| {
        on_watch_event(
            event,
            &dir,
            &prefix,
            recognizer.as_ref().map(|r| r as &dyn TextRecognizer),
        )
    })
    .context("Failed to start auto-capture thread")?;

    println!("Capturing {} every {}s. Press Enter to stop.", window, settings.interval.as_secs());

    let (enter_tx, enter_rx) = mpsc::channel();
    thread::spawn(move || {
        let mut line = String::new();
        let _ = std::io::stdin().lock().read_line(&mut line);
        let _ = enter_tx.send(());
    });

    loop {
        match enter_rx.recv_timeout(Duration::from_millis(200)) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
            Err(RecvTimeoutError::Timeout) if auto.is_finished() => break,
            Err(RecvTimeoutError::Timeout) => {}
        }
    }

    if !auto.stop(config.stop_timeout()) {
        log::warn!("Auto-capture thread still busy; exiting without it");
    }
    Ok(())
}

fn on_watch_event(
    event: AutoCaptureEvent,
    dir: &Path,
    prefix: &str,
    recognizer: Option<&dyn TextRecognizer>,
) {
    match event {
        AutoCaptureEvent::Captured { cycle, report } => {
            let Ok(bitmap) = &report.outcome else {
                return;
            };
            let path = unique_capture_path(dir, prefix, Local::now());
            match persist_capture(bitmap, &path, recognizer) {
                Ok(records) if records.is_empty() => {
                    println!("[{}] saved {}", cycle, path.display())
                }
                Ok(records) => println!(
                    "[{}] saved {} ({} word(s))",
                    cycle,
                    path.display(),
                    records.len()
                ),
                Err(e) => log::error!("Cycle {}: {:#}", cycle, e),
            }
        }
        AutoCaptureEvent::Failed { cycle, report } => {
            println!("[{}] {}", cycle, report.summary());
        }
        AutoCaptureEvent::WindowLost { cycle } => {
            println!("[{}] window closed; stopping", cycle);
        }
    }
}

fn print_report(report: &CaptureReport) {
    println!("{}", report.summary());
    for timing in &report.stages {
        let result = match &timing.error {
            None => "ok".to_string(),
            Some(e) => e.kind().to_string(),
        };
        println!(
            "  {:<34} {:>8.3}s  {}",
            timing.stage.to_string(),
            timing.elapsed.as_secs_f64(),
            result
        );
    }
}

fn sanitize_file_part(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// `<prefix>_YYYYMMDD_HHMMSS_mmm.png` in `dir`, with `_N` appended when the
/// name is already taken.
fn unique_capture_path(dir: &Path, prefix: &str, now: DateTime<Local>) -> PathBuf {
    let base = format!("{}_{}", prefix, now.format("%Y%m%d_%H%M%S_%3f"));
    let mut path = dir.join(format!("{}.png", base));
    let mut n = 1;
    while path.exists() {
        path = dir.join(format!("{}_{}.png", base, n));
        n += 1;
    }
    path
}

fn records_path(image_path: &Path) -> PathBuf {
    image_path.with_extension("json")
}

/// `<stem>_ocr<N>.png` next to the capture.
fn annotated_path(image_path: &Path, count: usize) -> PathBuf {
    let stem = image_path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "capture".to_string());
    image_path.with_file_name(format!("{}_ocr{}.png", stem, count))
}

fn save_capture(bitmap: &Bitmap, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    bitmap
        .as_image()
        .save(path)
        .with_context(|| format!("Failed to save {}", path.display()))?;
    log::info!("Saved {}x{} capture to {}", bitmap.width(), bitmap.height(), path.display());
    Ok(())
}

/// Saves the capture, then runs recognition on it. A recognition failure is
/// logged and leaves the saved image in place.
fn persist_capture(
    bitmap: &Bitmap,
    path: &Path,
    recognizer: Option<&dyn TextRecognizer>,
) -> Result<Vec<TextRecord>> {
    save_capture(bitmap, path)?;

    let Some(recognizer) = recognizer else {
        return Ok(Vec::new());
    };
    match recognize_and_save(recognizer, bitmap, path) {
        Ok(records) => Ok(records),
        Err(e) => {
            log::warn!("{:#}; kept {}", e, path.display());
            Ok(Vec::new())
        }
    }
}

/// Writes the records as JSON next to the image, plus an annotated copy when
/// any words were found.
fn recognize_and_save(
    recognizer: &dyn TextRecognizer,
    bitmap: &Bitmap,
    image_path: &Path,
) -> Result<Vec<TextRecord>> {
    let records = recognizer
        .recognize(bitmap)
        .context("Text recognition failed")?;
    let path = records_path(image_path);
    fs::write(&path, serde_json::to_string_pretty(&records)?)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    log::info!("Wrote {} text record(s) to {}", records.len(), path.display());

    if !records.is_empty() {
        let annotated = annotated_path(image_path, records.len());
        annotate(bitmap, &records)
            .save(&annotated)
            .with_context(|| format!("Failed to save {}", annotated.display()))?;
        log::info!("Saved annotated copy to {}", annotated.display());
    }
    Ok(records)
}
