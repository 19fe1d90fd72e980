use std::path::PathBuf;
use std::process::Command;
use tempfile::NamedTempFile;

use super::setup::{find_tessdata_dir, find_tesseract_executable};
use super::{Point, RecognitionError, TextRecognizer, TextRecord};
use crate::capture::Bitmap;
use crate::config::OcrConfig;

/// Runs the Tesseract CLI with TSV output.
#[derive(Clone, Debug)]
pub struct TesseractRecognizer {
    executable: PathBuf,
    tessdata: Option<PathBuf>,
    language: String,
    min_confidence: f32,
}

impl TesseractRecognizer {
    pub fn new(executable: PathBuf, language: &str, min_confidence: f32) -> Self {
        let tessdata = find_tessdata_dir(&executable);
        Self {
            executable,
            tessdata,
            language: language.to_string(),
            min_confidence,
        }
    }

    /// Locates Tesseract as configured.
    pub fn from_config(config: &OcrConfig) -> Result<Self, RecognitionError> {
        let executable = find_tesseract_executable(config.tesseract_path.as_deref())
            .ok_or(RecognitionError::ExecutableNotFound)?;
        log::info!("Using tesseract at {}", executable.display());
        Ok(Self::new(executable, &config.language, config.min_confidence))
    }
}

impl TextRecognizer for TesseractRecognizer {
    fn recognize(&self, bitmap: &Bitmap) -> Result<Vec<TextRecord>, RecognitionError> {
        let temp_input = NamedTempFile::with_suffix(".png")?;
        bitmap.as_image().save(temp_input.path())?;

        // Tesseract appends .tsv to the output base
        let temp_output = NamedTempFile::new()?;
        let output_base = temp_output.path().to_string_lossy().to_string();

        let mut command = Command::new(&self.executable);
        command.arg(temp_input.path()).arg(&output_base);
        if let Some(tessdata) = &self.tessdata {
            command.arg("--tessdata-dir").arg(tessdata);
        }
        let output = command.arg("-l").arg(&self.language).arg("tsv").output()?;

        if !output.status.success() {
            return Err(RecognitionError::Failed {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let tsv_path = format!("{}.tsv", output_base);
        let tsv = std::fs::read_to_string(&tsv_path);
        let _ = std::fs::remove_file(&tsv_path);

        let records = parse_tsv(&tsv?, self.min_confidence);
        log::info!(
            "Recognised {} word(s) above confidence {:.2}",
            records.len(),
            self.min_confidence
        );
        Ok(records)
    }
}

/// Parses Tesseract TSV into word records whose confidence exceeds
/// `min_confidence` (0.0-1.0).
pub fn parse_tsv(tsv: &str, min_confidence: f32) -> Vec<TextRecord> {
    let mut records = Vec::new();

    for line in tsv.lines().skip(1) {
        // level, page_num, block_num, par_num, line_num, word_num,
        // left, top, width, height, conf, text
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < 12 {
            continue;
        }

        // Level 5 = word
        if fields[0].parse::<i32>().ok() != Some(5) {
            continue;
        }
        let text = fields[11].trim();
        if text.is_empty() {
            continue;
        }

        let parse = |i: usize| fields[i].trim().parse::<i32>().ok();
        let (Some(left), Some(top), Some(width), Some(height)) =
            (parse(6), parse(7), parse(8), parse(9))
        else {
            continue;
        };
        let Ok(conf) = fields[10].trim().parse::<f32>() else {
            continue;
        };

        let confidence = conf / 100.0;
        if confidence <= min_confidence {
            continue;
        }

        let (right, bottom) = (left + width, top + height);
        records.push(TextRecord {
            text: text.to_string(),
            confidence,
            polygon: [
                Point { x: left, y: top },
                Point { x: right, y: top },
                Point { x: right, y: bottom },
                Point { x: left, y: bottom },
            ],
        });
    }

    records
}

#[cfg(test)]
mod tests {
    use super::*;

    const TSV: &str = "level\tpage_num\tblock_num\tpar_num\tline_num\tword_num\tleft\ttop\twidth\theight\tconf\ttext
1\t1\t0\t0\t0\t0\t0\t0\t400\t300\t-1\t
4\t1\t1\t1\t1\t0\t10\t20\t200\t30\t-1\t
5\t1\t1\t1\t1\t1\t10\t20\t80\t30\t96.5\tHello
5\t1\t1\t1\t1\t2\t100\t20\t110\t30\t42.0\tw0rld
5\t1\t1\t1\t1\t3\t220\t20\t10\t30\t95.0\t
5\t1\t1\t1\t2\t1\t10\t60\t60\t28\t81.2\tSecond
";

    #[test]
    fn test_parse_keeps_confident_words() {
        let records = parse_tsv(TSV, 0.8);

        let texts: Vec<&str> = records.iter().map(|r| r.text.as_str()).collect();
        assert_eq!(texts, vec!["Hello", "Second"]);
        assert!((records[0].confidence - 0.965).abs() < 1e-6);
    }

    #[test]
    fn test_polygon_is_clockwise_from_top_left() {
        let records = parse_tsv(TSV, 0.0);
        let hello = &records[0];
        assert_eq!(
            hello.polygon,
            [
                Point { x: 10, y: 20 },
                Point { x: 90, y: 20 },
                Point { x: 90, y: 50 },
                Point { x: 10, y: 50 },
            ]
        );
    }

    #[test]
    fn test_threshold_is_exclusive() {
        let tsv = "header\n5\t1\t1\t1\t1\t1\t0\t0\t5\t5\t80\texact\n";
        assert!(parse_tsv(tsv, 0.8).is_empty());
        assert_eq!(parse_tsv(tsv, 0.79).len(), 1);
    }

    #[test]
    fn test_malformed_rows_are_skipped() {
        let tsv = "header\n5\t1\t1\n5\t1\t1\t1\t1\t1\tx\t0\t5\t5\t90\tbad\n";
        assert!(parse_tsv(tsv, 0.0).is_empty());
    }
}
