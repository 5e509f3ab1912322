//! JSONL sweep report.
//!
//! One line per validated point, followed by a summary line once the sweep
//! finishes. Unlike the CSV log it keeps the error messages of each point.

use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};
use tacho_core::{Outcome, ResultSink, SweepReport, ValidationResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReportEntry {
    Point {
        pwm: i32,
        expected_rpm: Option<i32>,
        measured_rpm: Option<i32>,
        result: Outcome,
        error_messages: Vec<String>,
    },
    Summary {
        unix_us: u64,
        points: usize,
        failures: usize,
    },
}

impl From<&ValidationResult> for ReportEntry {
    fn from(result: &ValidationResult) -> Self {
        ReportEntry::Point {
            pwm: result.pwm_value,
            expected_rpm: result.expected_rpm,
            measured_rpm: result.measured_rpm,
            result: result.outcome,
            error_messages: result.error_messages.clone(),
        }
    }
}

pub struct JsonlReport {
    writer: BufWriter<File>,
}

impl JsonlReport {
    /// Open `path` in append mode, creating parent directories.
    pub fn new(path: &Path) -> io::Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new().create(true).append(true).open(path)?;

        Ok(Self {
            writer: BufWriter::with_capacity(8192, file),
        })
    }

    pub fn log(&mut self, entry: &ReportEntry) -> io::Result<()> {
        serde_json::to_writer(&mut self.writer, entry)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()
    }

    /// Append the summary line for a finished sweep.
    pub fn finish(&mut self, report: &SweepReport) -> io::Result<()> {
        let unix_us = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_micros() as u64;
        self.log(&ReportEntry::Summary {
            unix_us,
            points: report.len(),
            failures: report.failures,
        })
    }
}

impl ResultSink for JsonlReport {
    fn record(&mut self, result: &ValidationResult) -> io::Result<()> {
        self.log(&ReportEntry::from(result))
    }
}
