//! CSV result log, one row per swept PWM point.

use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tacho_core::{ResultSink, ValidationResult};
use thiserror::Error;
use tracing::{debug, info};

pub const CSV_HEADER: &str = "pwm,expected_rpm,measured_rpm,result";
pub const DEFAULT_PREFIX: &str = "tacho_test";

#[derive(Debug, Error)]
pub enum ResultLogError {
    #[error("failed to create result log directory {path}: {source}")]
    CreateDir { path: PathBuf, source: io::Error },
    #[error("failed to create result log {path}: {source}")]
    CreateFile { path: PathBuf, source: io::Error },
}

pub struct CsvResultLog {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl CsvResultLog {
    /// Create `<dir>/<prefix>_<YYYY-MM-DD_HH-MM-SS>.csv`. A numeric suffix is
    /// appended if a log with that name already exists.
    pub fn create_timestamped(dir: &Path, prefix: &str) -> Result<Self, ResultLogError> {
        std::fs::create_dir_all(dir).map_err(|source| ResultLogError::CreateDir {
            path: dir.to_path_buf(),
            source,
        })?;

        let stamp = chrono::Local::now().format("%Y-%m-%d_%H-%M-%S").to_string();
        let mut attempt = 0u32;
        loop {
            let name = if attempt == 0 {
                format!("{prefix}_{stamp}.csv")
            } else {
                format!("{prefix}_{stamp}_{attempt}.csv")
            };
            let path = dir.join(name);
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(file) => return Self::with_file(path, file),
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => attempt += 1,
                Err(source) => return Err(ResultLogError::CreateFile { path, source }),
            }
        }
    }

    /// Create (or truncate) a log at an explicit path.
    pub fn create(path: &Path) -> Result<Self, ResultLogError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| ResultLogError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let file = File::create(path).map_err(|source| ResultLogError::CreateFile {
            path: path.to_path_buf(),
            source,
        })?;
        Self::with_file(path.to_path_buf(), file)
    }

    fn with_file(path: PathBuf, file: File) -> Result<Self, ResultLogError> {
        let mut writer = BufWriter::new(file);
        writeln!(writer, "{CSV_HEADER}")
            .and_then(|_| writer.flush())
            .map_err(|source| ResultLogError::CreateFile {
                path: path.clone(),
                source,
            })?;
        info!(path = %path.display(), "Result log created");
        Ok(Self { path, writer })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ResultSink for CsvResultLog {
    fn record(&mut self, result: &ValidationResult) -> io::Result<()> {
        let row = format_row(result);
        debug!(row = %row, "Result log row");
        writeln!(self.writer, "{row}")?;
        self.writer.flush()
    }
}

/// `pwm,expected_rpm,measured_rpm,result`, absent values left empty.
pub fn format_row(result: &ValidationResult) -> String {
    format!(
        "{},{},{},{}",
        result.pwm_value,
        opt(result.expected_rpm),
        opt(result.measured_rpm),
        result.outcome
    )
}

fn opt(value: Option<i32>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// Forwards every record to each inner sink in order.
#[derive(Default)]
pub struct FanOut<'a> {
    sinks: Vec<&'a mut dyn ResultSink>,
}

impl<'a> FanOut<'a> {
    pub fn new() -> Self {
        Self { sinks: Vec::new() }
    }

    pub fn push(&mut self, sink: &'a mut dyn ResultSink) {
        self.sinks.push(sink);
    }
}

impl ResultSink for FanOut<'_> {
    fn record(&mut self, result: &ValidationResult) -> io::Result<()> {
        for sink in self.sinks.iter_mut() {
            sink.record(result)?;
        }
        Ok(())
    }
}
