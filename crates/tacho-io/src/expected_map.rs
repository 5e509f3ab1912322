//! Expected-RPM maps loaded from JSON, e.g. `{"0": 0, "20": 800}`.

use std::path::{Path, PathBuf};
use tacho_core::ExpectedRpmMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExpectedMapError {
    #[error("failed to read expected RPM map {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("malformed expected RPM map: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("negative expected RPM {rpm} for PWM {pwm}")]
    NegativeRpm { pwm: i32, rpm: i32 },
}

pub fn parse_expected_map(raw: &str) -> Result<ExpectedRpmMap, ExpectedMapError> {
    let map: ExpectedRpmMap = serde_json::from_str(raw)?;
    if let Some((&pwm, &rpm)) = map.iter().find(|(_, &rpm)| rpm < 0) {
        return Err(ExpectedMapError::NegativeRpm { pwm, rpm });
    }
    Ok(map)
}

pub fn load_expected_map(path: &Path) -> Result<ExpectedRpmMap, ExpectedMapError> {
    let raw = std::fs::read_to_string(path).map_err(|source| ExpectedMapError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_expected_map(&raw)
}
