use crate::runtime::config::RuntimeConfig;
use crate::runtime::logging::init_tracing;
use std::path::PathBuf;
use std::process::ExitCode;
use tacho_core::{nameplate_map, FaultError, SimulatedFan, SweepError, Validator};
use tacho_io::result_log::DEFAULT_PREFIX;
use tacho_io::{
    load_expected_map, CsvResultLog, ExpectedMapError, FanOut, JsonlReport, ResultLogError,
};
use thiserror::Error;
use tracing::{error, info};

const EXIT_CONFIG_ERROR: u8 = 2;

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Fault(#[from] FaultError),
    #[error(transparent)]
    Sweep(#[from] SweepError),
    #[error(transparent)]
    ResultLog(#[from] ResultLogError),
    #[error(transparent)]
    ExpectedMap(#[from] ExpectedMapError),
    #[error("failed to write report {path}: {source}")]
    Report {
        path: PathBuf,
        source: std::io::Error,
    },
}

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub failures: usize,
    pub points: usize,
    pub csv_path: PathBuf,
}

pub fn run_from_args() -> ExitCode {
    let config = match RuntimeConfig::from_args(std::env::args_os()) {
        Ok(config) => config,
        Err(e) => e.exit(),
    };
    let _log_guard = init_tracing(config.json_logs, &config.log_dir);

    match run(&config) {
        Ok(summary) => {
            info!(
                points = summary.points,
                failures = summary.failures,
                "Validation sweep finished"
            );
            // Test failures are results, not process errors.
            println!(
                "Test complete: {} failures. Results saved to {}",
                summary.failures,
                summary.csv_path.display()
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "Validation sweep aborted");
            eprintln!("error: {e}");
            ExitCode::from(EXIT_CONFIG_ERROR)
        }
    }
}

pub fn run(config: &RuntimeConfig) -> Result<RunSummary, AppError> {
    let range = config.sweep_range()?;
    let expected = match &config.expected_map {
        Some(path) => {
            info!(path = %path.display(), "Loading expected RPM map");
            load_expected_map(path)?
        }
        None => nameplate_map(),
    };

    let mut fan = match config.seed {
        Some(seed) => SimulatedFan::with_seed(seed),
        None => SimulatedFan::new(),
    };
    apply_faults(&mut fan, config)?;

    let mut csv = CsvResultLog::create_timestamped(&config.csv_dir, DEFAULT_PREFIX)?;
    let mut report = match &config.report {
        Some(path) => Some(JsonlReport::new(path).map_err(|source| AppError::Report {
            path: path.clone(),
            source,
        })?),
        None => None,
    };

    info!(
        pwm_min = range.min,
        pwm_max = range.max,
        pwm_step = range.step,
        tolerance = config.tolerance,
        stabilization_s = config.stabilization,
        samples = config.samples,
        faults = ?fan.faults(),
        "Starting validation sweep"
    );

    let mut validator = Validator::new(fan, config.validation_config());
    let sweep = {
        let mut sinks = FanOut::new();
        sinks.push(&mut csv);
        if let Some(report) = report.as_mut() {
            sinks.push(report);
        }
        validator.run_sweep(range, &expected, &config.validation_params(), &mut sinks)?
    };

    if let (Some(report), Some(path)) = (report.as_mut(), config.report.as_ref()) {
        report.finish(&sweep).map_err(|source| AppError::Report {
            path: path.clone(),
            source,
        })?;
    }

    Ok(RunSummary {
        failures: sweep.failures,
        points: sweep.len(),
        csv_path: csv.path().to_path_buf(),
    })
}

/// Start from a clean fan and switch on the faults requested on the command line.
fn apply_faults(fan: &mut SimulatedFan, config: &RuntimeConfig) -> Result<(), FaultError> {
    fan.reset_all_faults();
    if config.fan_stall_enabled() {
        fan.simulate_fan_stall(true);
    }
    if config.fan_degradation != 0.0 {
        fan.simulate_fan_degradation(config.fan_degradation)?;
    }
    if config.disconnected_tacho_enabled() {
        fan.simulate_disconnected_tacho(true);
    }
    if config.disconnected_pwm_enabled() {
        fan.simulate_disconnected_pwm(true);
    }
    if config.noise != 0.0 {
        fan.set_tacho_noise_level(config.noise)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn fast_config(dir: &std::path::Path, extra: &[&str]) -> RuntimeConfig {
        let csv_dir = dir.join("csv");
        let mut args = vec![
            "tacho-hil".to_string(),
            "--stabilization".to_string(),
            "0".to_string(),
            "--sample-interval-ms".to_string(),
            "0".to_string(),
            "--seed".to_string(),
            "9".to_string(),
            "--csv-dir".to_string(),
            csv_dir.display().to_string(),
        ];
        args.extend(extra.iter().map(|s| s.to_string()));
        RuntimeConfig::from_args(args).unwrap()
    }

    #[test]
    fn clean_run_has_no_failures() {
        let dir = tempdir().unwrap();
        let summary = run(&fast_config(dir.path(), &[])).unwrap();

        assert_eq!(summary.failures, 0);
        assert_eq!(summary.points, 6);
        let csv = std::fs::read_to_string(&summary.csv_path).unwrap();
        assert_eq!(csv.lines().count(), 7);
        assert!(csv.lines().nth(1).unwrap().starts_with("0,0,0,PASS"));
    }

    #[test]
    fn stalled_fan_fails_every_spinning_point() {
        let dir = tempdir().unwrap();
        let summary = run(&fast_config(dir.path(), &["--fan-stall"])).unwrap();
        assert_eq!(summary.failures, 5);
    }

    #[test]
    fn disconnected_pwm_leaves_fan_stopped() {
        let dir = tempdir().unwrap();
        let summary = run(&fast_config(dir.path(), &["--disconnected-pwm"])).unwrap();
        assert_eq!(summary.failures, 5);
    }

    #[test]
    fn heavy_degradation_fails_tolerance() {
        let dir = tempdir().unwrap();
        let summary = run(&fast_config(dir.path(), &["--fan-degradation", "0.3"])).unwrap();
        assert_eq!(summary.failures, 5);
    }

    #[test]
    fn invalid_degradation_aborts_before_logging() {
        let dir = tempdir().unwrap();
        let err = run(&fast_config(dir.path(), &["--fan-degradation", "1.5"])).unwrap_err();
        assert!(matches!(err, AppError::Fault(FaultError::InvalidArgument { .. })));
        assert!(!dir.path().join("csv").exists());
    }

    #[test]
    fn negative_noise_is_rejected() {
        let dir = tempdir().unwrap();
        let err = run(&fast_config(dir.path(), &["--noise", "-0.1"])).unwrap_err();
        assert!(matches!(err, AppError::Fault(_)));
    }

    #[test]
    fn zero_step_is_a_config_error() {
        let dir = tempdir().unwrap();
        let err = run(&fast_config(dir.path(), &["--pwm-step", "0"])).unwrap_err();
        assert!(matches!(err, AppError::Sweep(SweepError::InvalidStep { step: 0 })));
    }

    #[test]
    fn custom_map_and_report() {
        let dir = tempdir().unwrap();
        let map_path = dir.path().join("map.json");
        std::fs::write(&map_path, r#"{"20": 800, "40": 1600}"#).unwrap();
        let report_path = dir.path().join("report.jsonl");

        let summary = run(&fast_config(
            dir.path(),
            &[
                "--pwm-min",
                "20",
                "--pwm-max",
                "60",
                "--expected-map",
                map_path.to_str().unwrap(),
                "--report",
                report_path.to_str().unwrap(),
            ],
        ))
        .unwrap();

        // PWM 60 has no expectation in the map.
        assert_eq!(summary.points, 3);
        assert_eq!(summary.failures, 1);

        let report = std::fs::read_to_string(&report_path).unwrap();
        let lines: Vec<&str> = report.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[2].contains("No expected RPM defined for PWM 60"));
        assert!(lines[3].contains("\"kind\":\"summary\""));
    }
}
