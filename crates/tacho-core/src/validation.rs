use crate::hal::FanIO;
use crate::hal_sim::MIN_SPIN_DUTY;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::thread;
use std::time::Duration;

/// A commanded fan reading below this RPM is treated as a stall.
pub const STALL_RPM_THRESHOLD: i32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Outcome {
    Pass,
    Fail,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Pass => f.write_str("PASS"),
            Outcome::Fail => f.write_str("FAIL"),
        }
    }
}

/// Verdict for one PWM operating point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub outcome: Outcome,
    pub error_messages: Vec<String>,
    pub pwm_value: i32,
    /// `None` when the point was rejected before touching the device.
    pub measured_rpm: Option<i32>,
    pub expected_rpm: Option<i32>,
}

impl ValidationResult {
    /// A FAIL that never reached the device.
    pub fn unmeasured(pwm_value: i32, expected_rpm: Option<i32>, message: impl Into<String>) -> Self {
        Self {
            outcome: Outcome::Fail,
            error_messages: vec![message.into()],
            pwm_value,
            measured_rpm: None,
            expected_rpm,
        }
    }

    pub fn passed(&self) -> bool {
        self.outcome == Outcome::Pass
    }
}

/// Per-point test parameters shared by every point of a sweep.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValidationParams {
    pub tolerance_percent: f64,
    pub stabilization_time_s: f64,
    pub samples: u32,
}

impl Default for ValidationParams {
    fn default() -> Self {
        Self {
            tolerance_percent: 10.0,
            stabilization_time_s: 1.0,
            samples: 3,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ValidationConfig {
    pub pwm_channel: u8,
    pub tacho_channel: u8,
    pub sample_interval: Duration,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            pwm_channel: 0,
            tacho_channel: 0,
            sample_interval: Duration::from_millis(100),
        }
    }
}

/// Drives a fan through validation points. Sweeps live in `sweep.rs`.
pub struct Validator<IO: FanIO> {
    pub(crate) io: IO,
    pub(crate) config: ValidationConfig,
}

impl<IO: FanIO> Validator<IO> {
    pub fn new(io: IO, config: ValidationConfig) -> Self {
        Self { io, config }
    }

    pub fn io(&self) -> &IO {
        &self.io
    }

    pub fn io_mut(&mut self) -> &mut IO {
        &mut self.io
    }

    pub fn into_inner(self) -> IO {
        self.io
    }

    /// Set `pwm_value`, let the fan settle, average the tachometer and judge
    /// the result. A FAIL is a normal return value.
    pub fn validate(
        &mut self,
        pwm_value: i32,
        expected_rpm: Option<i32>,
        params: &ValidationParams,
    ) -> ValidationResult {
        let (expected, settle) = match check_params(pwm_value, expected_rpm, params) {
            Ok(checked) => checked,
            Err(message) => {
                info!("Rejected PWM {pwm_value}: {message}");
                return ValidationResult::unmeasured(pwm_value, expected_rpm, message);
            }
        };

        self.io.set_duty_cycle(self.config.pwm_channel, pwm_value);

        debug!("Waiting {:?} for fan speed to stabilize", settle);
        thread::sleep(settle);

        let measured_rpm = self.sample_average(params.samples);

        let mut outcome = Outcome::Pass;
        let mut error_messages = Vec::new();

        if pwm_value >= MIN_SPIN_DUTY && measured_rpm < STALL_RPM_THRESHOLD {
            outcome = Outcome::Fail;
            error_messages.push(format!("Fan stall detected at PWM {pwm_value}%"));
        }

        // Authoritative over the stall check when it runs.
        if expected > 0 {
            let deviation = f64::from(measured_rpm - expected) / f64::from(expected) * 100.0;
            if deviation.abs() <= params.tolerance_percent {
                outcome = Outcome::Pass;
            } else {
                outcome = Outcome::Fail;
                error_messages.push(format!(
                    "RPM deviation {deviation:.1}% exceeds tolerance {}%",
                    params.tolerance_percent
                ));
            }
        }

        info!(
            "Result: {outcome}, PWM: {pwm_value}%, Measured RPM: {measured_rpm}, Expected RPM: {expected}"
        );

        ValidationResult {
            outcome,
            error_messages,
            pwm_value,
            measured_rpm: Some(measured_rpm),
            expected_rpm: Some(expected),
        }
    }

    fn sample_average(&mut self, samples: u32) -> i32 {
        let mut total: i64 = 0;
        for _ in 0..samples {
            total += i64::from(self.io.read_rpm(self.config.tacho_channel));
            if !self.config.sample_interval.is_zero() {
                thread::sleep(self.config.sample_interval);
            }
        }
        // Readings are non-negative, so integer division truncates the mean.
        (total / i64::from(samples.max(1))) as i32
    }
}

fn check_params(
    pwm_value: i32,
    expected_rpm: Option<i32>,
    params: &ValidationParams,
) -> Result<(i32, Duration), &'static str> {
    if !(0..=100).contains(&pwm_value) {
        return Err("Invalid PWM value");
    }
    let expected = match expected_rpm {
        Some(rpm) if rpm >= 0 => rpm,
        _ => return Err("Invalid expected RPM"),
    };
    if !(0.0..=100.0).contains(&params.tolerance_percent) {
        return Err("Invalid tolerance percentage");
    }
    let settle = if params.stabilization_time_s >= 0.0 {
        Duration::try_from_secs_f64(params.stabilization_time_s)
            .map_err(|_| "Invalid stabilization time")?
    } else {
        return Err("Invalid stabilization time");
    };
    if params.samples < 1 {
        return Err("Invalid number of samples");
    }
    Ok((expected, settle))
}
