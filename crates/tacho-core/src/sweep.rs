use crate::hal::FanIO;
use crate::hal_sim::RPM_PER_DUTY_PERCENT;
use crate::validation::{ValidationParams, ValidationResult, Validator};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Expected RPM per PWM value.
pub type ExpectedRpmMap = BTreeMap<i32, i32>;

/// Linear nameplate expectations every 10% from 0 to 100.
pub fn nameplate_map() -> ExpectedRpmMap {
    (0..=100)
        .step_by(10)
        .map(|pwm| (pwm, pwm * RPM_PER_DUTY_PERCENT))
        .collect()
}

#[derive(Debug, Error)]
pub enum SweepError {
    #[error("PWM step must be positive, got {step}")]
    InvalidStep { step: i32 },
    #[error("result sink failed: {0}")]
    Sink(#[from] std::io::Error),
}

/// Inclusive PWM range walked in `step` increments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepRange {
    pub min: i32,
    pub max: i32,
    pub step: i32,
}

impl SweepRange {
    pub fn new(min: i32, max: i32, step: i32) -> Result<Self, SweepError> {
        if step <= 0 {
            return Err(SweepError::InvalidStep { step });
        }
        Ok(Self { min, max, step })
    }

    /// PWM values in sweep order. Empty when `min > max`.
    pub fn values(&self) -> impl Iterator<Item = i32> {
        (self.min..=self.max).step_by(self.step.max(1) as usize)
    }
}

/// Receives one record per swept point, in sweep order.
pub trait ResultSink {
    fn record(&mut self, result: &ValidationResult) -> std::io::Result<()>;
}

impl ResultSink for Vec<ValidationResult> {
    fn record(&mut self, result: &ValidationResult) -> std::io::Result<()> {
        self.push(result.clone());
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SweepReport {
    pub failures: usize,
    /// One entry per swept PWM value, in sweep order.
    pub results: Vec<ValidationResult>,
}

impl SweepReport {
    pub fn get(&self, pwm_value: i32) -> Option<&ValidationResult> {
        self.results.iter().find(|r| r.pwm_value == pwm_value)
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

impl<IO: FanIO> Validator<IO> {
    /// Validate every PWM value of `range`.
    ///
    /// A PWM value missing from `expected` is recorded as a FAIL without
    /// touching the device; the sweep always carries on. Only a sink I/O
    /// error stops it early.
    pub fn run_sweep(
        &mut self,
        range: SweepRange,
        expected: &ExpectedRpmMap,
        params: &ValidationParams,
        sink: &mut dyn ResultSink,
    ) -> Result<SweepReport, SweepError> {
        if range.step <= 0 {
            return Err(SweepError::InvalidStep { step: range.step });
        }

        info!(
            "PWM-Tachometer validation sweep: {}..={} step {}",
            range.min, range.max, range.step
        );

        let mut report = SweepReport::default();
        for pwm in range.values() {
            let result = match expected.get(&pwm) {
                Some(&rpm) => self.validate(pwm, Some(rpm), params),
                None => {
                    warn!("No expected RPM defined for PWM {pwm}");
                    ValidationResult::unmeasured(
                        pwm,
                        None,
                        format!("No expected RPM defined for PWM {pwm}"),
                    )
                }
            };

            if !result.passed() {
                report.failures += 1;
            }
            sink.record(&result)?;
            report.results.push(result);
        }

        info!("Test complete: {} failures", report.failures);
        Ok(report)
    }
}
