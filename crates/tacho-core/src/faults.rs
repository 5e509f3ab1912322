use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum FaultError {
    #[error("invalid argument: {name} = {value} (expected {expected})")]
    InvalidArgument {
        name: &'static str,
        value: f64,
        expected: &'static str,
    },
}

/// Active fault injections for one simulated fan.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FaultConfig {
    pub fan_stalled: bool,
    /// Fractional RPM attenuation in `[0, 1]`.
    pub fan_degradation: f64,
    pub tacho_disconnected: bool,
    pub pwm_disconnected: bool,
    /// Gaussian sigma as a fraction of the degraded base RPM.
    pub noise_level: f64,
}

impl FaultConfig {
    /// Baseline with every fault cleared.
    pub const NONE: FaultConfig = FaultConfig {
        fan_stalled: false,
        fan_degradation: 0.0,
        tacho_disconnected: false,
        pwm_disconnected: false,
        noise_level: 0.0,
    };

    pub fn is_clear(&self) -> bool {
        *self == Self::NONE
    }

    /// Tachometer output is forced to zero.
    pub fn blocks_tacho(&self) -> bool {
        self.fan_stalled || self.tacho_disconnected
    }
}

pub(crate) fn check_degradation(level: f64) -> Result<f64, FaultError> {
    // NaN fails both comparisons, so test for the accepted range instead.
    if (0.0..=1.0).contains(&level) {
        Ok(level)
    } else {
        Err(FaultError::InvalidArgument {
            name: "fan_degradation",
            value: level,
            expected: "0.0..=1.0",
        })
    }
}

pub(crate) fn check_noise(level: f64) -> Result<f64, FaultError> {
    if level >= 0.0 && level.is_finite() {
        Ok(level)
    } else {
        Err(FaultError::InvalidArgument {
            name: "noise_level",
            value: level,
            expected: "a finite value >= 0.0",
        })
    }
}
