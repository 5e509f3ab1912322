use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tacho_core::{SweepError, SweepRange, ValidationConfig, ValidationParams};

#[derive(Debug, Clone, Parser)]
#[command(
    name = "tacho-hil",
    version,
    about = "PWM vs tachometer validation sweep with simulated hardware faults",
    after_help = "ENVIRONMENT VARIABLES:\n    RUST_LOG    Set log filter (e.g., RUST_LOG=debug,tacho_core=trace)"
)]
pub struct RuntimeConfig {
    /// Minimum PWM value
    #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
    pub pwm_min: i32,

    /// Maximum PWM value (inclusive)
    #[arg(long, default_value_t = 100, allow_negative_numbers = true)]
    pub pwm_max: i32,

    /// PWM step size
    #[arg(long, default_value_t = 20, allow_negative_numbers = true)]
    pub pwm_step: i32,

    /// RPM tolerance percent
    #[arg(long, default_value_t = 10.0, allow_negative_numbers = true)]
    pub tolerance: f64,

    /// PWM stabilization time in seconds
    #[arg(long, default_value_t = 1.0, allow_negative_numbers = true)]
    pub stabilization: f64,

    /// Number of tachometer samples per PWM value
    #[arg(long, default_value_t = 3)]
    pub samples: u32,

    /// Delay between tachometer samples in milliseconds
    #[arg(long, default_value_t = 100)]
    pub sample_interval_ms: u64,

    /// Enable fan stall fault
    #[arg(long, overrides_with = "no_fan_stall")]
    pub fan_stall: bool,

    /// Disable fan stall fault
    #[arg(long, overrides_with = "fan_stall")]
    pub no_fan_stall: bool,

    /// Fan degradation level (0-1)
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    pub fan_degradation: f64,

    /// Enable disconnected tachometer fault
    #[arg(long, overrides_with = "no_disconnected_tacho")]
    pub disconnected_tacho: bool,

    /// Disable disconnected tachometer fault
    #[arg(long, overrides_with = "disconnected_tacho")]
    pub no_disconnected_tacho: bool,

    /// Enable disconnected PWM fault
    #[arg(long, overrides_with = "no_disconnected_pwm")]
    pub disconnected_pwm: bool,

    /// Disable disconnected PWM fault
    #[arg(long, overrides_with = "disconnected_pwm")]
    pub no_disconnected_pwm: bool,

    /// Tachometer noise level (fraction of RPM)
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    pub noise: f64,

    /// Seed for the noise generator (reproducible runs)
    #[arg(long)]
    pub seed: Option<u64>,

    /// JSON file mapping PWM values to expected RPM [default: nameplate curve]
    #[arg(long, value_name = "PATH")]
    pub expected_map: Option<PathBuf>,

    /// Directory for CSV result logs
    #[arg(long, value_name = "DIR", default_value = "csv_logs")]
    pub csv_dir: PathBuf,

    /// Append a JSONL report of every point to this file
    #[arg(long, value_name = "PATH")]
    pub report: Option<PathBuf>,

    /// Directory for log files
    #[arg(long, value_name = "DIR", default_value = "logs")]
    pub log_dir: PathBuf,

    /// Output console logs in JSON format
    #[arg(long)]
    pub json_logs: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self::parse_from(["tacho-hil"])
    }
}

impl RuntimeConfig {
    pub fn from_args<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        Self::try_parse_from(args)
    }

    pub fn fan_stall_enabled(&self) -> bool {
        self.fan_stall && !self.no_fan_stall
    }

    pub fn disconnected_tacho_enabled(&self) -> bool {
        self.disconnected_tacho && !self.no_disconnected_tacho
    }

    pub fn disconnected_pwm_enabled(&self) -> bool {
        self.disconnected_pwm && !self.no_disconnected_pwm
    }

    pub fn sweep_range(&self) -> Result<SweepRange, SweepError> {
        SweepRange::new(self.pwm_min, self.pwm_max, self.pwm_step)
    }

    pub fn validation_params(&self) -> ValidationParams {
        ValidationParams {
            tolerance_percent: self.tolerance,
            stabilization_time_s: self.stabilization,
            samples: self.samples,
        }
    }

    pub fn validation_config(&self) -> ValidationConfig {
        ValidationConfig {
            sample_interval: Duration::from_millis(self.sample_interval_ms),
            ..Default::default()
        }
    }
}
