use crate::faults::{check_degradation, check_noise, FaultConfig, FaultError};
use crate::hal::FanIO;
use log::{debug, error, info};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};

/// Below this duty cycle the fan does not spin.
pub const MIN_SPIN_DUTY: i32 = 20;
/// Nameplate slope of the simulated fan.
pub const RPM_PER_DUTY_PERCENT: i32 = 40;

/// Ideal RPM for a duty cycle, before any fault is applied.
pub fn nameplate_rpm(duty_cycle: i32) -> i32 {
    if duty_cycle < MIN_SPIN_DUTY {
        0
    } else {
        duty_cycle.saturating_mul(RPM_PER_DUTY_PERCENT)
    }
}

/// Simulated fan with injectable wiring and mechanical faults.
#[derive(Debug, Clone)]
pub struct SimulatedFan {
    duty_cycle: i32,
    faults: FaultConfig,
    rng: StdRng,
}

impl SimulatedFan {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// Deterministic noise sequence for reproducible runs.
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        Self {
            duty_cycle: 0,
            faults: FaultConfig::NONE,
            rng,
        }
    }

    pub fn faults(&self) -> &FaultConfig {
        &self.faults
    }

    pub fn simulate_fan_stall(&mut self, enable: bool) {
        self.faults.fan_stalled = enable;
        info!("Fan stall simulation {}", enabled_str(enable));
    }

    pub fn simulate_fan_degradation(&mut self, level: f64) -> Result<(), FaultError> {
        self.faults.fan_degradation = check_degradation(level)?;
        info!("Fan degradation set to {:.1}%", level * 100.0);
        Ok(())
    }

    pub fn simulate_disconnected_tacho(&mut self, enable: bool) {
        self.faults.tacho_disconnected = enable;
        info!("Disconnected tachometer simulation {}", enabled_str(enable));
    }

    pub fn simulate_disconnected_pwm(&mut self, enable: bool) {
        self.faults.pwm_disconnected = enable;
        info!("Disconnected PWM simulation {}", enabled_str(enable));
    }

    pub fn set_tacho_noise_level(&mut self, level: f64) -> Result<(), FaultError> {
        self.faults.noise_level = check_noise(level)?;
        info!("Tachometer noise level set to {:.1}%", level * 100.0);
        Ok(())
    }

    /// Clears every fault. The applied duty cycle is kept.
    pub fn reset_all_faults(&mut self) {
        self.faults = FaultConfig::NONE;
        info!("All fault simulations reset to normal operation");
    }

    fn sample_noise(&mut self, std_dev: f64) -> f64 {
        if std_dev <= 0.0 {
            return 0.0;
        }
        match Normal::new(0.0, std_dev) {
            Ok(dist) => dist.sample(&mut self.rng),
            Err(_) => 0.0,
        }
    }
}

impl Default for SimulatedFan {
    fn default() -> Self {
        Self::new()
    }
}

impl FanIO for SimulatedFan {
    fn set_duty_cycle(&mut self, channel: u8, duty_cycle: i32) {
        if self.faults.pwm_disconnected {
            error!("[FAULT] PWM signal disconnected, channel {channel} ignored {duty_cycle}%");
            return;
        }
        self.duty_cycle = duty_cycle;
        debug!("Setting PWM channel {channel} to {duty_cycle}%");
    }

    fn read_rpm(&mut self, channel: u8) -> i32 {
        if self.faults.blocks_tacho() {
            error!("[FAULT] Fan stalled or tachometer disconnected on channel {channel}");
            return 0;
        }

        let mut base_rpm = f64::from(nameplate_rpm(self.duty_cycle));
        debug!("Base RPM: {base_rpm}");

        if self.faults.fan_degradation > 0.0 {
            base_rpm *= 1.0 - self.faults.fan_degradation;
        }

        let noise = self.sample_noise(base_rpm * self.faults.noise_level);
        debug!("Noise: {noise}");

        // `as` saturates and truncates toward zero.
        (base_rpm + noise).max(0.0) as i32
    }

    fn current_duty_cycle(&self) -> i32 {
        self.duty_cycle
    }
}

fn enabled_str(enable: bool) -> &'static str {
    if enable {
        "enabled"
    } else {
        "disabled"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fan_at(duty: i32) -> SimulatedFan {
        let mut fan = SimulatedFan::with_seed(7);
        fan.set_duty_cycle(0, duty);
        fan
    }

    #[test]
    fn below_spin_threshold_reads_zero() {
        for duty in 0..MIN_SPIN_DUTY {
            assert_eq!(fan_at(duty).read_rpm(0), 0, "duty {duty}");
        }
    }

    #[test]
    fn clean_fan_follows_nameplate() {
        for duty in 20..=100 {
            assert_eq!(fan_at(duty).read_rpm(0), duty * 40, "duty {duty}");
        }
    }

    #[test]
    fn degradation_attenuates_base_rpm() {
        let mut fan = fan_at(50);
        fan.simulate_fan_degradation(0.3).unwrap();
        assert_eq!(fan.read_rpm(0), 1400);
    }

    #[test]
    fn stall_and_tacho_faults_override_everything() {
        let mut fan = fan_at(100);
        fan.simulate_fan_degradation(0.1).unwrap();
        fan.set_tacho_noise_level(0.5).unwrap();

        fan.simulate_fan_stall(true);
        assert_eq!(fan.read_rpm(0), 0);

        fan.simulate_fan_stall(false);
        fan.simulate_disconnected_tacho(true);
        assert_eq!(fan.read_rpm(0), 0);
    }

    #[test]
    fn disconnected_pwm_keeps_previous_duty() {
        let mut fan = fan_at(40);
        fan.simulate_disconnected_pwm(true);
        fan.set_duty_cycle(0, 90);

        assert_eq!(fan.current_duty_cycle(), 40);
        assert_eq!(fan.read_rpm(0), 1600);
    }

    #[test]
    fn no_range_check_at_device_layer() {
        let fan = fan_at(150);
        assert_eq!(fan.current_duty_cycle(), 150);
    }

    #[test]
    fn invalid_fault_levels_leave_config_untouched() {
        let mut fan = SimulatedFan::with_seed(1);
        fan.simulate_fan_degradation(0.25).unwrap();

        assert!(fan.simulate_fan_degradation(1.5).is_err());
        assert!(fan.set_tacho_noise_level(-1.0).is_err());
        assert_eq!(fan.faults().fan_degradation, 0.25);
        assert_eq!(fan.faults().noise_level, 0.0);
    }

    #[test]
    fn reset_restores_clean_behaviour() {
        let mut fan = fan_at(60);
        fan.simulate_fan_stall(true);
        fan.simulate_fan_degradation(0.5).unwrap();
        fan.simulate_disconnected_tacho(true);
        fan.simulate_disconnected_pwm(true);
        fan.set_tacho_noise_level(0.2).unwrap();

        fan.reset_all_faults();
        fan.reset_all_faults();

        assert!(fan.faults().is_clear());
        assert_eq!(fan.read_rpm(0), 2400);
        fan.set_duty_cycle(0, 80);
        assert_eq!(fan.read_rpm(0), 3200);
    }

    #[test]
    fn noise_is_reproducible_with_seed() {
        let mut a = fan_at(50);
        let mut b = fan_at(50);
        a.set_tacho_noise_level(0.05).unwrap();
        b.set_tacho_noise_level(0.05).unwrap();

        let ra: Vec<i32> = (0..10).map(|_| a.read_rpm(0)).collect();
        let rb: Vec<i32> = (0..10).map(|_| b.read_rpm(0)).collect();
        assert_eq!(ra, rb);
        assert!(ra.iter().any(|&rpm| rpm != 2000));
    }

    #[test]
    fn heavy_noise_never_goes_negative() {
        let mut fan = fan_at(20);
        fan.set_tacho_noise_level(5.0).unwrap();
        for _ in 0..500 {
            assert!(fan.read_rpm(0) >= 0);
        }
    }
}
