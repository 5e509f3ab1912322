#[cfg(test)]
mod proptest_fan {
    use crate::hal::FanIO;
    use crate::hal_sim::SimulatedFan;
    use crate::validation::{Outcome, ValidationConfig, ValidationParams, Validator};
    use proptest::prelude::*;
    use std::time::Duration;

    fn fan_at(seed: u64, duty: i32) -> SimulatedFan {
        let mut fan = SimulatedFan::with_seed(seed);
        fan.set_duty_cycle(0, duty);
        fan
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(2000))]

        // Property: a clean fan reads exactly the nameplate curve
        #[test]
        fn clean_fan_matches_nameplate(seed in any::<u64>(), duty in 0i32..=100) {
            let expected = if duty < 20 { 0 } else { duty * 40 };
            prop_assert_eq!(fan_at(seed, duty).read_rpm(0), expected);
        }

        // Property: stall or tacho disconnect wins over every other fault
        #[test]
        fn blocking_faults_always_read_zero(
            seed in any::<u64>(),
            duty in 0i32..=100,
            degradation in 0.0f64..=1.0,
            noise in 0.0f64..=2.0,
            stall in any::<bool>(),
        ) {
            let mut fan = fan_at(seed, duty);
            fan.simulate_fan_degradation(degradation).unwrap();
            fan.set_tacho_noise_level(noise).unwrap();
            if stall {
                fan.simulate_fan_stall(true);
            } else {
                fan.simulate_disconnected_tacho(true);
            }
            prop_assert_eq!(fan.read_rpm(0), 0);
        }

        // Property: a disconnected PWM line never changes the applied duty
        #[test]
        fn disconnected_pwm_is_sticky(
            seed in any::<u64>(),
            initial in 0i32..=100,
            writes in proptest::collection::vec(0i32..=100, 1..20),
        ) {
            let mut fan = fan_at(seed, initial);
            fan.simulate_disconnected_pwm(true);
            for duty in writes {
                fan.set_duty_cycle(0, duty);
            }
            prop_assert_eq!(fan.current_duty_cycle(), initial);
        }

        // Property: degradation without noise gives the truncated attenuated curve
        #[test]
        fn degradation_truncates(seed in any::<u64>(), duty in 20i32..=100, degradation in 0.0f64..=1.0) {
            let mut fan = fan_at(seed, duty);
            fan.simulate_fan_degradation(degradation).unwrap();
            let expected = (f64::from(duty * 40) * (1.0 - degradation)) as i32;
            prop_assert_eq!(fan.read_rpm(0), expected);
        }

        // Property: out-of-range PWM values are rejected before any device call
        #[test]
        fn invalid_pwm_never_reaches_device(
            pwm in prop_oneof![-1000i32..0, 101i32..1000],
            expected in 0i32..5000,
        ) {
            let config = ValidationConfig { sample_interval: Duration::ZERO, ..Default::default() };
            let params = ValidationParams { stabilization_time_s: 0.0, ..Default::default() };
            let mut validator = Validator::new(fan_at(1, 55), config);

            let result = validator.validate(pwm, Some(expected), &params);
            prop_assert_eq!(result.outcome, Outcome::Fail);
            prop_assert_eq!(result.measured_rpm, None);
            prop_assert_eq!(validator.io().current_duty_cycle(), 55);
        }
    }
}
