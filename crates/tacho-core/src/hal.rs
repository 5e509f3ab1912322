/// PWM output and tachometer input of a single fan.
///
/// Implementations own the device state; callers hold them by `&mut` so only
/// one tester drives a device at a time.
pub trait FanIO: Send {
    /// Command a duty cycle (percent). Range checking belongs to the caller.
    fn set_duty_cycle(&mut self, channel: u8, duty_cycle: i32);

    /// Take one tachometer reading in RPM.
    fn read_rpm(&mut self, channel: u8) -> i32;

    /// Last duty cycle the device actually applied.
    fn current_duty_cycle(&self) -> i32;
}
