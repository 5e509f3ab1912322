pub mod faults;
pub mod hal;
pub mod hal_sim;
mod hal_proptest;
pub mod sweep;
pub mod validation;

pub use faults::{FaultConfig, FaultError};
pub use hal::FanIO;
pub use hal_sim::{nameplate_rpm, SimulatedFan};
pub use sweep::{nameplate_map, ExpectedRpmMap, ResultSink, SweepError, SweepRange, SweepReport};
pub use validation::{Outcome, ValidationConfig, ValidationParams, ValidationResult, Validator};
