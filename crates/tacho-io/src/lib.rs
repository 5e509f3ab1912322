pub mod expected_map;
pub mod report;
pub mod result_log;

pub use expected_map::{load_expected_map, parse_expected_map, ExpectedMapError};
pub use report::{JsonlReport, ReportEntry};
pub use result_log::{CsvResultLog, FanOut, ResultLogError};
