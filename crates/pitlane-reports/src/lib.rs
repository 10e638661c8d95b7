pub mod formatters;
pub mod utils;

use pitlane_core::DatasetResult;
pub use formatters::{json::JsonFormatter, stdout::StdOutFormatter};

pub trait Reporter {
    fn on_start(&self, datasets: usize);
    fn on_dataset_result(&mut self, result: &DatasetResult);
    fn on_summary(&self, passed: usize, failed: usize);
}
