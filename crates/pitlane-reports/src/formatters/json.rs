use chrono::Local;
use pitlane_core::DatasetResult;
use serde::{Deserialize, Serialize};
use serde_json::Error;

use crate::Reporter;

#[derive(Serialize, Deserialize)]
pub struct JsonFormatter {
    version: String,
    timestamp: String,
    passed: bool,
    datasets: Vec<DatasetFormatter>,
}

#[derive(Serialize, Deserialize)]
struct DatasetFormatter {
    name: String,
    table: String,
    rows_read: usize,
    duplicates_removed: usize,
    valid_rows: usize,
    rejected_rows: usize,
    rows_loaded: Option<usize>,
    stage: String,
    pass: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<ErrorFormatter>,
}

#[derive(Serialize, Deserialize)]
struct ErrorFormatter {
    kind: String,
    message: String,
}

impl JsonFormatter {
    pub fn new(version: String) -> Self {
        let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
        Self {
            version,
            timestamp,
            passed: true,
            datasets: Vec::new(),
        }
    }

    pub fn to_json(&self) -> Result<String, Error> {
        serde_json::to_string_pretty(self)
    }
}

impl Reporter for JsonFormatter {
    fn on_start(&self, _datasets: usize) {}

    fn on_dataset_result(&mut self, result: &DatasetResult) {
        let error = match (&result.error_kind, &result.error_message) {
            (Some(kind), Some(message)) => Some(ErrorFormatter {
                kind: kind.to_string(),
                message: message.clone(),
            }),
            _ => None,
        };
        self.passed &= result.is_passed();
        self.datasets.push(DatasetFormatter {
            name: result.dataset.clone(),
            table: result.table_name.clone(),
            rows_read: result.rows_read,
            duplicates_removed: result.duplicates_removed(),
            valid_rows: result.valid_rows,
            rejected_rows: result.rejected_rows,
            rows_loaded: result.rows_loaded,
            stage: result.stage.to_string(),
            pass: result.is_passed(),
            error,
        });
    }

    fn on_summary(&self, _passed: usize, _failed: usize) {}
}
