use crate::errors::{ErrorKind, IngestError};
use crate::pipeline::Stage;

/// Outcome of one dataset's run through the pipeline.
#[derive(Debug, Clone)]
pub struct DatasetResult {
    pub dataset: String,
    pub table_name: String,
    pub rows_read: usize,
    pub rows_after_dedupe: usize,
    pub valid_rows: usize,
    pub rejected_rows: usize,
    /// `None` when the store load did not run.
    pub rows_loaded: Option<usize>,
    /// Last stage entered; for a failed dataset, the stage that failed.
    pub stage: Stage,
    passed: bool,
    pub error_kind: Option<ErrorKind>,
    pub error_message: Option<String>,
}

impl DatasetResult {
    pub fn new(dataset: String, table_name: String) -> Self {
        Self {
            dataset,
            table_name,
            rows_read: 0,
            rows_after_dedupe: 0,
            valid_rows: 0,
            rejected_rows: 0,
            rows_loaded: None,
            stage: Stage::Read,
            passed: true,
            error_kind: None,
            error_message: None,
        }
    }

    pub fn advance(&mut self, stage: Stage) {
        self.stage = stage;
    }

    pub fn set_failed(&mut self, error: &IngestError) {
        self.passed = false;
        self.error_kind = Some(error.kind());
        self.error_message = Some(error.to_string());
    }

    pub fn is_passed(&self) -> bool {
        self.passed
    }

    pub fn duplicates_removed(&self) -> usize {
        self.rows_read.saturating_sub(self.rows_after_dedupe)
    }
}

/// Every dataset result of one run, in execution order.
#[derive(Debug, Clone, Default)]
pub struct RunResult {
    pub datasets: Vec<DatasetResult>,
}

impl RunResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, result: DatasetResult) {
        self.datasets.push(result);
    }

    pub fn is_passed(&self) -> bool {
        self.datasets.iter().all(DatasetResult::is_passed)
    }

    pub fn passed_count(&self) -> usize {
        self.datasets.iter().filter(|d| d.is_passed()).count()
    }

    pub fn failed_count(&self) -> usize {
        self.datasets.len() - self.passed_count()
    }

    pub fn get(&self, dataset: &str) -> Option<&DatasetResult> {
        self.datasets.iter().find(|d| d.dataset == dataset)
    }
}
