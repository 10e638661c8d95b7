use pitlane_core::DatasetResult;
use prettytable::{Cell, Row, Table};

use crate::{Reporter, utils::numbers::format_numbers};

pub struct StdOutFormatter {
    intro: String,
    rows: Vec<DatasetResult>,
}

impl StdOutFormatter {
    pub fn new(version: String) -> Self {
        Self {
            intro: format!("pitlane v{} - Ingestion Report", version),
            rows: Vec::new(),
        }
    }

    pub fn render_result(&self, result: &DatasetResult) -> String {
        let status = if result.is_passed() { "OK" } else { "FAILED" };
        let mut line = format!(
            "{} -> {} ({} rows) - {}",
            result.dataset,
            result.table_name,
            format_numbers(result.rows_read),
            status
        );
        if let (Some(kind), Some(message)) = (&result.error_kind, &result.error_message) {
            line.push_str(&format!("\n  [{}] at {}: {}", kind, result.stage, message));
        }
        line
    }

    pub fn render_table(&self) -> String {
        let mut table = Table::new();
        table.add_row(Row::new(vec![
            Cell::new("Dataset"),
            Cell::new("Read"),
            Cell::new("Duplicates"),
            Cell::new("Valid"),
            Cell::new("Rejected"),
            Cell::new("Loaded"),
            Cell::new("Stage"),
        ]));

        for result in &self.rows {
            let loaded = result
                .rows_loaded
                .map(format_numbers)
                .unwrap_or_else(|| "-".to_string());
            table.add_row(Row::new(vec![
                Cell::new(&result.dataset),
                Cell::new(&format_numbers(result.rows_read)),
                Cell::new(&format_numbers(result.duplicates_removed())),
                Cell::new(&format_numbers(result.valid_rows)),
                Cell::new(&format_numbers(result.rejected_rows)),
                Cell::new(&loaded),
                Cell::new(result.stage.as_str()),
            ]));
        }

        table.to_string()
    }
}

impl Reporter for StdOutFormatter {
    fn on_start(&self, datasets: usize) {
        println!("{}", self.intro);
        println!("{}", "=".repeat(self.intro.len()));
        println!("Processing {} dataset(s)...\n", datasets);
    }

    fn on_dataset_result(&mut self, result: &DatasetResult) {
        println!("{}", self.render_result(result));
        self.rows.push(result.clone());
    }

    fn on_summary(&self, passed: usize, failed: usize) {
        println!("\n{}", self.render_table());
        println!("Result: {} failed, {} passed", failed, passed);
    }
}
