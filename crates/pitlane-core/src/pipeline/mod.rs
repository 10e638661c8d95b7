//! Per-dataset orchestration.
//!
//! Each dataset walks the [`Stage`] sequence on its own. A failure stops that
//! dataset at the failing stage and the run moves on to the next one.

mod stage;

pub use stage::Stage;

use std::time::Instant;

use tracing::{debug, error, info, info_span, warn};

use crate::config::{Config, DatasetSpec};
use crate::dedupe::deduplicate;
use crate::errors::{ConfigError, IngestError};
use crate::readers::{ReaderConfig, read_csv};
use crate::results::{DatasetResult, RunResult};
use crate::store::{Connector, LoadOptions};
use crate::transform::transform;
use crate::validator::{split_valid_rejected, validate_key_columns, validate_required_columns};
use crate::writer::write_csv;

/// Which datasets a run covers.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Dataset names to run. Empty means every configured dataset.
    pub only: Vec<String>,
}

impl RunOptions {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn only(names: Vec<String>) -> Self {
        Self { only: names }
    }

    /// Configured datasets selected by these options, in configuration order.
    pub fn select<'c>(&self, config: &'c Config) -> Result<Vec<&'c DatasetSpec>, ConfigError> {
        if self.only.is_empty() {
            return Ok(config.datasets.iter().collect());
        }
        let unknown: Vec<String> = self
            .only
            .iter()
            .filter(|name| config.dataset(name).is_none())
            .cloned()
            .collect();
        if !unknown.is_empty() {
            return Err(ConfigError::UnknownDatasets(unknown));
        }
        Ok(config
            .datasets
            .iter()
            .filter(|spec| self.only.contains(&spec.name))
            .collect())
    }
}

pub struct Pipeline<'a> {
    config: &'a Config,
    reader: ReaderConfig,
    connector: Option<&'a dyn Connector>,
    load_options: LoadOptions,
}

impl<'a> Pipeline<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self {
            config,
            reader: config.reader.clone(),
            connector: None,
            load_options: LoadOptions::from(&config.store),
        }
    }

    /// Enable store loads for datasets flagged with `load = true`.
    pub fn with_connector(mut self, connector: &'a dyn Connector) -> Self {
        self.connector = Some(connector);
        self
    }

    /// Run every configured dataset.
    pub fn run(&self) -> RunResult {
        self.run_datasets(self.config.datasets.iter())
    }

    /// Run the datasets picked by `options`. Unknown names fail before anything runs.
    pub fn run_with(&self, options: &RunOptions) -> Result<RunResult, ConfigError> {
        let selected = options.select(self.config)?;
        Ok(self.run_datasets(selected.into_iter()))
    }

    fn run_datasets<'s>(&self, datasets: impl Iterator<Item = &'s DatasetSpec>) -> RunResult {
        let start = Instant::now();
        let mut run = RunResult::new();
        for spec in datasets {
            run.push(self.run_dataset(spec));
        }
        info!(
            passed = run.passed_count(),
            failed = run.failed_count(),
            duration_ms = start.elapsed().as_millis(),
            "Ingestion run complete"
        );
        run
    }

    /// Drive one dataset through every stage. Failures are captured in the result.
    pub fn run_dataset(&self, spec: &DatasetSpec) -> DatasetResult {
        let span = info_span!("dataset", dataset = %spec.name, table = %spec.table_name);
        let _guard = span.enter();
        let start = Instant::now();

        let mut result = DatasetResult::new(spec.name.clone(), spec.table_name.clone());
        match self.execute(spec, &mut result) {
            Ok(()) => {
                result.advance(Stage::Done);
                info!(
                    stage = %Stage::Done,
                    rows_read = result.rows_read,
                    duplicates_removed = result.duplicates_removed(),
                    valid_rows = result.valid_rows,
                    rejected_rows = result.rejected_rows,
                    rows_loaded = ?result.rows_loaded,
                    duration_ms = start.elapsed().as_millis(),
                    "Dataset complete"
                );
            }
            Err(e) => {
                result.set_failed(&e);
                error!(
                    stage = %result.stage,
                    kind = %e.kind(),
                    error = %e,
                    "Dataset failed"
                );
            }
        }
        result
    }

    fn enter(&self, result: &mut DatasetResult, stage: Stage) {
        result.advance(stage);
        info!(stage = %stage, "Entering stage");
    }

    fn execute(&self, spec: &DatasetSpec, result: &mut DatasetResult) -> Result<(), IngestError> {
        self.enter(result, Stage::Read);
        if !spec.input_path.is_file() {
            return Err(IngestError::MissingInput(spec.input_path.display().to_string()));
        }
        let raw = read_csv(&spec.input_path, &self.reader)?;
        result.rows_read = raw.num_rows();
        debug!(rows = raw.num_rows(), columns = raw.num_columns(), "Read input");

        self.enter(result, Stage::ValidateColumns);
        validate_required_columns(raw.schema_ref(), &spec.required_columns)?;

        self.enter(result, Stage::Transform);
        let transformed = transform(&raw, spec)?;

        let keys = spec.effective_key_columns();
        let not_null = spec.required_not_null();

        self.enter(result, Stage::ValidateKeys);
        validate_key_columns(transformed.schema_ref(), &not_null)?;

        self.enter(result, Stage::Dedupe);
        let deduped = deduplicate(&transformed, &keys)?;
        result.rows_after_dedupe = deduped.num_rows();

        self.enter(result, Stage::Classify);
        let outcome = split_valid_rejected(&deduped, &not_null)?;
        result.valid_rows = outcome.valid.num_rows();
        result.rejected_rows = outcome.rejected.num_rows();

        self.enter(result, Stage::PersistFiles);
        write_csv(&spec.valid_output_path, &outcome.valid)?;
        write_csv(&spec.rejected_output_path, &outcome.rejected)?;
        debug!(
            valid_path = %spec.valid_output_path.display(),
            rejected_path = %spec.rejected_output_path.display(),
            "Wrote artifacts"
        );

        self.enter(result, Stage::LoadStore);
        if !spec.load {
            debug!("Store load disabled for dataset");
            return Ok(());
        }
        let Some(connector) = self.connector else {
            warn!("Dataset is flagged for loading but no store is configured; skipping load");
            return Ok(());
        };

        // the store is dropped, closing its connection, on every path out of this block
        let mut store = connector.connect()?;
        let loaded = store.load(
            &spec.table_name,
            &spec.db_columns,
            &outcome.valid,
            &self.load_options,
        )?;
        result.rows_loaded = Some(loaded);
        info!(target_store = %connector.target(), rows = loaded, "Loaded valid rows");
        Ok(())
    }
}
