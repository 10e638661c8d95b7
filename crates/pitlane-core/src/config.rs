//! Ingestion configuration.
//!
//! The configuration is a TOML document with a `[logging]` section, optional
//! `[store]` and `[reader]` sections, and one `[datasets.<name>]` table per
//! dataset.
//! The document is checked structurally before it is turned into typed
//! [`DatasetSpec`]s, so a malformed file never reaches the pipeline.
//!
//! ```toml
//! [logging]
//! log_dir = "logs"
//!
//! [datasets.results]
//! input_path = "data/raw/results.csv"
//! valid_output_path = "data/processed/results_processed.csv"
//! rejected_output_path = "data/rejects/results_rejects.csv"
//! table_name = "results"
//! required_columns = ["resultId", "raceId", "driverId", "constructorId", "points"]
//! key_columns = ["resultId", "raceId", "driverId", "constructorId"]
//! not_null_columns = ["points"]
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use regex::Regex;
use serde::Deserialize;
use toml::{Table, Value};

use crate::errors::ConfigError;
use crate::readers::{ReaderConfig, ReaderConfigBuilder};

/// Default pattern for the source null sentinel: one or more backslashes followed by `N`.
pub const DEFAULT_NULL_PATTERN: &str = r"\\+N";

const REQUIRED_DATASET_KEYS: [&str; 6] = [
    "input_path",
    "valid_output_path",
    "rejected_output_path",
    "table_name",
    "required_columns",
    "key_columns",
];

const OPTIONAL_LIST_KEYS: [&str; 4] = [
    "keep_columns",
    "numeric_columns",
    "not_null_columns",
    "db_columns",
];

#[derive(Debug, Clone)]
pub struct Config {
    pub logging: LoggingConfig,
    pub store: StoreConfig,
    /// CSV dialect shared by every dataset.
    pub reader: ReaderConfig,
    /// Datasets in document order.
    pub datasets: Vec<DatasetSpec>,
}

impl Config {
    pub fn dataset(&self, name: &str) -> Option<&DatasetSpec> {
        self.datasets.iter().find(|d| d.name == name)
    }

    pub fn any_load_enabled(&self) -> bool {
        self.datasets.iter().any(|d| d.load)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub log_dir: PathBuf,
    /// Optional default level (`error`, `warn`, `info`, `debug`, `trace`).
    #[serde(default)]
    pub level: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// SQLite database file. `None` leaves store loading to the caller.
    pub path: Option<PathBuf>,
    pub batch_size: usize,
    pub truncate_first: bool,
    pub create_tables: bool,
    pub busy_timeout_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: None,
            batch_size: 1000,
            truncate_first: true,
            create_tables: true,
            busy_timeout_ms: 5000,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawReader {
    delimiter: Option<String>,
    quote: Option<String>,
    batch_size: Option<usize>,
}

impl RawReader {
    fn build(self) -> Result<ReaderConfig, ConfigError> {
        let mut builder = ReaderConfigBuilder::new();
        if let Some(delimiter) = self.delimiter {
            builder = builder.with_delimiter(single_byte("reader.delimiter", &delimiter)?);
        }
        if let Some(quote) = self.quote {
            builder = builder.with_quote(single_byte("reader.quote", &quote)?);
        }
        if let Some(batch_size) = self.batch_size {
            if batch_size == 0 {
                return Err(ConfigError::InvalidValue {
                    key: "reader.batch_size".to_string(),
                    message: "must be greater than zero".to_string(),
                });
            }
            builder = builder.with_batch_size(batch_size);
        }
        Ok(builder.build())
    }
}

fn single_byte(key: &str, value: &str) -> Result<u8, ConfigError> {
    match value.as_bytes() {
        [byte] => Ok(*byte),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("expected a single ASCII character, got {value:?}"),
        }),
    }
}

/// Rules for one dataset. Immutable once loaded.
#[derive(Debug, Clone)]
pub struct DatasetSpec {
    pub name: String,
    pub input_path: PathBuf,
    pub valid_output_path: PathBuf,
    pub rejected_output_path: PathBuf,
    pub table_name: String,
    /// Columns the raw input must carry, in source naming.
    pub required_columns: Vec<String>,
    /// Dedupe key, in source or transformed naming.
    pub key_columns: Vec<String>,
    /// Source name → target name.
    pub rename: HashMap<String, String>,
    pub keep_columns: Option<Vec<String>>,
    /// Columns coerced to nullable floats. `None` defers to the dataset's default hook.
    pub numeric_columns: Option<Vec<String>>,
    /// Required non-null beyond the dedupe key.
    pub not_null_columns: Vec<String>,
    /// Store column order.
    pub db_columns: Vec<String>,
    pub load: bool,
    /// Sentinel matcher, anchored to the whole cell.
    pub null_pattern: Regex,
}

#[derive(Debug, Deserialize)]
struct RawDataset {
    input_path: String,
    valid_output_path: String,
    rejected_output_path: String,
    table_name: String,
    required_columns: Vec<String>,
    key_columns: Vec<String>,
    #[serde(default)]
    rename: HashMap<String, String>,
    #[serde(default)]
    keep_columns: Option<Vec<String>>,
    #[serde(default)]
    numeric_columns: Option<Vec<String>>,
    #[serde(default)]
    not_null_columns: Vec<String>,
    #[serde(default)]
    db_columns: Vec<String>,
    #[serde(default)]
    load: bool,
    #[serde(default)]
    null_pattern: Option<String>,
}

impl DatasetSpec {
    /// Create a dataset entry with the mandatory fields; everything else takes its default.
    pub fn new(
        name: impl Into<String>,
        input_path: impl Into<PathBuf>,
        valid_output_path: impl Into<PathBuf>,
        rejected_output_path: impl Into<PathBuf>,
        table_name: impl Into<String>,
        required_columns: Vec<String>,
        key_columns: Vec<String>,
    ) -> Self {
        Self {
            name: name.into(),
            input_path: input_path.into(),
            valid_output_path: valid_output_path.into(),
            rejected_output_path: rejected_output_path.into(),
            table_name: table_name.into(),
            required_columns,
            key_columns,
            rename: HashMap::new(),
            keep_columns: None,
            numeric_columns: None,
            not_null_columns: Vec::new(),
            db_columns: Vec::new(),
            load: false,
            null_pattern: default_null_pattern(),
        }
    }

    pub fn with_rename(self, rename: HashMap<String, String>) -> Self {
        Self { rename, ..self }
    }

    pub fn with_keep_columns(self, keep: Vec<String>) -> Self {
        Self {
            keep_columns: Some(keep),
            ..self
        }
    }

    pub fn with_numeric_columns(self, numeric: Vec<String>) -> Self {
        Self {
            numeric_columns: Some(numeric),
            ..self
        }
    }

    pub fn with_not_null_columns(self, not_null: Vec<String>) -> Self {
        Self {
            not_null_columns: not_null,
            ..self
        }
    }

    pub fn with_db_columns(self, db_columns: Vec<String>) -> Self {
        Self { db_columns, ..self }
    }

    pub fn with_load(self, load: bool) -> Self {
        Self { load, ..self }
    }

    /// Name a column carries after renames are applied.
    pub fn resolve<'a>(&'a self, column: &'a str) -> &'a str {
        self.rename.get(column).map(String::as_str).unwrap_or(column)
    }

    /// Dedupe key in transformed naming.
    pub fn effective_key_columns(&self) -> Vec<String> {
        dedup_preserving_order(self.key_columns.iter().map(|c| self.resolve(c).to_string()))
    }

    /// Dedupe key followed by the extra not-null columns, in transformed naming.
    pub fn required_not_null(&self) -> Vec<String> {
        dedup_preserving_order(
            self.key_columns
                .iter()
                .chain(self.not_null_columns.iter())
                .map(|c| self.resolve(c).to_string()),
        )
    }

    fn from_raw(name: &str, raw: RawDataset) -> Result<Self, ConfigError> {
        let null_pattern = match raw.null_pattern {
            Some(pattern) => null_sentinel_regex(&pattern).map_err(|e| ConfigError::InvalidValue {
                key: format!("datasets.{name}.null_pattern"),
                message: e.to_string(),
            })?,
            None => default_null_pattern(),
        };

        if raw.load && raw.db_columns.is_empty() {
            return Err(ConfigError::InvalidValue {
                key: format!("datasets.{name}.db_columns"),
                message: "must list the store columns when load = true".to_string(),
            });
        }

        let spec = Self {
            name: name.to_string(),
            input_path: PathBuf::from(raw.input_path),
            valid_output_path: PathBuf::from(raw.valid_output_path),
            rejected_output_path: PathBuf::from(raw.rejected_output_path),
            table_name: raw.table_name,
            required_columns: raw.required_columns,
            key_columns: raw.key_columns,
            rename: raw.rename,
            keep_columns: raw.keep_columns,
            numeric_columns: raw.numeric_columns,
            not_null_columns: raw.not_null_columns,
            db_columns: raw.db_columns,
            load: raw.load,
            null_pattern,
        };
        spec.check_kept_columns()?;
        Ok(spec)
    }

    /// Keys and not-null columns must survive the keep-list projection.
    fn check_kept_columns(&self) -> Result<(), ConfigError> {
        let Some(keep) = &self.keep_columns else {
            return Ok(());
        };
        for (role, columns) in [
            ("key", self.effective_key_columns()),
            ("not-null", self.required_not_null()),
        ] {
            let missing: Vec<String> = columns.into_iter().filter(|c| !keep.contains(c)).collect();
            if !missing.is_empty() {
                return Err(ConfigError::ColumnsNotKept {
                    dataset: self.name.clone(),
                    role,
                    columns: missing,
                });
            }
        }
        Ok(())
    }
}

/// Compile a sentinel pattern so it only matches a complete cell.
pub fn null_sentinel_regex(pattern: &str) -> Result<Regex, regex::Error> {
    Regex::new(&format!("^(?:{pattern})$"))
}

fn default_null_pattern() -> Regex {
    null_sentinel_regex(DEFAULT_NULL_PATTERN).expect("default null pattern is a valid regex")
}

fn dedup_preserving_order(columns: impl Iterator<Item = String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for c in columns {
        if !out.contains(&c) {
            out.push(c);
        }
    }
    out
}

/// Read and validate a configuration file.
pub fn load_config(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.display().to_string(),
        source,
    })?;
    parse_config(&content)
}

/// Parse and validate a configuration document.
pub fn parse_config(content: &str) -> Result<Config, ConfigError> {
    let document: Table = toml::from_str(content)?;
    validate_document(&document)?;

    let logging: LoggingConfig = document
        .get("logging")
        .cloned()
        .ok_or_else(|| ConfigError::MissingKey("logging.log_dir".to_string()))?
        .try_into()?;

    let store: StoreConfig = match document.get("store") {
        Some(value) => value.clone().try_into()?,
        None => StoreConfig::default(),
    };
    if store.batch_size == 0 {
        return Err(ConfigError::InvalidValue {
            key: "store.batch_size".to_string(),
            message: "must be greater than zero".to_string(),
        });
    }

    let reader = match document.get("reader") {
        Some(value) => {
            let raw: RawReader = value.clone().try_into()?;
            raw.build()?
        }
        None => ReaderConfig::default(),
    };

    let mut datasets = Vec::new();
    if let Some(Value::Table(entries)) = document.get("datasets") {
        for (name, entry) in entries {
            let raw: RawDataset = entry.clone().try_into()?;
            datasets.push(DatasetSpec::from_raw(name, raw)?);
        }
    }

    Ok(Config {
        logging,
        store,
        reader,
        datasets,
    })
}

/// Structural checks on the untyped document.
fn validate_document(document: &Table) -> Result<(), ConfigError> {
    let has_log_dir = document
        .get("logging")
        .and_then(Value::as_table)
        .is_some_and(|logging| logging.contains_key("log_dir"));
    if !has_log_dir {
        return Err(ConfigError::MissingKey("logging.log_dir".to_string()));
    }

    let datasets = match document.get("datasets") {
        Some(Value::Table(datasets)) if !datasets.is_empty() => datasets,
        _ => return Err(ConfigError::NoDatasets),
    };

    for (name, entry) in datasets {
        let Value::Table(dataset) = entry else {
            return Err(ConfigError::NotATable(name.clone()));
        };

        for key in REQUIRED_DATASET_KEYS {
            if !dataset.contains_key(key) {
                return Err(ConfigError::MissingKey(format!("datasets.{name}.{key}")));
            }
        }

        for key in ["required_columns", "key_columns"] {
            if !is_string_list(&dataset[key]) {
                return Err(ConfigError::NotAStringList(format!("datasets.{name}.{key}")));
            }
        }
        for key in OPTIONAL_LIST_KEYS {
            if let Some(value) = dataset.get(key) {
                if !is_string_list(value) {
                    return Err(ConfigError::NotAStringList(format!("datasets.{name}.{key}")));
                }
            }
        }

        if dataset["key_columns"]
            .as_array()
            .is_some_and(|keys| keys.is_empty())
        {
            return Err(ConfigError::EmptyList(format!("datasets.{name}.key_columns")));
        }

        for key in [
            "input_path",
            "valid_output_path",
            "rejected_output_path",
            "table_name",
        ] {
            match dataset[key].as_str() {
                Some(s) if !s.trim().is_empty() => {}
                _ => return Err(ConfigError::EmptyString(format!("datasets.{name}.{key}"))),
            }
        }
    }

    Ok(())
}

fn is_string_list(value: &Value) -> bool {
    value
        .as_array()
        .is_some_and(|items| items.iter().all(Value::is_str))
}

#[cfg(test)]
mod tests {
    use super::*;

    const RESULTS_CONFIG: &str = r#"
[logging]
log_dir = "logs"

[store]
path = "data/f1.sqlite"
batch_size = 500

[datasets.results]
input_path = "data/raw/results.csv"
valid_output_path = "data/processed/results_processed.csv"
rejected_output_path = "data/rejects/results_rejects.csv"
table_name = "results"
required_columns = ["resultId", "raceId", "driverId", "constructorId", "position", "points"]
key_columns = ["resultId", "raceId", "driverId", "constructorId"]
not_null_columns = ["points"]
db_columns = ["result_id", "race_id", "driver_id", "constructor_id", "position", "points"]
load = true

[datasets.results.rename]
resultId = "result_id"
raceId = "race_id"
driverId = "driver_id"
constructorId = "constructor_id"

[datasets.drivers]
input_path = "data/raw/drivers.csv"
valid_output_path = "data/processed/drivers_processed.csv"
rejected_output_path = "data/rejects/drivers_rejects.csv"
table_name = "drivers"
required_columns = ["driverId"]
key_columns = ["driverId"]
"#;

    fn expect_err(content: &str) -> ConfigError {
        match parse_config(content) {
            Ok(_) => panic!("expected configuration error"),
            Err(e) => e,
        }
    }

    #[test]
    fn test_parse_full_config() {
        let config = parse_config(RESULTS_CONFIG).unwrap();
        assert_eq!(config.logging.log_dir, PathBuf::from("logs"));
        assert_eq!(config.store.batch_size, 500);
        assert!(config.store.truncate_first);
        assert_eq!(config.datasets.len(), 2);
        // document order is preserved
        assert_eq!(config.datasets[0].name, "results");
        assert_eq!(config.datasets[1].name, "drivers");

        let results = config.dataset("results").unwrap();
        assert!(results.load);
        assert_eq!(results.table_name, "results");
        assert_eq!(results.rename.get("raceId").unwrap(), "race_id");
        assert!(config.any_load_enabled());
    }

    #[test]
    fn test_keys_resolved_through_rename() {
        let config = parse_config(RESULTS_CONFIG).unwrap();
        let results = config.dataset("results").unwrap();
        assert_eq!(
            results.effective_key_columns(),
            vec!["result_id", "race_id", "driver_id", "constructor_id"]
        );
        assert_eq!(
            results.required_not_null(),
            vec!["result_id", "race_id", "driver_id", "constructor_id", "points"]
        );

        let drivers = config.dataset("drivers").unwrap();
        assert_eq!(drivers.required_not_null(), vec!["driverId"]);
        assert!(!drivers.load);
    }

    #[test]
    fn test_missing_datasets_section() {
        let err = expect_err("[logging]\nlog_dir = \"logs\"\n");
        assert!(matches!(err, ConfigError::NoDatasets));
    }

    #[test]
    fn test_empty_datasets_section() {
        let err = expect_err("[logging]\nlog_dir = \"logs\"\n[datasets]\n");
        assert!(matches!(err, ConfigError::NoDatasets));
    }

    #[test]
    fn test_missing_log_dir() {
        let content = RESULTS_CONFIG.replace("log_dir = \"logs\"", "");
        let err = expect_err(&content);
        assert_eq!(err.to_string(), "Missing 'logging.log_dir' in config");
    }

    #[test]
    fn test_dataset_not_a_table() {
        let err = expect_err("[logging]\nlog_dir = \"logs\"\n[datasets]\nresults = 3\n");
        assert!(matches!(err, ConfigError::NotATable(name) if name == "results"));
    }

    #[test]
    fn test_missing_dataset_key() {
        let content = RESULTS_CONFIG.replace("table_name = \"drivers\"\n", "");
        let err = expect_err(&content);
        assert_eq!(err.to_string(), "Missing 'datasets.drivers.table_name' in config");
    }

    #[test]
    fn test_key_columns_not_a_string_list() {
        let content = RESULTS_CONFIG.replace("key_columns = [\"driverId\"]", "key_columns = [1, 2]");
        let err = expect_err(&content);
        assert!(matches!(err, ConfigError::NotAStringList(key) if key == "datasets.drivers.key_columns"));
    }

    #[test]
    fn test_required_columns_not_a_list() {
        let content = RESULTS_CONFIG.replace(
            "required_columns = [\"driverId\"]",
            "required_columns = \"driverId\"",
        );
        let err = expect_err(&content);
        assert!(matches!(err, ConfigError::NotAStringList(_)));
    }

    #[test]
    fn test_empty_key_columns() {
        let content = RESULTS_CONFIG.replace("key_columns = [\"driverId\"]", "key_columns = []");
        let err = expect_err(&content);
        assert!(matches!(err, ConfigError::EmptyList(_)));
    }

    #[test]
    fn test_blank_input_path() {
        let content =
            RESULTS_CONFIG.replace("input_path = \"data/raw/drivers.csv\"", "input_path = \"  \"");
        let err = expect_err(&content);
        assert!(matches!(err, ConfigError::EmptyString(key) if key == "datasets.drivers.input_path"));
    }

    #[test]
    fn test_load_requires_db_columns() {
        let content = RESULTS_CONFIG.replace(
            "db_columns = [\"result_id\", \"race_id\", \"driver_id\", \"constructor_id\", \"position\", \"points\"]\n",
            "",
        );
        let err = expect_err(&content);
        assert!(matches!(err, ConfigError::InvalidValue { key, .. } if key == "datasets.results.db_columns"));
    }

    #[test]
    fn test_invalid_null_pattern() {
        let content = RESULTS_CONFIG.replace(
            "key_columns = [\"driverId\"]",
            "key_columns = [\"driverId\"]\nnull_pattern = \"(\"",
        );
        let err = expect_err(&content);
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn test_keep_columns_must_keep_keys() {
        let content = RESULTS_CONFIG.replace(
            "key_columns = [\"driverId\"]",
            "key_columns = [\"driverId\"]\nkeep_columns = [\"forename\", \"surname\"]",
        );
        let err = expect_err(&content);
        assert!(matches!(
            err,
            ConfigError::ColumnsNotKept { ref dataset, role: "key", .. } if dataset == "drivers"
        ));
    }

    #[test]
    fn test_zero_batch_size_rejected() {
        let content = RESULTS_CONFIG.replace("batch_size = 500", "batch_size = 0");
        let err = expect_err(&content);
        assert!(matches!(err, ConfigError::InvalidValue { key, .. } if key == "store.batch_size"));
    }

    #[test]
    fn test_load_config_missing_file() {
        let err = load_config("does/not/exist.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_default_null_pattern() {
        let spec = DatasetSpec::new("d", "in.csv", "v.csv", "r.csv", "t", vec![], vec!["id".into()]);
        assert!(spec.null_pattern.is_match(r"\N"));
        assert!(spec.null_pattern.is_match(r"\\N"));
        assert!(!spec.null_pattern.is_match("N"));
        assert!(!spec.null_pattern.is_match(r"a\N"));
        assert!(!spec.null_pattern.is_match(r"\N "));
    }

    #[test]
    fn test_configured_null_pattern_is_anchored() {
        let content = RESULTS_CONFIG.replace(
            "key_columns = [\"driverId\"]",
            "key_columns = [\"driverId\"]\nnull_pattern = \"NA|NAN\"",
        );
        let config = parse_config(&content).unwrap();
        let pattern = &config.dataset("drivers").unwrap().null_pattern;
        assert!(pattern.is_match("NA"));
        assert!(pattern.is_match("NAN"));
        assert!(!pattern.is_match("NANA"));
        assert!(!pattern.is_match("xNA"));
    }

    #[test]
    fn test_reader_section_sets_dialect() {
        let content = format!("{RESULTS_CONFIG}\n[reader]\ndelimiter = \";\"\nquote = \"'\"\n");
        let config = parse_config(&content).unwrap();
        assert_eq!(config.reader.delimiter, b';');
        assert_eq!(config.reader.quote, b'\'');
    }

    #[test]
    fn test_reader_defaults_without_section() {
        let config = parse_config(RESULTS_CONFIG).unwrap();
        assert_eq!(config.reader.delimiter, b',');
        assert_eq!(config.reader.quote, b'"');
    }

    #[test]
    fn test_reader_delimiter_must_be_one_byte() {
        let content = format!("{RESULTS_CONFIG}\n[reader]\ndelimiter = \"||\"\n");
        let err = expect_err(&content);
        assert!(matches!(err, ConfigError::InvalidValue { key, .. } if key == "reader.delimiter"));
    }
}
