use std::fmt;

use thiserror::Error;

/// Malformed or incomplete configuration. Fails the whole run.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config document: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Missing '{0}' in config")]
    MissingKey(String),

    #[error("Missing or empty 'datasets' section in config")]
    NoDatasets,

    #[error("datasets.{0} must be a table")]
    NotATable(String),

    #[error("{0} must be a list of strings")]
    NotAStringList(String),

    #[error("{0} must be a non-empty string")]
    EmptyString(String),

    #[error("{0} must not be empty")]
    EmptyList(String),

    #[error("Invalid value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// With `keep_columns` set, a key or not-null column would be projected away.
    #[error("datasets.{dataset}: {role} column(s) {columns:?} are not in keep_columns")]
    ColumnsNotKept {
        dataset: String,
        role: &'static str,
        columns: Vec<String>,
    },

    /// Columns a rule depends on are absent from the data it is applied to.
    #[error("{role} column(s) missing from schema: {columns:?}")]
    UnknownColumns {
        role: &'static str,
        columns: Vec<String>,
    },

    #[error("Unknown dataset(s) selected: {0:?}")]
    UnknownDatasets(Vec<String>),
}

/// The data does not have the shape a dataset's rules expect.
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("Required columns missing from input: {0:?}")]
    MissingColumns(Vec<String>),

    #[error("Key column(s) {0:?} not found after transform")]
    KeysNotFoundAfterTransform(Vec<String>),

    #[error("At least one key column is required")]
    NoKeyColumns,

    #[error("CSV file '{0}' has no header row")]
    EmptyInput(String),
}

/// Connection, execute, or commit failure against the relational store.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to open store '{path}': {source}")]
    Connect {
        path: String,
        #[source]
        source: rusqlite::Error,
    },

    #[error("Store error on table '{table}': {source}")]
    Execute {
        table: String,
        #[source]
        source: rusqlite::Error,
    },

    #[error("Failed to commit load into '{table}': {source}")]
    Commit {
        table: String,
        #[source]
        source: rusqlite::Error,
    },

    #[error("Invalid SQL identifier '{0}'")]
    InvalidIdentifier(String),

    #[error("No columns configured for table '{0}'")]
    NoColumns(String),

    #[error("Failed to convert column '{column}' for the store: {source}")]
    Conversion {
        column: String,
        #[source]
        source: arrow::error::ArrowError,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Any failure that aborts a single dataset.
#[derive(Error, Debug)]
pub enum IngestError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Input file not found at: {0}")]
    MissingInput(String),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Store(#[from] StoreError),

    /// The Arrow kernel or CSV decoder produced an error
    #[error("Arrow computation error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl IngestError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            IngestError::Config(_) => ErrorKind::Config,
            IngestError::MissingInput(_) => ErrorKind::MissingInput,
            IngestError::Schema(_) => ErrorKind::Schema,
            IngestError::Store(_) => ErrorKind::Store,
            IngestError::Arrow(_) => ErrorKind::Data,
            IngestError::Io(_) => ErrorKind::Io,
        }
    }
}

/// Coarse classification of a dataset failure, used in logs and reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Config,
    MissingInput,
    Schema,
    Store,
    Data,
    Io,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Config => "config",
            ErrorKind::MissingInput => "missing_input",
            ErrorKind::Schema => "schema",
            ErrorKind::Store => "store",
            ErrorKind::Data => "data",
            ErrorKind::Io => "io",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
