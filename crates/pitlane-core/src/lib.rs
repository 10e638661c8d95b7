pub mod config;
pub mod dedupe;
pub mod errors;
pub mod pipeline;
pub mod readers;
pub mod results;
pub mod store;
pub mod transform;
pub mod types;
pub mod utils;
pub mod validator;
pub mod writer;

pub use config::{Config, DatasetSpec, LoggingConfig, StoreConfig, load_config, parse_config};
pub use dedupe::deduplicate;
pub use errors::{ConfigError, ErrorKind, IngestError, SchemaError, StoreError};
pub use pipeline::{Pipeline, RunOptions, Stage};
pub use results::{DatasetResult, RunResult};
pub use store::{Connector, LoadOptions, SqliteConnector, SqliteStore, Store};
pub use transform::transform;
pub use types::{RowSet, ValidationOutcome};
pub use validator::split_valid_rejected;
