//! `tracing` setup for the binary.
//!
//! Events go to stderr and, when a log directory is configured, to a
//! timestamped `ingestion_<YYYYmmdd_HHMMSS>.log` file inside it. `RUST_LOG`
//! overrides the configured level.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use tracing::Level;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, MakeWriter},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

/// Stderr output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    pub level: Level,
    pub format: LogFormat,
    pub with_ansi: bool,
    /// File that receives a plain-text copy of every event.
    pub log_file: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            format: LogFormat::default(),
            with_ansi: true,
            log_file: None,
        }
    }
}

impl LogConfig {
    /// Level from `-v` flags, falling back to the configured name, then `info`.
    ///
    /// - 0: configured level or info
    /// - 1 (`-v`): debug
    /// - 2+ (`-vv`): trace
    pub fn resolve(verbosity: u8, configured: Option<&str>) -> Result<Self> {
        let level = match verbosity {
            0 => match configured {
                Some(name) => Level::from_str(name)
                    .map_err(|_| anyhow::anyhow!("Invalid log level '{}' in config", name))?,
                None => Level::INFO,
            },
            1 => Level::DEBUG,
            _ => Level::TRACE,
        };
        Ok(Self {
            level,
            ..Default::default()
        })
    }

    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_log_file(mut self, path: Option<PathBuf>) -> Self {
        self.log_file = path;
        self
    }
}

/// `<log_dir>/ingestion_<timestamp>.log`
pub fn log_file_path(log_dir: &Path, timestamp: &str) -> PathBuf {
    log_dir.join(format!("ingestion_{}.log", timestamp))
}

/// Install the global subscriber. Call once, before the pipeline runs.
pub fn init_logging(config: &LogConfig) -> Result<()> {
    let stderr_layer = match config.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_writer(io::stderr)
            .with_target(false)
            .boxed(),
        LogFormat::Pretty => fmt::layer()
            .with_writer(io::stderr)
            .with_ansi(config.with_ansi)
            .with_target(false)
            .boxed(),
    };

    let file_layer = match &config.log_file {
        Some(path) => {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create log directory: {}", parent.display())
                })?;
            }
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file: {}", path.display()))?;
            Some(
                fmt::layer()
                    .with_writer(SharedFileWriter::new(file))
                    .with_ansi(false)
                    .with_target(false),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(file_layer)
        .with(build_env_filter(config.level))
        .try_init()
        .context("Failed to initialise logging")
}

#[derive(Clone)]
struct SharedFileWriter {
    file: Arc<Mutex<File>>,
}

impl SharedFileWriter {
    fn new(file: File) -> Self {
        Self {
            file: Arc::new(Mutex::new(file)),
        }
    }
}

struct SharedFileGuard {
    file: Arc<Mutex<File>>,
}

impl Write for SharedFileGuard {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut guard = self
            .file
            .lock()
            .map_err(|_| io::Error::other("log file lock poisoned"))?;
        guard.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        let mut guard = self
            .file
            .lock()
            .map_err(|_| io::Error::other("log file lock poisoned"))?;
        guard.flush()
    }
}

impl<'a> MakeWriter<'a> for SharedFileWriter {
    type Writer = SharedFileGuard;

    fn make_writer(&'a self) -> Self::Writer {
        SharedFileGuard {
            file: Arc::clone(&self.file),
        }
    }
}

fn build_env_filter(level: Level) -> EnvFilter {
    let level = level.as_str().to_lowercase();
    // dependencies stay at warn
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "warn,pitlane={level},pitlane_core={level},pitlane_reports={level}"
        ))
    })
}
