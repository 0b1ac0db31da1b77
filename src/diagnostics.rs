use std::error::Error as StdError;
use std::fmt::Write as _;
use std::fs::{self, OpenOptions};
use std::io::Write as _;
use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
#[error("failed to write error log {path}")]
pub struct DiagnosticsError {
    path: PathBuf,
    #[source]
    source: std::io::Error,
}

/// Append-only file of errors worth keeping after the process exits.
///
/// Each entry is one line, `[timestamp] context: error`, followed by one
/// `    caused by: …` line per error in the source chain.
#[derive(Debug, Clone)]
pub struct ErrorLog {
    path: PathBuf,
}

impl ErrorLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn log_error(
        &self,
        error: &(dyn StdError + 'static),
        context: &str,
    ) -> Result<(), DiagnosticsError> {
        tracing::error!(context, error = %error, "Recorded error");
        let entry = format_entry(error, context);
        self.append(&entry).map_err(|source| DiagnosticsError {
            path: self.path.clone(),
            source,
        })
    }

    /// Records the error and exits with status 1. Exits even if the entry
    /// could not be written.
    pub fn log_fatal_error(&self, error: &(dyn StdError + 'static), context: &str) -> ! {
        if let Err(e) = self.log_error(error, context) {
            tracing::error!(error = %e, "Could not record fatal error");
        }
        std::process::exit(1)
    }

    fn append(&self, entry: &str) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(entry.as_bytes())
    }
}

fn format_entry(error: &(dyn StdError + 'static), context: &str) -> String {
    let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S");
    let mut entry = format!("[{timestamp}] {context}: {error}\n");
    let mut source = error.source();
    while let Some(cause) = source {
        let _ = writeln!(entry, "    caused by: {cause}");
        source = cause.source();
    }
    entry
}
