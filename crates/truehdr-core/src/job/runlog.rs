//! Per-run activity log.
//!
//! Each run writes a fresh `logging.log` into the output directory with one
//! timestamped line per event. Write failures degrade to tracing warnings so
//! an exhausted disk cannot take down a run that is otherwise working.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

use tracing::warn;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Timestamped line log for one conversion run.
#[derive(Debug)]
pub struct RunLog {
    file: Mutex<File>,
}

impl RunLog {
    /// Creates (truncating) the log at `path`.
    pub fn create(path: &Path) -> std::io::Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)?;
        Ok(RunLog {
            file: Mutex::new(file),
        })
    }

    pub fn info(&self, message: &str) {
        self.write_line("INFO", message);
    }

    pub fn warn(&self, message: &str) {
        self.write_line("WARNING", message);
    }

    pub fn error(&self, message: &str) {
        self.write_line("ERROR", message);
    }

    fn write_line(&self, level: &str, message: &str) {
        let timestamp = chrono::Local::now().format(TIMESTAMP_FORMAT);
        let line = format!("{timestamp} [{level}] {message}\n");
        match self.file.lock() {
            Ok(mut file) => {
                if let Err(err) = file.write_all(line.as_bytes()) {
                    warn!(error = %err, "failed to append to run log");
                }
            }
            Err(_) => warn!("run log mutex poisoned, dropping line"),
        }
    }
}
