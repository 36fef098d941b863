// CurrentMonitor
// Supplied without warranty.
// Use at your own risk.

//! Append-only CSV log of accepted samples.
//!
//! No file handle outlives a call: every append opens, writes, syncs and closes,
//! so the file is valid up to the last completed row whatever happens next.

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::{MonitorError, Result};
use crate::sample::Sample;

pub const HEADER: &str = "Timestamp,Current (mA)";

#[derive(Debug, Clone)]
pub struct CsvLog {
    path: PathBuf,
}

impl CsvLog {
    /// Creates the file with its header row unless it already exists.
    ///
    /// An existing file is left exactly as it is.
    pub fn ensure_header(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(mut file) => {
                writeln!(file, "{HEADER}")
                    .and_then(|_| file.sync_all())
                    .map_err(|e| MonitorError::log(&path, e))?;
                info!(path = %path.display(), "created CSV log");
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {}
            Err(e) => return Err(MonitorError::log(&path, e)),
        }
        Ok(Self { path })
    }

    /// Appends one `timestamp,value` row.
    pub fn append(&self, sample: &Sample) -> Result<()> {
        let row = format_row(&sample.timestamp_string(), sample.value);
        self.append_row(&row)
            .map_err(|e| MonitorError::log(&self.path, e))
    }

    fn append_row(&self, row: &str) -> io::Result<()> {
        let mut file = OpenOptions::new().append(true).open(&self.path)?;
        file.write_all(row.as_bytes())?;
        file.sync_data()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn format_row(timestamp: &str, value: f64) -> String {
    // `{:?}` keeps the ".0" on whole numbers, so 10 mA is logged as "10.0".
    format!("{timestamp},{value:?}\n")
}
