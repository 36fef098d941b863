// CurrentMonitor
// Supplied without warranty.
// Use at your own risk.

//! Error types shared by the acquisition core and both front ends.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// A line from the device that is not a usable sample.
///
/// Callers discard these without logging or retrying.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("empty line")]
    Empty,

    #[error("not a decimal number: {0:?}")]
    Invalid(String),

    #[error("value is not finite: {0:?}")]
    NonFinite(String),
}

/// An invalid session field.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("baud rate must be a positive integer, got {0:?}")]
    BaudRate(String),

    #[error("serial port is not set")]
    EmptyPort,

    #[error("CSV file name is not set")]
    EmptyCsvPath,

    #[error("buffer capacity must be at least 1")]
    ZeroCapacity,

    #[error("Y-axis range {min}..{max} is empty")]
    EmptyRange { min: String, max: String },

    #[error("{field} must be a number, got {value:?}")]
    NotANumber { field: &'static str, value: String },

    #[error("tick interval must be at least 1 ms")]
    ZeroInterval,
}

/// Everything that can stop a session from starting or continuing.
#[derive(Error, Debug)]
pub enum MonitorError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("could not open {port}: {source}")]
    Connection {
        port: String,
        #[source]
        source: serialport::Error,
    },

    #[error("serial read failed: {0}")]
    Serial(#[from] io::Error),

    #[error("CSV log {}: {source}", .path.display())]
    Log {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("serial port is not open")]
    NotOpen,

    #[error("a session is already running")]
    AlreadyRunning,
}

impl MonitorError {
    pub(crate) fn log(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Log {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T, E = MonitorError> = std::result::Result<T, E>;
