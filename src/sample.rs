// CurrentMonitor
// Supplied without warranty.
// Use at your own risk.

//! One reading from the sensor.

use chrono::{DateTime, Local};

use crate::error::ParseError;

/// Timestamp format of the CSV log: local wall clock, microsecond precision.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// A parsed reading in milliamps.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub timestamp: DateTime<Local>,
    pub value: f64,
}

impl Sample {
    /// Parses a line received now.
    pub fn parse(line: &str) -> Result<Self, ParseError> {
        Self::parse_at(line, Local::now())
    }

    /// Parses a line, stamping it with `timestamp`.
    ///
    /// Surrounding whitespace (including the line terminator) is ignored; the rest
    /// must be a single decimal number.
    pub fn parse_at(line: &str, timestamp: DateTime<Local>) -> Result<Self, ParseError> {
        let text = line.trim();
        if text.is_empty() {
            return Err(ParseError::Empty);
        }

        let value: f64 = text
            .parse()
            .map_err(|_| ParseError::Invalid(text.to_string()))?;
        if !value.is_finite() {
            return Err(ParseError::NonFinite(text.to_string()));
        }

        Ok(Self { timestamp, value })
    }

    pub fn timestamp_string(&self) -> String {
        self.timestamp.format(TIMESTAMP_FORMAT).to_string()
    }
}
