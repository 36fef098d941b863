// CurrentMonitor
// Supplied without warranty.
// Use at your own risk.

//! Session configuration, GUI form validation and persisted settings.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const DEFAULT_BAUD_RATE: u32 = 9600;
pub const DEFAULT_CSV_PATH: &str = "current_log.csv";
pub const DEFAULT_CAPACITY: usize = 100;
pub const DEFAULT_Y_MIN: f64 = 0.0;
pub const DEFAULT_Y_MAX: f64 = 200.0;
pub const TICK_INTERVAL: Duration = Duration::from_millis(25);

/// Read timeout of the headless loop, which has nothing else to do while it waits.
pub const HEADLESS_READ_TIMEOUT: Duration = Duration::from_secs(1);

/// Read timeout of the GUI, short enough that a silent device never stalls redraws.
pub const INTERACTIVE_READ_TIMEOUT: Duration = Duration::from_millis(10);

#[cfg(windows)]
pub const DEFAULT_PORT: &str = "COM3";
#[cfg(not(windows))]
pub const DEFAULT_PORT: &str = "/dev/ttyUSB0";

pub const BAUD_RATES: [u32; 8] = [1200, 2400, 4800, 9600, 19200, 38400, 57600, 115200];

/// Settings fixed for the lifetime of one session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    pub port: String,
    pub baud_rate: u32,
    pub csv_path: PathBuf,
    pub capacity: usize,
    pub read_timeout: Duration,
}

impl SessionConfig {
    pub fn new(port: impl Into<String>, baud_rate: u32) -> Self {
        Self {
            port: port.into(),
            baud_rate,
            csv_path: PathBuf::from(DEFAULT_CSV_PATH),
            capacity: DEFAULT_CAPACITY,
            read_timeout: HEADLESS_READ_TIMEOUT,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.port.trim().is_empty() {
            return Err(ConfigError::EmptyPort);
        }
        if self.baud_rate == 0 {
            return Err(ConfigError::BaudRate(self.baud_rate.to_string()));
        }
        if self.csv_path.as_os_str().is_empty() {
            return Err(ConfigError::EmptyCsvPath);
        }
        if self.capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        Ok(())
    }
}

/// Raw text of the editable fields in the GUI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionForm {
    pub port: String,
    pub baud_rate: String,
    pub csv_path: String,
    pub capacity: String,
    pub y_min: String,
    pub y_max: String,
    pub tick_ms: String,
}

impl Default for SessionForm {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT.to_string(),
            baud_rate: DEFAULT_BAUD_RATE.to_string(),
            csv_path: DEFAULT_CSV_PATH.to_string(),
            capacity: DEFAULT_CAPACITY.to_string(),
            y_min: DEFAULT_Y_MIN.to_string(),
            y_max: DEFAULT_Y_MAX.to_string(),
            tick_ms: TICK_INTERVAL.as_millis().to_string(),
        }
    }
}

fn parse_field<T: std::str::FromStr>(field: &'static str, text: &str) -> Result<T, ConfigError> {
    let text = text.trim();
    text.parse().map_err(|_| ConfigError::NotANumber {
        field,
        value: text.to_string(),
    })
}

impl SessionForm {
    /// Turns the form into a session configuration without touching the device or disk.
    pub fn validate(&self) -> Result<SessionConfig, ConfigError> {
        let baud_text = self.baud_rate.trim();
        let baud_rate = match baud_text.parse::<u32>() {
            Ok(b) if b > 0 => b,
            _ => return Err(ConfigError::BaudRate(baud_text.to_string())),
        };

        let config = SessionConfig {
            port: self.port.trim().to_string(),
            baud_rate,
            csv_path: PathBuf::from(self.csv_path.trim()),
            capacity: parse_field("buffer capacity", &self.capacity)?,
            read_timeout: INTERACTIVE_READ_TIMEOUT,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn chart_spec(&self) -> Result<ChartSpec, ConfigError> {
        ChartSpec::new(
            parse_field("buffer capacity", &self.capacity)?,
            parse_field("Y min", &self.y_min)?,
            parse_field("Y max", &self.y_max)?,
        )
    }

    pub fn tick_interval(&self) -> Result<Duration, ConfigError> {
        match parse_field::<u64>("tick interval", &self.tick_ms)? {
            0 => Err(ConfigError::ZeroInterval),
            ms => Ok(Duration::from_millis(ms)),
        }
    }
}

/// Plot geometry: X spans `[0, capacity)`, Y is a fixed range in milliamps.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChartSpec {
    pub capacity: usize,
    pub y_min: f64,
    pub y_max: f64,
}

impl Default for ChartSpec {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            y_min: DEFAULT_Y_MIN,
            y_max: DEFAULT_Y_MAX,
        }
    }
}

impl ChartSpec {
    pub fn new(capacity: usize, y_min: f64, y_max: f64) -> Result<Self, ConfigError> {
        if capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        if y_min.is_nan() || y_max.is_nan() || y_min >= y_max {
            return Err(ConfigError::EmptyRange {
                min: y_min.to_string(),
                max: y_max.to_string(),
            });
        }
        Ok(Self {
            capacity,
            y_min,
            y_max,
        })
    }
}

// ---------------- Settings file ----------------

/// What the GUI remembers between runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppSettings {
    #[serde(flatten)]
    pub form: SessionForm,
}

impl AppSettings {
    /// `Documents/CurrentMonitor`, falling back to the desktop, then the working directory.
    pub fn dir() -> PathBuf {
        let base = dirs::document_dir()
            .or_else(dirs::desktop_dir)
            .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));
        base.join("CurrentMonitor")
    }

    pub fn default_path() -> PathBuf {
        Self::dir().join("settings.json")
    }

    /// Returns `None` when no settings have been saved yet.
    pub fn load(path: &Path) -> Result<Option<Self>, Box<dyn std::error::Error>> {
        if !path.exists() {
            return Ok(None);
        }
        let s = fs::read_to_string(path)?;
        Ok(Some(serde_json::from_str(&s)?))
    }

    /// Writes through a temp file so a crash never leaves half a settings file.
    pub fn save(&self, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp = path.with_extension("json.tmp");
        let json = serde_json::to_string_pretty(self)?;

        fs::write(&tmp, json.as_bytes())?;
        if path.exists() {
            let _ = fs::remove_file(path);
        }
        fs::rename(&tmp, path)?;
        Ok(())
    }
}
