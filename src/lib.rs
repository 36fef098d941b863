// CurrentMonitor
// Supplied without warranty.
// Use at your own risk.

//! Reads current readings (mA) from a serial sensor, keeps the most recent ones
//! for a live chart and appends every accepted reading to a CSV log.

pub mod app;
pub mod chart;
pub mod config;
pub mod csv_log;
pub mod error;
pub mod mock;
pub mod monitor;
pub mod ring;
pub mod sample;
pub mod serial;

pub use config::{ChartSpec, SessionConfig, SessionForm};
pub use error::{ConfigError, MonitorError, ParseError};
pub use monitor::{Monitor, SessionState, SessionStats, TickOutcome};
pub use ring::RingBuffer;
pub use sample::Sample;

/// Installs the `tracing` subscriber used by both binaries.
///
/// `RUST_LOG` overrides the default of `current_monitor=info`.
pub fn init_logging() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("current_monitor=info,current_monitor_headless=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
