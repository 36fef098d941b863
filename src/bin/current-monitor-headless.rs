// CurrentMonitor
// Supplied without warranty.
// Use at your own risk.

//! Starts a session immediately and ticks until the process is killed.
//!
//! There is no window; pass `--plot` to have the chart rendered to a PNG file
//! every few ticks instead.

use std::path::PathBuf;
use std::process::ExitCode;
use std::thread;
use std::time::{Duration, Instant};

use clap::Parser;
use tracing::{error, info, warn};

use current_monitor::chart;
use current_monitor::config::{
    ChartSpec, SessionConfig, DEFAULT_BAUD_RATE, DEFAULT_CAPACITY, DEFAULT_CSV_PATH, DEFAULT_PORT,
    DEFAULT_Y_MAX, DEFAULT_Y_MIN, HEADLESS_READ_TIMEOUT, TICK_INTERVAL,
};
use current_monitor::serial::{list_ports, SerialConnector};
use current_monitor::{Monitor, MonitorError};

#[derive(Parser, Debug)]
#[command(
    name = "current-monitor-headless",
    version,
    about = "Log a serial current sensor to CSV without a GUI"
)]
struct Cli {
    /// Serial port of the sensor
    #[arg(long, default_value = DEFAULT_PORT)]
    port: String,

    #[arg(long, default_value_t = DEFAULT_BAUD_RATE)]
    baud: u32,

    /// CSV log, created with a header if missing and appended to otherwise
    #[arg(long, value_name = "FILE", default_value = DEFAULT_CSV_PATH)]
    csv: PathBuf,

    /// Number of recent samples kept for the chart
    #[arg(long, default_value_t = DEFAULT_CAPACITY)]
    capacity: usize,

    #[arg(long, default_value_t = DEFAULT_Y_MIN, allow_negative_numbers = true)]
    y_min: f64,

    #[arg(long, default_value_t = DEFAULT_Y_MAX, allow_negative_numbers = true)]
    y_max: f64,

    #[arg(long, default_value_t = TICK_INTERVAL.as_millis() as u64)]
    interval_ms: u64,

    /// Serial read timeout
    #[arg(long, default_value_t = HEADLESS_READ_TIMEOUT.as_millis() as u64)]
    timeout_ms: u64,

    /// Render the chart to this PNG file
    #[arg(long, value_name = "PNG")]
    plot: Option<PathBuf>,

    /// Ticks between chart renders
    #[arg(long, default_value_t = 40)]
    plot_every: u64,

    /// Print the available serial ports and exit
    #[arg(long)]
    list_ports: bool,
}

fn run(cli: Cli) -> Result<(), MonitorError> {
    let spec = ChartSpec::new(cli.capacity, cli.y_min, cli.y_max)?;
    let config = SessionConfig {
        port: cli.port,
        baud_rate: cli.baud,
        csv_path: cli.csv,
        capacity: cli.capacity,
        read_timeout: Duration::from_millis(cli.timeout_ms),
    };

    let mut monitor = Monitor::new(SerialConnector, config.capacity);
    monitor.start(config)?;

    let interval = Duration::from_millis(cli.interval_ms);
    let plot_every = cli.plot_every.max(1);
    let mut ticks: u64 = 0;

    loop {
        let next = Instant::now() + interval;

        // A device error ends the session; there is nothing to fall back to here.
        monitor.tick()?;
        ticks += 1;

        if let Some(path) = &cli.plot {
            if ticks % plot_every == 0 {
                if let Err(e) = chart::save_png(path, &monitor.snapshot(), &spec) {
                    warn!(error = %e, path = %path.display(), "chart render failed");
                }
            }
        }

        thread::sleep(next.saturating_duration_since(Instant::now()));
    }
}

fn main() -> ExitCode {
    current_monitor::init_logging();
    let cli = Cli::parse();

    if cli.list_ports {
        for port in list_ports() {
            println!("{port}");
        }
        return ExitCode::SUCCESS;
    }

    info!(port = %cli.port, baud = cli.baud, csv = %cli.csv.display(), "starting");
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "monitor stopped");
            ExitCode::FAILURE
        }
    }
}
