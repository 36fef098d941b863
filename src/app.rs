// CurrentMonitor
// Supplied without warranty.
// Use at your own risk.

//! Desktop front end: editable port/baud/file fields, Start/Stop and a live chart.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use chrono::Local;
use iced::time;
use iced::widget::{button, column, pick_list, row, text, text_input};
use iced::{Alignment, Color, Element, Length, Subscription, Task};
use plotters_iced::{Chart, ChartWidget, DrawingBackend};
use rfd::{FileDialog, MessageButtons, MessageDialog, MessageLevel};
use tracing::{info, warn};

use crate::chart;
use crate::config::{AppSettings, ChartSpec, SessionForm, TICK_INTERVAL};
use crate::error::MonitorError;
use crate::monitor::{Monitor, TickOutcome};
use crate::serial::{list_ports, PortEntry, SerialConnector};

/// Without a sample for this long, a running session shows NO DATA.
const STALE_AFTER: Duration = Duration::from_secs(1);

// ---------------- UI Messages ----------------

#[derive(Debug, Clone)]
pub enum Message {
    Start,
    Stop,
    PortChanged(String),
    PortSelected(PortEntry),
    BaudRateChanged(String),
    CsvPathChanged(String),
    CapacityChanged(String),
    YMinChanged(String),
    YMaxChanged(String),
    TickMsChanged(String),
    BrowseCsv,
    SavePlot,
    RefreshPorts,
    Tick,
}

// ---------------- App ----------------

pub struct CurrentMonitorApp {
    monitor: Monitor<SerialConnector>,
    form: SessionForm,
    chart_spec: ChartSpec,
    tick_interval: Duration,

    available_ports: Vec<PortEntry>,
    selected_port: Option<PortEntry>,

    settings_path: PathBuf,
    last_sample_at: Option<Instant>,
    latest_value: Option<f64>,

    // last error (user visible)
    error: Option<String>,
}

impl Default for CurrentMonitorApp {
    fn default() -> Self {
        let chart_spec = ChartSpec::default();
        let mut app = Self {
            monitor: Monitor::new(SerialConnector, chart_spec.capacity),
            form: SessionForm::default(),
            chart_spec,
            tick_interval: TICK_INTERVAL,
            available_ports: Vec::new(),
            selected_port: None,
            settings_path: AppSettings::default_path(),
            last_sample_at: None,
            latest_value: None,
            error: None,
        };

        match AppSettings::load(&app.settings_path) {
            Ok(Some(settings)) => app.form = settings.form,
            Ok(None) => {}
            Err(e) => warn!(error = %e, "could not load settings"),
        }
        if let Ok(spec) = app.form.chart_spec() {
            app.chart_spec = spec;
        }

        app.refresh_ports();
        app
    }
}

impl CurrentMonitorApp {
    pub fn title(&self) -> String {
        "Current Monitor".to_string()
    }

    fn save_settings(&self) {
        let settings = AppSettings {
            form: self.form.clone(),
        };
        if let Err(e) = settings.save(&self.settings_path) {
            warn!(error = %e, "could not save settings");
        }
    }

    fn refresh_ports(&mut self) {
        self.available_ports = list_ports();
        self.selected_port = self
            .available_ports
            .iter()
            .find(|p| p.port_name.eq_ignore_ascii_case(self.form.port.trim()))
            .cloned();
    }

    /// Shows the error in the window and in a modal dialog.
    fn report_error(&mut self, title: &str, e: &MonitorError) {
        warn!(error = %e, "{title}");
        self.error = Some(format!("{title}: {e}"));

        MessageDialog::new()
            .set_level(MessageLevel::Error)
            .set_title(title)
            .set_description(e.to_string())
            .set_buttons(MessageButtons::Ok)
            .show();
    }

    fn start(&mut self) {
        self.error = None;

        // Chart fields are checked before anything is opened.
        let display = self
            .form
            .chart_spec()
            .and_then(|spec| Ok((spec, self.form.tick_interval()?)));
        let (chart_spec, tick_interval) = match display {
            Ok(display) => display,
            Err(e) => return self.report_error("Invalid settings", &MonitorError::Config(e)),
        };

        match self.monitor.start_from_form(&self.form) {
            Ok(()) => {
                self.chart_spec = chart_spec;
                self.tick_interval = tick_interval;
                self.last_sample_at = None;
                self.latest_value = None;
                self.save_settings();
            }
            Err(e @ MonitorError::Config(_)) => self.report_error("Invalid settings", &e),
            Err(e @ MonitorError::Connection { .. }) => {
                self.report_error("Could not open serial port", &e)
            }
            Err(e) => self.report_error("Could not start", &e),
        }
    }

    fn tick(&mut self) {
        match self.monitor.tick() {
            Ok(TickOutcome::Accepted(sample)) => {
                self.last_sample_at = Some(Instant::now());
                self.latest_value = Some(sample.value);
            }
            Ok(TickOutcome::Idle | TickOutcome::NoData | TickOutcome::Rejected(_)) => {}
            Err(e) => self.report_error("Session stopped", &e),
        }
    }

    fn save_plot(&self) -> Result<PathBuf, Box<dyn std::error::Error>> {
        let dir = AppSettings::dir();
        std::fs::create_dir_all(&dir)?;

        let timestamp = Local::now().format("%Y%m%d_%H%M%S").to_string();
        let path = dir.join(format!("current_plot_{timestamp}.png"));
        chart::save_png(&path, &self.monitor.snapshot(), &self.chart_spec)?;
        Ok(path)
    }

    fn make_status_banner(&self) -> (String, Color) {
        let gray = Color::from_rgb8(120, 120, 120);
        let green = Color::from_rgb8(0, 150, 0);
        let amber = Color::from_rgb8(200, 120, 0);

        if !self.monitor.is_running() {
            return ("IDLE".to_string(), gray);
        }

        let fresh = self
            .last_sample_at
            .map(|t| t.elapsed() <= STALE_AFTER)
            .unwrap_or(false);
        if fresh {
            ("RUNNING".to_string(), green)
        } else {
            ("NO DATA".to_string(), amber)
        }
    }

    pub fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::Start => {
                // Start is disabled while running; guard anyway.
                if !self.monitor.is_running() {
                    self.start();
                }
            }

            Message::Stop => {
                if let Some(stats) = self.monitor.stop() {
                    info!(accepted = stats.accepted, dropped = stats.dropped, "stopped by user");
                }
                self.save_settings();
            }

            Message::PortChanged(port) => {
                if self.monitor.is_running() {
                    return Task::none();
                }
                self.form.port = port;
                self.refresh_ports();
            }

            Message::PortSelected(p) => {
                if self.monitor.is_running() {
                    return Task::none();
                }
                self.form.port = p.port_name.clone();
                self.selected_port = Some(p);
            }

            Message::BaudRateChanged(baud) => {
                if !self.monitor.is_running() {
                    self.form.baud_rate = baud;
                }
            }

            Message::CsvPathChanged(path) => {
                if !self.monitor.is_running() {
                    self.form.csv_path = path;
                }
            }

            Message::CapacityChanged(v) => {
                if !self.monitor.is_running() {
                    self.form.capacity = v;
                }
            }

            Message::YMinChanged(v) => {
                if !self.monitor.is_running() {
                    self.form.y_min = v;
                }
            }

            Message::YMaxChanged(v) => {
                if !self.monitor.is_running() {
                    self.form.y_max = v;
                }
            }

            Message::TickMsChanged(v) => {
                if !self.monitor.is_running() {
                    self.form.tick_ms = v;
                }
            }

            Message::BrowseCsv => {
                if self.monitor.is_running() {
                    return Task::none();
                }
                if let Some(path) = FileDialog::new()
                    .add_filter("CSV", &["csv"])
                    .set_file_name(self.form.csv_path.as_str())
                    .save_file()
                {
                    self.form.csv_path = path.to_string_lossy().to_string();
                }
            }

            Message::SavePlot => match self.save_plot() {
                Ok(path) => info!(path = %path.display(), "plot saved"),
                Err(e) => self.error = Some(format!("Save plot failed: {e}")),
            },

            Message::RefreshPorts => self.refresh_ports(),

            Message::Tick => self.tick(),
        }

        Task::none()
    }

    pub fn view(&self) -> Element<'_, Message> {
        fn action_button<'a>(
            label: &'a str,
            enabled: bool,
            msg: Message,
        ) -> iced::widget::Button<'a, Message> {
            let mut b = button(label);
            if enabled {
                b = b.on_press(msg);
            }
            b
        }

        let running = self.monitor.is_running();
        let green = Color::from_rgb8(0, 200, 0);
        let red = Color::from_rgb8(200, 0, 0);

        let session_dot = text("●").size(22.0).color(if running { green } else { red });

        let (banner_text, banner_color) = self.make_status_banner();
        let banner = row![
            text("■").size(28.0).color(banner_color),
            text(banner_text).size(24.0).color(banner_color),
        ]
        .spacing(10)
        .align_y(Alignment::Center);

        let mut port_input = text_input("COM3 or /dev/ttyUSB0", &self.form.port)
            .width(Length::Fixed(220.0));
        let mut baud_input = text_input("9600", &self.form.baud_rate).width(Length::Fixed(110.0));
        let mut csv_input = text_input("current_log.csv", &self.form.csv_path)
            .width(Length::Fixed(420.0));
        let mut capacity_input =
            text_input("100", &self.form.capacity).width(Length::Fixed(80.0));
        let mut y_min_input = text_input("0", &self.form.y_min).width(Length::Fixed(80.0));
        let mut y_max_input = text_input("200", &self.form.y_max).width(Length::Fixed(80.0));
        let mut tick_input = text_input("25", &self.form.tick_ms).width(Length::Fixed(80.0));
        if !running {
            port_input = port_input.on_input(Message::PortChanged);
            baud_input = baud_input.on_input(Message::BaudRateChanged);
            csv_input = csv_input.on_input(Message::CsvPathChanged);
            capacity_input = capacity_input.on_input(Message::CapacityChanged);
            y_min_input = y_min_input.on_input(Message::YMinChanged);
            y_max_input = y_max_input.on_input(Message::YMaxChanged);
            tick_input = tick_input.on_input(Message::TickMsChanged);
        }

        let port_picker: Element<'_, Message> = if running || self.available_ports.is_empty() {
            text(
                self.selected_port
                    .as_ref()
                    .map(|p| p.display.as_str())
                    .unwrap_or(""),
            )
            .into()
        } else {
            pick_list(
                self.available_ports.clone(),
                self.selected_port.clone(),
                Message::PortSelected,
            )
            .placeholder("Detected ports")
            .width(Length::Fixed(320.0))
            .into()
        };

        let latest_text = match self.latest_value {
            Some(v) => format!("{v:.1} mA"),
            None => "---".to_string(),
        };
        let stats = self.monitor.stats();
        let session_text = match self.monitor.session() {
            Some(session) => format!(
                "{} @ {} baud since {}, logging to {}",
                session.config().port,
                session.config().baud_rate,
                session.started_at().format("%H:%M:%S"),
                session.config().csv_path.display()
            ),
            None => String::new(),
        };

        let controls = column![
            row![text("Session:"), session_dot, banner, text(session_text).size(14.0)]
                .spacing(10)
                .align_y(Alignment::Center),
            row![text("Port:"), port_input, port_picker]
                .spacing(10)
                .align_y(Alignment::Center),
            row![
                text("Baud:"),
                baud_input,
                text("CSV file:"),
                csv_input,
                action_button("Browse…", !running, Message::BrowseCsv),
            ]
            .spacing(10)
            .align_y(Alignment::Center),
            row![
                text("Points:"),
                capacity_input,
                text("Y min (mA):"),
                y_min_input,
                text("Y max (mA):"),
                y_max_input,
                text("Tick (ms):"),
                tick_input,
            ]
            .spacing(10)
            .align_y(Alignment::Center),
            row![
                action_button("Start", !running, Message::Start),
                action_button("Stop", running, Message::Stop),
                button("Save Plot").on_press(Message::SavePlot),
            ]
            .spacing(10),
            row![
                text("Current:").size(20.0),
                text(latest_text).size(32.0),
                text(format!("Samples: {}", stats.accepted)).size(16.0),
                text(format!("Dropped lines: {}", stats.dropped)).size(16.0),
            ]
            .spacing(14)
            .align_y(Alignment::Center),
        ]
        .align_x(Alignment::Start)
        .spacing(12)
        .padding(10);

        let mut content = column![controls].align_x(Alignment::Center).spacing(10);

        let chart = CurrentChart {
            values: self.monitor.snapshot(),
            spec: self.chart_spec,
        };

        let plot: Element<Message> = ChartWidget::new(chart)
            .width(Length::Fixed(860.0))
            .height(Length::Fixed(420.0))
            .into();

        content = content.push(plot);

        if let Some(err) = &self.error {
            content = content.push(text(err).color(Color::from_rgb8(255, 0, 0)));
        }

        content.into()
    }

    pub fn subscription(&self) -> Subscription<Message> {
        if self.monitor.is_running() {
            time::every(self.tick_interval).map(|_| Message::Tick)
        } else {
            time::every(Duration::from_secs(2)).map(|_| Message::RefreshPorts)
        }
    }
}

// ---------------- Chart ----------------

struct CurrentChart {
    values: Vec<f64>,
    spec: ChartSpec,
}

impl Chart<Message> for CurrentChart {
    type State = ();

    fn build_chart<DB: DrawingBackend>(
        &self,
        _state: &Self::State,
        builder: plotters_iced::ChartBuilder<DB>,
    ) {
        if let Err(e) = chart::draw(builder, &self.values, &self.spec) {
            warn!(error = %e, "chart redraw failed");
        }
    }
}
