// CurrentMonitor
// Supplied without warranty.
// Use at your own risk.

use std::fs;
use std::path::Path;
use std::time::Duration;

use current_monitor::config::{SessionConfig, SessionForm};
use current_monitor::csv_log::HEADER;
use current_monitor::mock::{ScriptedConnector, ScriptedLink};
use current_monitor::{ConfigError, Monitor, MonitorError, TickOutcome};
use pretty_assertions::assert_eq;

fn session(port: &str, csv: &Path) -> SessionConfig {
    SessionConfig {
        port: port.to_string(),
        baud_rate: 9600,
        csv_path: csv.to_path_buf(),
        capacity: 100,
        read_timeout: Duration::from_millis(5),
    }
}

fn data_rows(csv: &Path) -> Vec<String> {
    let text = fs::read_to_string(csv).unwrap();
    let mut lines = text.lines();
    assert_eq!(lines.next(), Some(HEADER));
    lines.map(str::to_string).collect()
}

#[test]
fn bad_line_between_good_ones_is_dropped() {
    let dir = tempfile::tempdir().unwrap();
    let csv = dir.path().join("current_log.csv");
    let dev = ScriptedLink::default();
    let mut monitor = Monitor::new(ScriptedConnector::new("COM12", dev.clone()), 100);
    monitor.start(session("COM12", &csv)).unwrap();

    for line in ["10.0\n", "bad\n", "20.0\n"] {
        dev.emit(line);
        monitor.tick().unwrap();
    }

    assert_eq!(monitor.snapshot(), vec![10.0, 20.0]);
    let rows = data_rows(&csv);
    assert_eq!(rows.len(), 2);
    assert!(rows[0].ends_with(",10.0"));
    assert!(rows[1].ends_with(",20.0"));
    assert_eq!(monitor.stats().dropped, 1);
}

#[test]
fn backlog_is_skipped_in_favour_of_newest_line() {
    let dir = tempfile::tempdir().unwrap();
    let csv = dir.path().join("log.csv");
    let dev = ScriptedLink::default();
    let mut monitor = Monitor::new(ScriptedConnector::new("COM12", dev.clone()), 100);
    monitor.start(session("COM12", &csv)).unwrap();

    dev.emit("1.0\n2.0\n3.0\n");
    match monitor.tick().unwrap() {
        TickOutcome::Accepted(sample) => assert_eq!(sample.value, 3.0),
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(monitor.tick().unwrap(), TickOutcome::NoData);

    assert_eq!(monitor.snapshot(), vec![3.0]);
    assert_eq!(data_rows(&csv).len(), 1);
}

#[test]
fn invalid_baud_rate_stays_idle() {
    let dir = tempfile::tempdir().unwrap();
    let csv = dir.path().join("never.csv");
    let connector = ScriptedConnector::new("COM12", ScriptedLink::default());
    let mut monitor = Monitor::new(connector.clone(), 100);

    let form = SessionForm {
        port: "COM12".to_string(),
        baud_rate: "abc".to_string(),
        csv_path: csv.to_string_lossy().to_string(),
        ..SessionForm::default()
    };
    let err = monitor.start_from_form(&form).unwrap_err();

    assert!(matches!(
        err,
        MonitorError::Config(ConfigError::BaudRate(ref b)) if b == "abc"
    ));
    assert!(!monitor.is_running());
    assert_eq!(connector.connects(), 0);
    assert!(!csv.exists());
}

#[test]
fn restart_clears_buffer_and_reacquires_port() {
    let dir = tempfile::tempdir().unwrap();
    let csv = dir.path().join("log.csv");
    let dev = ScriptedLink::default();
    let mut monitor = Monitor::new(ScriptedConnector::new("COM12", dev.clone()), 100);

    monitor.start(session("COM12", &csv)).unwrap();
    dev.emit("5.0\n");
    monitor.tick().unwrap();
    assert_eq!(monitor.snapshot(), vec![5.0]);

    let stats = monitor.stop().unwrap();
    assert_eq!(stats.accepted, 1);
    assert_eq!(dev.open_handles(), 0);
    assert_eq!(monitor.stop(), None);
    assert_eq!(monitor.tick().unwrap(), TickOutcome::Idle);

    monitor.start(session("COM12", &csv)).unwrap();
    assert!(monitor.is_running());
    assert!(monitor.snapshot().is_empty());
    assert_eq!(dev.open_handles(), 1);

    dev.emit("6.0\n");
    monitor.tick().unwrap();
    assert_eq!(monitor.snapshot(), vec![6.0]);

    // Same file across sessions: one header, rows from both.
    assert_eq!(data_rows(&csv).len(), 2);
}

#[test]
fn unknown_port_is_connection_error() {
    let dir = tempfile::tempdir().unwrap();
    let csv = dir.path().join("log.csv");
    let mut monitor = Monitor::new(ScriptedConnector::new("COM12", ScriptedLink::default()), 100);

    let err = monitor.start(session("COM3", &csv)).unwrap_err();
    assert!(matches!(err, MonitorError::Connection { .. }));
    assert!(!monitor.is_running());
    assert!(!csv.exists());
}

#[test]
fn form_capacity_sizes_the_buffer() {
    let dir = tempfile::tempdir().unwrap();
    let dev = ScriptedLink::default();
    let mut monitor = Monitor::new(ScriptedConnector::new("COM12", dev.clone()), 100);

    let form = SessionForm {
        port: "COM12".to_string(),
        csv_path: dir.path().join("log.csv").to_string_lossy().to_string(),
        capacity: "3".to_string(),
        ..SessionForm::default()
    };
    monitor.start_from_form(&form).unwrap();
    assert_eq!(monitor.buffer().capacity(), 3);

    for v in ["1.0", "2.0", "3.0", "4.0"] {
        dev.emit(&format!("{v}\n"));
        monitor.tick().unwrap();
    }
    assert_eq!(monitor.snapshot(), vec![2.0, 3.0, 4.0]);
}
