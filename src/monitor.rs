// CurrentMonitor
// Supplied without warranty.
// Use at your own risk.

//! The acquisition loop shared by the GUI and the headless runner.
//!
//! A [`Monitor`] is either idle or running exactly one session. Each call to
//! [`Monitor::tick`] does one round of: skip backlog, read a line, parse, push to
//! the ring buffer, append to the CSV log.

use std::mem;

use chrono::{DateTime, Local};
use tracing::{debug, info, trace, warn};

use crate::config::{SessionConfig, SessionForm};
use crate::csv_log::CsvLog;
use crate::error::{MonitorError, ParseError, Result};
use crate::ring::RingBuffer;
use crate::sample::Sample;
use crate::serial::{Connector, Link, SerialReader};

/// Resources held between Start and Stop.
pub struct Session {
    config: SessionConfig,
    reader: SerialReader<Box<dyn Link>>,
    log: CsvLog,
    started_at: DateTime<Local>,
}

impl Session {
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn started_at(&self) -> DateTime<Local> {
        self.started_at
    }
}

pub enum SessionState {
    Idle,
    Running(Session),
}

/// Per-session counters. Kept after Stop until the next Start.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub accepted: u64,
    pub dropped: u64,
}

/// What one tick produced.
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// No session is running.
    Idle,
    /// The read timed out without a complete line.
    NoData,
    Accepted(Sample),
    /// A line arrived but was not a number; it was discarded.
    Rejected(ParseError),
}

pub struct Monitor<C: Connector> {
    connector: C,
    state: SessionState,
    buffer: RingBuffer,
    stats: SessionStats,
}

impl<C: Connector> Monitor<C> {
    pub fn new(connector: C, capacity: usize) -> Self {
        Self {
            connector,
            state: SessionState::Idle,
            buffer: RingBuffer::new(capacity),
            stats: SessionStats::default(),
        }
    }

    /// Validates the form and starts a session from it.
    pub fn start_from_form(&mut self, form: &SessionForm) -> Result<()> {
        if self.is_running() {
            return Err(MonitorError::AlreadyRunning);
        }
        let config = form.validate()?;
        self.start(config)
    }

    /// Opens the port, makes sure the log has its header and clears the buffer.
    ///
    /// On failure nothing changes: the monitor stays idle and any handle opened
    /// along the way is released.
    pub fn start(&mut self, config: SessionConfig) -> Result<()> {
        if self.is_running() {
            return Err(MonitorError::AlreadyRunning);
        }
        config.validate()?;

        let reader = SerialReader::open(
            &self.connector,
            &config.port,
            config.baud_rate,
            config.read_timeout,
        )?;
        let log = CsvLog::ensure_header(&config.csv_path)?;

        self.buffer = RingBuffer::new(config.capacity);
        self.stats = SessionStats::default();

        info!(
            port = %config.port,
            baud_rate = config.baud_rate,
            csv = %config.csv_path.display(),
            "session started"
        );
        self.state = SessionState::Running(Session {
            config,
            reader,
            log,
            started_at: Local::now(),
        });
        Ok(())
    }

    /// Ends the session and releases the port. Does nothing when idle.
    pub fn stop(&mut self) -> Option<SessionStats> {
        match mem::replace(&mut self.state, SessionState::Idle) {
            SessionState::Idle => None,
            SessionState::Running(mut session) => {
                session.reader.close();
                info!(
                    accepted = self.stats.accepted,
                    dropped = self.stats.dropped,
                    "session stopped"
                );
                Some(self.stats)
            }
        }
    }

    /// Runs one acquisition round.
    ///
    /// A serial or log error ends the session before it is returned.
    pub fn tick(&mut self) -> Result<TickOutcome> {
        let SessionState::Running(session) = &mut self.state else {
            return Ok(TickOutcome::Idle);
        };

        let outcome = acquire(session, &mut self.buffer, &mut self.stats);
        if let Err(e) = &outcome {
            warn!(error = %e, "acquisition failed, stopping session");
            self.stop();
        }
        outcome
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, SessionState::Running(_))
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn session(&self) -> Option<&Session> {
        match &self.state {
            SessionState::Running(session) => Some(session),
            SessionState::Idle => None,
        }
    }

    pub fn buffer(&self) -> &RingBuffer {
        &self.buffer
    }

    pub fn snapshot(&self) -> Vec<f64> {
        self.buffer.snapshot()
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }
}

fn acquire(
    session: &mut Session,
    buffer: &mut RingBuffer,
    stats: &mut SessionStats,
) -> Result<TickOutcome> {
    session.reader.skip_to_latest()?;

    let Some(line) = session.reader.read_line()? else {
        return Ok(TickOutcome::NoData);
    };

    match Sample::parse(&line) {
        Ok(sample) => {
            // Log first: a sample that never reached the CSV stays off the chart too.
            session.log.append(&sample)?;
            buffer.push(sample.value);
            stats.accepted += 1;
            debug!(value = sample.value, "sample");
            Ok(TickOutcome::Accepted(sample))
        }
        Err(e) => {
            stats.dropped += 1;
            trace!(line = %line, error = %e, "discarded line");
            Ok(TickOutcome::Rejected(e))
        }
    }
}
