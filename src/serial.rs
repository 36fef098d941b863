// CurrentMonitor
// Supplied without warranty.
// Use at your own risk.

//! Line-oriented access to the sensor's serial port.
//!
//! The device prints one decimal value per line and never waits for us, so the
//! reader favours recency: [`SerialReader::skip_to_latest`] throws away every
//! complete line except the newest before each read.

use std::io::{self, Read};
use std::time::{Duration, Instant};

use serialport::{SerialPort, SerialPortType};
use tracing::{debug, info};

use crate::error::{MonitorError, Result};

/// Longest unterminated tail kept between reads. Anything older is noise: a
/// line this long can never parse as a reading.
pub const MAX_PARTIAL_LINE: usize = 256;

/// A byte stream that can report how much input is already buffered.
pub trait Link: Read + Send {
    /// Bytes that can be read right now without waiting.
    fn bytes_available(&self) -> io::Result<usize>;
}

impl Link for dyn SerialPort {
    fn bytes_available(&self) -> io::Result<usize> {
        Ok(self.bytes_to_read()? as usize)
    }
}

impl<L: Link + ?Sized> Link for Box<L> {
    fn bytes_available(&self) -> io::Result<usize> {
        (**self).bytes_available()
    }
}

/// Opens the link for a session.
pub trait Connector {
    fn connect(&self, port: &str, baud_rate: u32, timeout: Duration) -> Result<Box<dyn Link>>;
}

/// Connects to real hardware through `serialport`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SerialConnector;

impl Connector for SerialConnector {
    fn connect(&self, port: &str, baud_rate: u32, timeout: Duration) -> Result<Box<dyn Link>> {
        let link: Box<dyn SerialPort> = serialport::new(port, baud_rate)
            .timeout(timeout)
            .open()
            .map_err(|source| MonitorError::Connection {
                port: port.to_string(),
                source,
            })?;
        info!(port, baud_rate, "serial port opened");
        Ok(Box::new(link))
    }
}

pub struct SerialReader<L: Link> {
    link: Option<L>,
    timeout: Duration,
    pending: Vec<u8>,
}

impl SerialReader<Box<dyn Link>> {
    pub fn open(
        connector: &dyn Connector,
        port: &str,
        baud_rate: u32,
        timeout: Duration,
    ) -> Result<Self> {
        let link = connector.connect(port, baud_rate, timeout)?;
        Ok(Self::new(link, timeout))
    }
}

impl<L: Link> SerialReader<L> {
    pub fn new(link: L, timeout: Duration) -> Self {
        Self {
            link: Some(link),
            timeout,
            pending: Vec::new(),
        }
    }

    pub fn is_open(&self) -> bool {
        self.link.is_some()
    }

    /// Drops every buffered complete line except the newest one.
    ///
    /// Returns the number of bytes discarded. A trailing partial line is kept, it
    /// is the start of data newer than anything complete.
    pub fn skip_to_latest(&mut self) -> Result<usize> {
        let link = self.link.as_mut().ok_or(MonitorError::NotOpen)?;

        let available = link.bytes_available()?;
        if available > 0 {
            let start = self.pending.len();
            self.pending.resize(start + available, 0);
            let n = match link.read(&mut self.pending[start..]) {
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::TimedOut => 0,
                Err(e) => {
                    self.pending.truncate(start);
                    return Err(e.into());
                }
            };
            self.pending.truncate(start + n);
        }

        let capped = cap_partial_line(&mut self.pending);

        let Some(last) = self.pending.iter().rposition(|&b| b == b'\n') else {
            return Ok(capped);
        };
        let Some(prev) = self.pending[..last].iter().rposition(|&b| b == b'\n') else {
            return Ok(capped);
        };

        // Keep from just after the second-to-last newline.
        let cut = prev + 1;
        self.pending.drain(..cut);
        debug!(discarded = cut, "skipped serial backlog");
        Ok(cut + capped)
    }

    /// Returns the next complete line without its terminator, or `None` if no
    /// newline arrived within the read timeout.
    pub fn read_line(&mut self) -> Result<Option<String>> {
        if let Some(line) = take_line(&mut self.pending) {
            return Ok(Some(line));
        }

        let link = self.link.as_mut().ok_or(MonitorError::NotOpen)?;
        let deadline = Instant::now() + self.timeout;
        let mut buf = [0u8; 256];

        loop {
            match link.read(&mut buf) {
                // End of stream: nothing more can arrive before the deadline.
                Ok(0) => return Ok(None),
                Ok(n) => {
                    self.pending.extend_from_slice(&buf[..n]);
                    if let Some(line) = take_line(&mut self.pending) {
                        return Ok(Some(line));
                    }
                    cap_partial_line(&mut self.pending);
                }
                Err(e) if e.kind() == io::ErrorKind::TimedOut => {}
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }

            if Instant::now() >= deadline {
                return Ok(None);
            }
        }
    }

    /// Releases the underlying handle. Safe to call more than once.
    pub fn close(&mut self) {
        if self.link.take().is_some() {
            info!("serial port closed");
        }
        self.pending.clear();
    }
}

/// Trims the bytes after the last newline down to [`MAX_PARTIAL_LINE`], keeping
/// the newest. Returns how many bytes were dropped.
fn cap_partial_line(pending: &mut Vec<u8>) -> usize {
    let tail_start = pending
        .iter()
        .rposition(|&b| b == b'\n')
        .map_or(0, |i| i + 1);
    let excess = (pending.len() - tail_start).saturating_sub(MAX_PARTIAL_LINE);
    if excess > 0 {
        pending.drain(tail_start..tail_start + excess);
        debug!(discarded = excess, "dropped unterminated serial input");
    }
    excess
}

/// Removes the first complete line from `pending`, without its terminator.
fn take_line(pending: &mut Vec<u8>) -> Option<String> {
    let end = pending.iter().position(|&b| b == b'\n')?;
    let line: Vec<u8> = pending.drain(..=end).collect();
    let text = String::from_utf8_lossy(&line[..end]);
    Some(text.trim_end_matches('\r').to_string())
}

impl<L: Link> Drop for SerialReader<L> {
    fn drop(&mut self) {
        self.close();
    }
}

// ---------------- Port discovery ----------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortEntry {
    pub port_name: String, // e.g. "COM7"
    pub display: String,   // e.g. "COM7: USB Serial ..."
}

impl std::fmt::Display for PortEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display)
    }
}

fn describe(port_name: &str, port_type: SerialPortType) -> String {
    match port_type {
        SerialPortType::UsbPort(info) => {
            let parts: Vec<String> = [info.manufacturer, info.product]
                .into_iter()
                .flatten()
                .collect();
            if parts.is_empty() {
                format!("{port_name}: USB Serial")
            } else {
                format!("{port_name}: {}", parts.join(" "))
            }
        }
        SerialPortType::BluetoothPort => format!("{port_name}: Bluetooth"),
        SerialPortType::PciPort => format!("{port_name}: PCI"),
        SerialPortType::Unknown => port_name.to_string(),
    }
}

/// Serial ports present on this machine, sorted by label.
pub fn list_ports() -> Vec<PortEntry> {
    let mut out: Vec<PortEntry> = serialport::available_ports()
        .unwrap_or_default()
        .into_iter()
        .map(|p| PortEntry {
            display: describe(&p.port_name, p.port_type),
            port_name: p.port_name,
        })
        .collect();

    out.sort_by(|a, b| a.display.cmp(&b.display));
    out
}
