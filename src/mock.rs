// CurrentMonitor
// Supplied without warranty.
// Use at your own risk.

//! In-memory stand-in for the sensor, for tests and demos without hardware.

use std::collections::{HashSet, VecDeque};
use std::io::{self, Read};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::error::{MonitorError, Result};
use crate::serial::{Connector, Link};

/// The reader's end of a fake serial line. Clones share the same byte queue, so
/// one clone can play the device while another is handed to a reader.
#[derive(Clone, Default)]
pub struct ScriptedLink {
    rx: Arc<Mutex<VecDeque<u8>>>,
    open: Arc<Mutex<usize>>,
}

impl ScriptedLink {
    /// Queues text as if the device had just sent it.
    pub fn emit(&self, text: &str) {
        self.emit_bytes(text.as_bytes());
    }

    pub fn emit_bytes(&self, bytes: &[u8]) {
        if let Ok(mut rx) = self.rx.lock() {
            rx.extend(bytes);
        }
    }

    /// Number of live handles that were produced by [`ScriptedConnector`].
    pub fn open_handles(&self) -> usize {
        self.open.lock().map(|n| *n).unwrap_or(0)
    }

    fn handle(&self) -> ScriptedHandle {
        if let Ok(mut n) = self.open.lock() {
            *n += 1;
        }
        ScriptedHandle { link: self.clone() }
    }
}

impl Read for ScriptedLink {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut rx = self
            .rx
            .lock()
            .map_err(|_| io::Error::other("scripted link poisoned"))?;
        if rx.is_empty() {
            return Err(io::Error::new(io::ErrorKind::TimedOut, "no data"));
        }
        let n = buf.len().min(rx.len());
        for (slot, byte) in buf.iter_mut().zip(rx.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }
}

impl Link for ScriptedLink {
    fn bytes_available(&self) -> io::Result<usize> {
        self.rx
            .lock()
            .map(|rx| rx.len())
            .map_err(|_| io::Error::other("scripted link poisoned"))
    }
}

/// A connected handle; dropping it counts as closing the port.
struct ScriptedHandle {
    link: ScriptedLink,
}

impl Read for ScriptedHandle {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.link.read(buf)
    }
}

impl Link for ScriptedHandle {
    fn bytes_available(&self) -> io::Result<usize> {
        self.link.bytes_available()
    }
}

impl Drop for ScriptedHandle {
    fn drop(&mut self) {
        if let Ok(mut n) = self.link.open.lock() {
            *n = n.saturating_sub(1);
        }
    }
}

/// Hands out [`ScriptedLink`] handles for known port names and refuses the rest.
#[derive(Clone, Default)]
pub struct ScriptedConnector {
    ports: Arc<Mutex<HashSet<String>>>,
    link: ScriptedLink,
    connects: Arc<Mutex<usize>>,
}

impl ScriptedConnector {
    /// A connector that accepts `port` and feeds it from `link`.
    pub fn new(port: &str, link: ScriptedLink) -> Self {
        let connector = Self {
            link,
            ..Self::default()
        };
        if let Ok(mut ports) = connector.ports.lock() {
            ports.insert(port.to_string());
        }
        connector
    }

    /// How many times a connection was attempted.
    pub fn connects(&self) -> usize {
        self.connects.lock().map(|n| *n).unwrap_or(0)
    }
}

impl Connector for ScriptedConnector {
    fn connect(&self, port: &str, _baud_rate: u32, _timeout: Duration) -> Result<Box<dyn Link>> {
        if let Ok(mut n) = self.connects.lock() {
            *n += 1;
        }
        let known = self
            .ports
            .lock()
            .map(|ports| ports.contains(port))
            .unwrap_or(false);
        if !known {
            return Err(MonitorError::Connection {
                port: port.to_string(),
                source: serialport::Error::new(serialport::ErrorKind::NoDevice, "no such device"),
            });
        }
        Ok(Box::new(self.link.handle()))
    }
}
