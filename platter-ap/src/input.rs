//! Pulse input from the platter's rotary sensor
//!
//! The sensor sends single bytes over a serial character device. A dedicated
//! reader thread blocks on the device, stamps each byte with the wall-clock
//! millisecond it arrived at and forwards it over a channel, so pulses reach
//! the controller in arrival order and are never re-timed downstream.

use crate::error::{Error, Result};
use platter_common::time::current_timestamp_ms;
use std::fs::OpenOptions;
use std::io::{ErrorKind, Read};
use std::path::Path;
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, info, trace, warn};

/// Default pulse device
pub const DEFAULT_INPUT_DEVICE: &str = "/dev/ttyS0";

/// One byte received from the sensor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pulse {
    /// Raw byte value
    pub byte: u8,
    /// Arrival time in wall-clock milliseconds
    pub at_ms: i64,
}

/// Receiving end of the pulse reader.
pub struct PulseInput {
    rx: UnboundedReceiver<Pulse>,
    name: String,
    closed: bool,
}

impl PulseInput {
    /// Open a character device read-only and start reading pulses from it.
    ///
    /// # Errors
    /// - The device cannot be opened
    /// - The reader thread cannot be spawned
    pub fn open(path: &Path) -> Result<Self> {
        let device = device_options()
            .open(path)
            .map_err(|e| Error::Input(format!("Failed to open {}: {}", path.display(), e)))?;

        info!("Reading pulses from {}", path.display());
        Self::spawn(device, path.display().to_string())
    }

    /// Start a reader thread over any byte source.
    pub fn spawn<R>(reader: R, name: impl Into<String>) -> Result<Self>
    where
        R: Read + Send + 'static,
    {
        let name = name.into();
        let (tx, rx) = mpsc::unbounded_channel();

        let thread_name = name.clone();
        std::thread::Builder::new()
            .name("pulse-reader".to_string())
            .spawn(move || read_pulses(reader, tx, &thread_name))
            .map_err(|e| Error::Input(format!("Failed to spawn pulse reader: {}", e)))?;

        Ok(Self::from_receiver(rx, name))
    }

    /// Wrap an existing pulse channel.
    pub fn from_receiver(rx: UnboundedReceiver<Pulse>, name: impl Into<String>) -> Self {
        PulseInput {
            rx,
            name: name.into(),
            closed: false,
        }
    }

    /// Wait up to `timeout` for the next pulse.
    ///
    /// Returns `None` on timeout. Once the reader has stopped this still
    /// waits out the full timeout, so callers never spin.
    pub async fn recv_timeout(&mut self, timeout: Duration) -> Option<Pulse> {
        if self.closed {
            tokio::time::sleep(timeout).await;
            return None;
        }

        match tokio::time::timeout(timeout, self.rx.recv()).await {
            Ok(Some(pulse)) => Some(pulse),
            Ok(None) => {
                warn!("Pulse input {} closed; holding nominal decay", self.name);
                self.closed = true;
                tokio::time::sleep(timeout).await;
                None
            }
            Err(_) => None,
        }
    }

    /// Device or source name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the reader has stopped and all pulses were drained
    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl Drop for PulseInput {
    fn drop(&mut self) {
        // A reader blocked in read() exits on its next send
        self.rx.close();
        debug!("Pulse input {} released", self.name);
    }
}

/// Read-only, and never adopted as the controlling terminal, so a line
/// hangup on the port cannot send SIGHUP to the player.
fn device_options() -> OpenOptions {
    let mut options = OpenOptions::new();
    options.read(true);

    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.custom_flags(libc::O_NOCTTY);
    }

    options
}

/// Reader thread body: one byte per read, stamped on arrival.
fn read_pulses<R: Read>(mut reader: R, tx: UnboundedSender<Pulse>, name: &str) {
    let mut byte = [0u8; 1];

    loop {
        match reader.read(&mut byte) {
            Ok(0) => {
                debug!("Pulse input {} reached end of stream", name);
                break;
            }
            Ok(_) => {
                let pulse = Pulse {
                    byte: byte[0],
                    at_ms: current_timestamp_ms(),
                };
                trace!("Pulse {:?}", pulse);
                if tx.send(pulse).is_err() {
                    break;
                }
            }
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) if e.kind() == ErrorKind::WouldBlock => {
                std::thread::sleep(Duration::from_millis(1));
            }
            Err(e) => {
                warn!("Pulse input {} read failed: {}", name, e);
                break;
            }
        }
    }
}
