//! Serial barcode scanner source.
//!
//! Reads newline-terminated codes from a COM/tty port on a blocking worker
//! thread and publishes them on an mpsc channel. The scanner hardware does
//! the symbology decoding; this module only frames lines.
//!
//! - **Framing**: codes end with `\n` (optionally `\r\n`); codes shorter than
//!   3 or longer than 50 characters are dropped as line noise
//! - **Auto-reconnect**: on read failure the port is reopened after a backoff
//! - **Stop**: cancel the token; the worker exits within one read timeout

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::io::Read;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

const READ_TIMEOUT: Duration = Duration::from_millis(200);
const RECONNECT_BACKOFF: Duration = Duration::from_secs(1);
const MIN_CODE_LEN: usize = 3;
const MAX_CODE_LEN: usize = 50;
const MAX_BUFFER: usize = 512;

#[derive(Debug, Error)]
pub enum ScannerError {
    #[error("Failed to open {port} @ {baud_rate}: {source}")]
    Open {
        port: String,
        baud_rate: u32,
        #[source]
        source: serialport::Error,
    },
    #[error("Failed to list ports: {0}")]
    List(#[source] serialport::Error),
}

/// A decoded code from a scan source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanEvent {
    pub code: String,
    pub source: &'static str,
    pub received_at: DateTime<Utc>,
}

impl ScanEvent {
    pub fn new(code: impl Into<String>, source: &'static str) -> Self {
        Self {
            code: code.into(),
            source,
            received_at: Utc::now(),
        }
    }
}

// ---------------------------------------------------------------------------
// Line framing
// ---------------------------------------------------------------------------

/// Accumulates raw serial text and yields complete codes.
#[derive(Debug, Default)]
pub struct CodeFramer {
    buf: String,
}

impl CodeFramer {
    pub fn push(&mut self, data: &str) -> Vec<String> {
        self.buf.push_str(data);
        let mut codes = Vec::new();

        while let Some(pos) = self.buf.find('\n') {
            let code = self.buf[..pos].trim().to_string();
            self.buf.drain(..=pos);
            if (MIN_CODE_LEN..=MAX_CODE_LEN).contains(&code.len()) {
                codes.push(code);
            } else if !code.is_empty() {
                debug!(len = code.len(), "Dropping malformed scanner line");
            }
        }

        // Prevent unbounded growth when the scanner never sends a newline
        if self.buf.len() > MAX_BUFFER {
            self.buf.clear();
        }
        codes
    }
}

// ---------------------------------------------------------------------------
// Port enumeration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PortInfo {
    pub name: String,
    pub port_type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product: Option<String>,
}

/// List serial ports available on this machine.
pub fn list_ports() -> Result<Vec<PortInfo>, ScannerError> {
    let ports = serialport::available_ports().map_err(ScannerError::List)?;
    Ok(ports
        .into_iter()
        .map(|p| {
            let (port_type, product) = match p.port_type {
                serialport::SerialPortType::UsbPort(usb) => ("usb", usb.product),
                serialport::SerialPortType::BluetoothPort => ("bluetooth", None),
                serialport::SerialPortType::PciPort => ("pci", None),
                serialport::SerialPortType::Unknown => ("unknown", None),
            };
            PortInfo {
                name: p.port_name,
                port_type,
                product,
            }
        })
        .collect())
}

// ---------------------------------------------------------------------------
// Background reader
// ---------------------------------------------------------------------------

fn open(port: &str, baud_rate: u32) -> Result<Box<dyn serialport::SerialPort>, ScannerError> {
    serialport::new(port, baud_rate)
        .timeout(READ_TIMEOUT)
        .open()
        .map_err(|source| ScannerError::Open {
            port: port.to_string(),
            baud_rate,
            source,
        })
}

/// Sleep for `dur` unless cancelled first. Returns `false` when cancelled.
fn sleep_unless_cancelled(cancel: &CancellationToken, dur: Duration) -> bool {
    let step = Duration::from_millis(50);
    let mut slept = Duration::ZERO;
    while slept < dur {
        if cancel.is_cancelled() {
            return false;
        }
        std::thread::sleep(step);
        slept += step;
    }
    !cancel.is_cancelled()
}

/// Open `port` and start publishing scanned codes to `tx`.
///
/// The port is opened before this returns so configuration errors surface
/// immediately. The worker stops when `cancel` fires or the receiver is
/// dropped.
pub fn start(
    port: &str,
    baud_rate: u32,
    tx: mpsc::Sender<ScanEvent>,
    cancel: CancellationToken,
) -> Result<JoinHandle<()>, ScannerError> {
    let serial = open(port, baud_rate)?;
    let port_name = port.to_string();
    info!(port = %port_name, baud = baud_rate, "Serial scanner started");

    Ok(tokio::task::spawn_blocking(move || {
        let mut serial = Some(serial);
        let mut framer = CodeFramer::default();
        let mut buf = [0u8; 256];

        while !cancel.is_cancelled() {
            let Some(port) = serial.as_mut() else {
                if !sleep_unless_cancelled(&cancel, RECONNECT_BACKOFF) {
                    break;
                }
                match open(&port_name, baud_rate) {
                    Ok(p) => {
                        info!(port = %port_name, "Serial scanner reconnected");
                        serial = Some(p);
                    }
                    Err(e) => warn!(error = %e, "Serial scanner reconnect failed"),
                }
                continue;
            };

            match port.read(&mut buf) {
                Ok(0) => {}
                Ok(n) => {
                    let text = String::from_utf8_lossy(&buf[..n]);
                    for code in framer.push(&text) {
                        info!(code = %code, "Serial scanner: code detected");
                        if tx.blocking_send(ScanEvent::new(code, "serial")).is_err() {
                            info!("Scan receiver dropped, stopping serial scanner");
                            return;
                        }
                    }
                }
                Err(ref e) if e.kind() == std::io::ErrorKind::TimedOut => {}
                Err(e) => {
                    warn!(port = %port_name, error = %e, "Serial scanner read error");
                    serial = None;
                    framer = CodeFramer::default();
                }
            }
        }

        info!(port = %port_name, "Serial scanner stopped");
    }))
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_framer_splits_lines() {
        let mut f = CodeFramer::default();
        assert!(f.push("8901").is_empty());
        assert_eq!(f.push("234\r\nP1\n12345\n"), vec!["8901234", "12345"]);
    }

    #[test]
    fn test_framer_drops_out_of_range_codes() {
        let mut f = CodeFramer::default();
        let long = "9".repeat(MAX_CODE_LEN + 1);
        assert!(f.push(&format!("ab\n{long}\n\n")).is_empty());
        assert_eq!(f.push("abc\n"), vec!["abc"]);
    }

    #[test]
    fn test_framer_bounds_buffer() {
        let mut f = CodeFramer::default();
        f.push(&"x".repeat(MAX_BUFFER + 1));
        // The runaway prefix is discarded, the next code frames cleanly.
        assert_eq!(f.push("P100\n"), vec!["P100"]);
    }

    #[test]
    fn test_open_missing_port_fails() {
        let (tx, _rx) = mpsc::channel(1);
        let err = start(
            "/dev/does-not-exist-pos-cart",
            9600,
            tx,
            CancellationToken::new(),
        )
        .unwrap_err();
        assert!(matches!(err, ScannerError::Open { .. }));
    }

    #[test]
    fn test_scan_event_serializes() {
        let v = serde_json::to_value(ScanEvent::new("8901", "serial")).unwrap();
        assert_eq!(v["code"], "8901");
        assert_eq!(v["source"], "serial");
        assert!(v["receivedAt"].is_string());
    }
}
