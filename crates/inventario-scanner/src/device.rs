//! # Serial Devices
//!
//! [`SerialBackend`] is the seam between the worker and the operating
//! system: [`SystemSerial`] talks to real ports through `serialport`, tests
//! plug in scripted devices.
//!
//! [`pump_lines`] is the read loop shared by the server worker and the
//! forwarder.

use std::fmt;
use std::io::{self, Read};
use std::str::FromStr;
use std::thread;
use std::time::Duration;

use inventario_core::framing::LineAssembler;
use serialport::{SerialPort, SerialPortType};
use tracing::{debug, warn};

use crate::discovery::PortInfo;
use crate::error::{ScannerError, ScannerResult};

/// Default line speed for serial-mode scanners.
pub const DEFAULT_BAUD: u32 = 9600;

/// Data Terminal Ready handling on open.
///
/// Some scanners power down when DTR toggles, so `Auto` leaves the line as
/// the driver set it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DtrMode {
    #[default]
    Auto,
    On,
    Off,
}

impl FromStr for DtrMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(DtrMode::Auto),
            "on" => Ok(DtrMode::On),
            "off" => Ok(DtrMode::Off),
            other => Err(format!("invalid DTR mode '{}' (expected auto, on or off)", other)),
        }
    }
}

impl fmt::Display for DtrMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DtrMode::Auto => "auto",
            DtrMode::On => "on",
            DtrMode::Off => "off",
        })
    }
}

/// How a port is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortSettings {
    pub baud: u32,
    pub read_timeout: Duration,
    pub dtr: DtrMode,
}

impl Default for PortSettings {
    fn default() -> Self {
        PortSettings {
            baud: DEFAULT_BAUD,
            read_timeout: Duration::from_secs(1),
            dtr: DtrMode::Auto,
        }
    }
}

/// An open device: a blocking byte source.
pub type SerialDevice = Box<dyn Read + Send>;

/// Port enumeration and opening.
pub trait SerialBackend: Send + Sync + 'static {
    /// Lists the ports currently present.
    fn list_ports(&self) -> ScannerResult<Vec<PortInfo>>;

    /// Opens `port` for reading.
    fn open(&self, port: &str, settings: &PortSettings) -> ScannerResult<SerialDevice>;
}

// =============================================================================
// serialport backend
// =============================================================================

/// Backend for the machine's real serial ports.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemSerial;

impl SerialBackend for SystemSerial {
    fn list_ports(&self) -> ScannerResult<Vec<PortInfo>> {
        let ports = serialport::available_ports().map_err(|e| ScannerError::DriverUnavailable(e.to_string()))?;
        Ok(ports.into_iter().map(port_info).collect())
    }

    fn open(&self, port: &str, settings: &PortSettings) -> ScannerResult<SerialDevice> {
        let mut device = serialport::new(port, settings.baud)
            .timeout(settings.read_timeout)
            .open()
            .map_err(|e| ScannerError::Open {
                port: port.to_string(),
                reason: e.to_string(),
            })?;

        let level = match settings.dtr {
            DtrMode::Auto => None,
            DtrMode::On => Some(true),
            DtrMode::Off => Some(false),
        };
        if let Some(level) = level {
            if let Err(e) = device.write_data_terminal_ready(level) {
                warn!(port = %port, error = %e, "Could not set DTR");
            }
        }

        Ok(Box::new(SystemPort(device)))
    }
}

struct SystemPort(Box<dyn SerialPort>);

impl Read for SystemPort {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.0.read(buf)
    }
}

fn port_info(port: serialport::SerialPortInfo) -> PortInfo {
    let (description, hardware_id) = match &port.port_type {
        SerialPortType::UsbPort(usb) => {
            let description = match (&usb.product, &usb.manufacturer) {
                (Some(product), Some(maker)) => Some(format!("{} ({})", product, maker)),
                (Some(product), None) => Some(product.clone()),
                (None, maker) => maker.clone(),
            };
            let hardware_id = format!(
                "USB VID:PID={:04X}:{:04X} SER={}",
                usb.vid,
                usb.pid,
                usb.serial_number.as_deref().unwrap_or_default()
            );
            (description, Some(hardware_id))
        }
        SerialPortType::PciPort => (Some("PCI".to_string()), None),
        SerialPortType::BluetoothPort => (Some("Bluetooth".to_string()), None),
        SerialPortType::Unknown => (None, None),
    };

    PortInfo {
        name: port.port_name,
        description,
        hardware_id,
    }
}

// =============================================================================
// Read loop
// =============================================================================

/// Reads `device` until `keep_running` turns false or the device fails,
/// handing every framed code to `on_code`.
///
/// Read timeouts and empty reads count as idle time.
///
/// ## Returns
/// * `Ok(())` - Stopped by the caller
/// * `Err(e)` - The device failed; the caller decides whether to reopen
pub fn pump_lines<R, K, F>(device: &mut R, keep_running: K, mut on_code: F) -> io::Result<()>
where
    R: Read + ?Sized,
    K: Fn() -> bool,
    F: FnMut(String),
{
    let mut assembler = LineAssembler::new();
    let mut buf = [0u8; 64];

    while keep_running() {
        match device.read(&mut buf) {
            Ok(0) => thread::sleep(Duration::from_millis(10)),
            Ok(n) => {
                for code in assembler.push_bytes(&buf[..n]) {
                    debug!(code = %code, "Scanned");
                    on_code(code);
                }
            }
            Err(e) if matches!(e.kind(), io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted) => {}
            Err(e) => return Err(e),
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::io::Cursor;

    /// Yields its bytes one chunk per read, then fails.
    struct Chunks(Vec<Vec<u8>>);

    impl Read for Chunks {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.0.is_empty() {
                return Err(io::Error::new(io::ErrorKind::BrokenPipe, "unplugged"));
            }
            let chunk = self.0.remove(0);
            if chunk.is_empty() {
                return Err(io::Error::new(io::ErrorKind::TimedOut, "timeout"));
            }
            buf[..chunk.len()].copy_from_slice(&chunk);
            Ok(chunk.len())
        }
    }

    #[test]
    fn test_pump_frames_across_reads_and_timeouts() {
        let mut device = Chunks(vec![b"ABC".to_vec(), vec![], b"123\r\nXY".to_vec(), b"Z\n".to_vec()]);
        let mut codes = Vec::new();

        let err = pump_lines(&mut device, || true, |c| codes.push(c)).unwrap_err();

        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
        assert_eq!(codes, vec!["ABC123", "XYZ"]);
    }

    #[test]
    fn test_pump_stops_when_asked() {
        let reads = Cell::new(0);
        let mut device = Cursor::new(b"A\nB\n".to_vec());

        let result = pump_lines(
            &mut device,
            || {
                reads.set(reads.get() + 1);
                reads.get() < 3
            },
            |_| {},
        );

        assert!(result.is_ok());
    }

    #[test]
    fn test_dtr_mode_parse() {
        assert_eq!("OFF".parse::<DtrMode>().unwrap(), DtrMode::Off);
        assert_eq!("auto".parse::<DtrMode>().unwrap(), DtrMode::Auto);
        assert!("maybe".parse::<DtrMode>().is_err());
        assert_eq!(DtrMode::On.to_string(), "on");
    }
}
