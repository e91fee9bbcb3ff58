//! # Forward Loop
//!
//! ```text
//!          ┌──────────────────────────────────────────────────────────┐
//!          │ session                                                  │
//!          │  spawn_blocking: open port, pump_lines ──► mpsc ──► push │
//!          └───────────────────────────┬──────────────────────────────┘
//!                                      │ device lost / open failed
//!                                      ▼
//!                  retries == 0 ? ── yes ──► Err(RetriesExhausted)
//!                          │ no (negative retries never run out)
//!                          ▼
//!                  wait 2 s, re-detect when --auto, next session
//! ```
//!
//! Serial reads block, so each session runs the device on the blocking pool
//! and hands codes over a channel. Dropping the receiver ends the reader at
//! its next read timeout.

use std::sync::Arc;
use std::time::Duration;

use inventario_scanner::{pump_lines, select_forwarder_port, PortSettings, ScannerResult, SerialBackend};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{error, info, warn};

use crate::error::{ForwarderError, ForwarderResult};
use crate::push::Pusher;

/// Interval between port enumerations while detecting.
pub const DETECT_POLL: Duration = Duration::from_millis(500);

/// Detection window at startup.
pub const DETECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Detection window after a connection loss.
pub const REDETECT_TIMEOUT: Duration = Duration::from_secs(5);

pub const RETRY_DELAY: Duration = Duration::from_secs(2);

/// Polls the port list until a scanner-looking port shows up.
///
/// Checks at least once; `None` when `timeout` passes with no match.
pub async fn detect_port(
    backend: &dyn SerialBackend,
    filter: Option<&str>,
    timeout: Duration,
) -> Option<String> {
    let deadline = Instant::now() + timeout;
    loop {
        let ports = backend.list_ports().unwrap_or_else(|e| {
            warn!(error = %e, "Could not list serial ports");
            Vec::new()
        });
        if let Some(port) = select_forwarder_port(&ports, filter) {
            return Some(port);
        }
        if Instant::now() >= deadline {
            return None;
        }
        tokio::time::sleep(DETECT_POLL).await;
    }
}

/// Reads one port and pushes every code until the device goes away.
pub struct Forwarder {
    backend: Arc<dyn SerialBackend>,
    settings: PortSettings,
    pusher: Pusher,
    /// Re-detect the port after a loss.
    auto: bool,
    filter: Option<String>,
    /// Reconnect budget; negative means unlimited.
    retries: i64,
    retry_delay: Duration,
}

impl Forwarder {
    pub fn new(backend: Arc<dyn SerialBackend>, settings: PortSettings, pusher: Pusher) -> Self {
        Forwarder {
            backend,
            settings,
            pusher,
            auto: false,
            filter: None,
            retries: 5,
            retry_delay: RETRY_DELAY,
        }
    }

    pub fn auto_detect(mut self, auto: bool, filter: Option<String>) -> Self {
        self.auto = auto;
        self.filter = filter;
        self
    }

    pub fn retries(mut self, retries: i64) -> Self {
        self.retries = retries;
        self
    }

    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Runs sessions on `port` until the retry budget is spent.
    pub async fn run(mut self, mut port: String) -> ForwarderResult<()> {
        loop {
            match self.session(&port).await {
                Ok(pushed) => warn!(port = %port, pushed, "Serial connection lost"),
                Err(e) => error!(port = %port, error = %e, "Serial session failed"),
            }

            if self.retries == 0 {
                return Err(ForwarderError::RetriesExhausted);
            }
            if self.retries > 0 {
                self.retries -= 1;
            }

            info!(delay_ms = self.retry_delay.as_millis() as u64, "Retrying serial connection");
            tokio::time::sleep(self.retry_delay).await;

            if self.auto {
                if let Some(found) = detect_port(self.backend.as_ref(), self.filter.as_deref(), REDETECT_TIMEOUT).await {
                    if found != port {
                        info!(port = %found, "Auto-detected new port");
                    }
                    port = found;
                }
            }
        }
    }

    /// One open-read cycle.
    ///
    /// ## Returns
    /// * `Ok(n)` - Codes forwarded before the device went away
    /// * `Err(Serial)` - The port could not be opened
    pub async fn session(&self, port: &str) -> ForwarderResult<usize> {
        info!(port = %port, baud = self.settings.baud, dtr = %self.settings.dtr, "Opening serial port");

        let (tx, mut rx) = mpsc::unbounded_channel::<String>();
        let backend = self.backend.clone();
        let settings = self.settings;
        let port_name = port.to_string();

        let reader = tokio::task::spawn_blocking(move || -> ScannerResult<()> {
            let mut device = backend.open(&port_name, &settings)?;
            pump_lines(&mut device, || !tx.is_closed(), |code| {
                let _ = tx.send(code);
            })?;
            Ok(())
        });

        let mut pushed = 0;
        while let Some(code) = rx.recv().await {
            info!(code = %code, "Scanned");
            match self.pusher.push(&code).await {
                Ok(()) => pushed += 1,
                Err(e) => warn!(code = %code, error = %e, "Could not forward scan"),
            }
        }

        match reader.await {
            Ok(Ok(())) => Ok(pushed),
            Ok(Err(e)) if pushed == 0 && !matches!(e, inventario_scanner::ScannerError::Io(_)) => Err(e.into()),
            Ok(Err(e)) => {
                warn!(port = %port, error = %e, "Serial read failed");
                Ok(pushed)
            }
            Err(e) => Err(ForwarderError::Io(std::io::Error::other(e.to_string()))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::push::test_server;
    use inventario_scanner::{PortInfo, ScannerError, SerialDevice};
    use std::collections::VecDeque;
    use std::io::{self, Cursor, Read};
    use std::sync::Mutex;

    /// Yields its script, then reports the device unplugged.
    struct Unplugging(Cursor<Vec<u8>>);

    impl Read for Unplugging {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.0.read(buf)? {
                0 => Err(io::Error::new(io::ErrorKind::BrokenPipe, "unplugged")),
                n => Ok(n),
            }
        }
    }

    struct FakeBackend {
        ports: Vec<PortInfo>,
        scripts: Mutex<VecDeque<&'static str>>,
        opened: Mutex<Vec<String>>,
    }

    impl FakeBackend {
        fn new(ports: Vec<PortInfo>, scripts: Vec<&'static str>) -> Arc<Self> {
            Arc::new(FakeBackend {
                ports,
                scripts: Mutex::new(scripts.into()),
                opened: Mutex::new(Vec::new()),
            })
        }
    }

    impl SerialBackend for FakeBackend {
        fn list_ports(&self) -> ScannerResult<Vec<PortInfo>> {
            Ok(self.ports.clone())
        }

        fn open(&self, port: &str, _settings: &PortSettings) -> ScannerResult<SerialDevice> {
            self.opened.lock().unwrap().push(port.to_string());
            match self.scripts.lock().unwrap().pop_front() {
                Some(script) => Ok(Box::new(Unplugging(Cursor::new(script.as_bytes().to_vec())))),
                None => Err(ScannerError::Open {
                    port: port.to_string(),
                    reason: "gone".into(),
                }),
            }
        }
    }

    fn scanner_port(name: &str) -> PortInfo {
        PortInfo {
            name: name.into(),
            description: Some("Honeywell Barcode Scanner".into()),
            hardware_id: None,
        }
    }

    #[tokio::test]
    async fn test_detect_port() {
        let backend = FakeBackend::new(vec![PortInfo::named("COM1"), scanner_port("COM5")], vec![]);
        assert_eq!(
            detect_port(backend.as_ref(), None, Duration::ZERO).await.as_deref(),
            Some("COM5")
        );
        assert_eq!(
            detect_port(backend.as_ref(), Some("com1"), Duration::ZERO).await.as_deref(),
            Some("COM1")
        );

        let empty = FakeBackend::new(vec![PortInfo::named("COM1")], vec![]);
        assert_eq!(detect_port(empty.as_ref(), None, Duration::ZERO).await, None);
    }

    #[tokio::test]
    async fn test_session_forwards_codes() {
        let (port, mut bodies) = test_server::spawn(200, 2).await;
        let backend = FakeBackend::new(vec![], vec!["ABC123\r\n\nXYZ999\n"]);
        let forwarder = Forwarder::new(backend, PortSettings::default(), Pusher::new("127.0.0.1", port).unwrap());

        let pushed = forwarder.session("COM5").await.unwrap();
        assert_eq!(pushed, 2);
        assert!(bodies.recv().await.unwrap().contains("ABC123"));
        assert!(bodies.recv().await.unwrap().contains("XYZ999"));
    }

    #[tokio::test]
    async fn test_open_failure_is_an_error() {
        let backend = FakeBackend::new(vec![], vec![]);
        let forwarder = Forwarder::new(backend, PortSettings::default(), Pusher::new("127.0.0.1", 9).unwrap());
        assert!(matches!(
            forwarder.session("COM5").await,
            Err(ForwarderError::Serial(ScannerError::Open { .. }))
        ));
    }

    #[tokio::test]
    async fn test_retries_run_out() {
        let backend = FakeBackend::new(vec![scanner_port("COM7")], vec!["", ""]);
        let forwarder = Forwarder::new(backend.clone(), PortSettings::default(), Pusher::new("127.0.0.1", 9).unwrap())
            .auto_detect(true, None)
            .retries(2)
            .retry_delay(Duration::from_millis(1));

        let result = forwarder.run("COM5".to_string()).await;
        assert!(matches!(result, Err(ForwarderError::RetriesExhausted)));
        // First session on the given port, then two on the re-detected one.
        assert_eq!(*backend.opened.lock().unwrap(), vec!["COM5", "COM7", "COM7"]);
    }
}
