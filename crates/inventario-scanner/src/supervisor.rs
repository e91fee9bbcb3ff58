//! # Scanner Supervisor
//!
//! Owns the background read worker and the scan mailbox.
//!
//! ## Worker Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  start() ── running? ──yes──► AlreadyRunning                            │
//! │     │                                                                   │
//! │     no                                                                  │
//! │     ▼                                                                   │
//! │  list ports ── error ──► DriverUnavailable   none ──► NoDevice          │
//! │     │                                                                   │
//! │     ▼                                                                   │
//! │  spawn "scanner-worker" thread                                          │
//! │     │                                                                   │
//! │     ▼                                                                   │
//! │  ┌────────► open port ──► pump_lines ──► code ──► mailbox.store()      │
//! │  │              │              │                                        │
//! │  │           error          error                                       │
//! │  │              └──────┬───────┘                                        │
//! │  │                     ▼                                                │
//! │  └──── rediscover ◄── sleep 1 s                                         │
//! │                                                                         │
//! │  stop() clears the running flag; the worker exits within one read      │
//! │  timeout (or one reconnect delay).                                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::device::{pump_lines, PortSettings, SerialBackend};
use crate::discovery::select_server_port;
use crate::error::{ScannerError, ScannerResult};
use crate::mailbox::ScanMailbox;

/// Result of [`ScannerSupervisor::start`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartOutcome {
    /// A worker was spawned on this port.
    Started { port: String },
    /// A worker was already running; nothing changed.
    AlreadyRunning,
}

/// Starts, stops and reads the scanner worker.
pub struct ScannerSupervisor {
    backend: Arc<dyn SerialBackend>,
    settings: PortSettings,
    reconnect_delay: Duration,
    mailbox: ScanMailbox,
    /// Stop flag of the current worker. Each worker gets its own flag, so a
    /// stopped worker still winding down is never revived by a restart.
    current: Mutex<Option<Arc<AtomicBool>>>,
}

impl ScannerSupervisor {
    /// Creates a stopped supervisor.
    pub fn new(backend: Arc<dyn SerialBackend>, settings: PortSettings) -> Self {
        ScannerSupervisor {
            backend,
            settings,
            reconnect_delay: Duration::from_secs(1),
            mailbox: ScanMailbox::new(),
            current: Mutex::new(None),
        }
    }

    /// Overrides the pause between a device error and the next open.
    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    /// Starts the worker on the best available port.
    ///
    /// ## Returns
    /// * `Ok(Started { port })` / `Ok(AlreadyRunning)`
    /// * `Err(NoDevice)` - No serial port at all
    /// * `Err(DriverUnavailable)` - Port enumeration failed
    pub fn start(&self) -> ScannerResult<StartOutcome> {
        let mut current = self.current();
        if current.as_ref().is_some_and(|flag| flag.load(Ordering::SeqCst)) {
            return Ok(StartOutcome::AlreadyRunning);
        }

        let ports = self.backend.list_ports()?;
        let port = select_server_port(&ports).ok_or(ScannerError::NoDevice)?;

        let running = Arc::new(AtomicBool::new(true));
        let worker = Worker {
            backend: Arc::clone(&self.backend),
            settings: self.settings,
            reconnect_delay: self.reconnect_delay,
            mailbox: self.mailbox.clone(),
            running: Arc::clone(&running),
        };
        let first_port = port.clone();
        thread::Builder::new()
            .name("scanner-worker".into())
            .spawn(move || worker.run(first_port))?;

        *current = Some(running);
        info!(port = %port, baud = self.settings.baud, "Scanner started");
        Ok(StartOutcome::Started { port })
    }

    fn current(&self) -> MutexGuard<'_, Option<Arc<AtomicBool>>> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Asks the worker to stop. Returns whether it was running.
    pub fn stop(&self) -> bool {
        let was_running = self
            .current()
            .take()
            .is_some_and(|flag| flag.swap(false, Ordering::SeqCst));
        if was_running {
            info!("Scanner stop requested");
        }
        was_running
    }

    pub fn is_running(&self) -> bool {
        self.current()
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::SeqCst))
    }

    /// Reads and clears the latest scan.
    pub fn take_last_scanned(&self) -> Option<String> {
        self.mailbox.take()
    }

    /// Stores a code received from elsewhere (network push or simulation).
    pub fn push_scan(&self, code: &str) -> ScannerResult<String> {
        self.mailbox.push(code)
    }

    /// A handle to the mailbox the worker writes.
    pub fn mailbox(&self) -> ScanMailbox {
        self.mailbox.clone()
    }
}

impl Drop for ScannerSupervisor {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for ScannerSupervisor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScannerSupervisor")
            .field("settings", &self.settings)
            .field("running", &self.is_running())
            .finish()
    }
}

// =============================================================================
// Worker
// =============================================================================

struct Worker {
    backend: Arc<dyn SerialBackend>,
    settings: PortSettings,
    reconnect_delay: Duration,
    mailbox: ScanMailbox,
    running: Arc<AtomicBool>,
}

impl Worker {
    fn keep_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn run(self, first_port: String) {
        let mut port = Some(first_port);

        while self.keep_running() {
            match port.as_deref() {
                Some(name) => match self.backend.open(name, &self.settings) {
                    Ok(mut device) => {
                        debug!(port = %name, "Serial port opened");
                        let mailbox = &self.mailbox;
                        match pump_lines(&mut *device, || self.keep_running(), |code| mailbox.store(code)) {
                            Ok(()) => break,
                            Err(e) => warn!(port = %name, error = %e, "Serial read failed"),
                        }
                    }
                    Err(e) => warn!(port = %name, error = %e, "Serial open failed"),
                },
                None => debug!("No serial port present"),
            }

            thread::sleep(self.reconnect_delay);

            port = match self.backend.list_ports() {
                Ok(ports) => select_server_port(&ports),
                Err(e) => {
                    warn!(error = %e, "Port enumeration failed");
                    None
                }
            };
        }

        info!("Scanner worker stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::SerialDevice;
    use crate::discovery::PortInfo;
    use std::collections::VecDeque;
    use std::io::{self, Read};
    use std::time::Instant;

    /// Replays scripted bytes, then idles until dropped.
    struct ScriptedDevice {
        data: VecDeque<u8>,
        fail_when_empty: bool,
    }

    impl Read for ScriptedDevice {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.data.is_empty() {
                if self.fail_when_empty {
                    return Err(io::Error::new(io::ErrorKind::BrokenPipe, "unplugged"));
                }
                thread::sleep(Duration::from_millis(5));
                return Err(io::Error::new(io::ErrorKind::TimedOut, "timeout"));
            }
            let n = buf.len().min(self.data.len());
            for slot in buf.iter_mut().take(n) {
                *slot = self.data.pop_front().unwrap_or_default();
            }
            Ok(n)
        }
    }

    /// Each open consumes the next script; `None` makes that open fail.
    struct FakeBackend {
        ports: Result<Vec<PortInfo>, ()>,
        opens: Mutex<VecDeque<Option<(&'static str, bool)>>>,
    }

    impl FakeBackend {
        fn new(opens: Vec<Option<(&'static str, bool)>>) -> Self {
            FakeBackend {
                ports: Ok(vec![PortInfo {
                    name: "COM7".into(),
                    description: Some("USB Serial Device".into()),
                    hardware_id: None,
                }]),
                opens: Mutex::new(opens.into()),
            }
        }
    }

    impl SerialBackend for FakeBackend {
        fn list_ports(&self) -> ScannerResult<Vec<PortInfo>> {
            self.ports
                .clone()
                .map_err(|_| ScannerError::DriverUnavailable("no driver".into()))
        }

        fn open(&self, port: &str, _settings: &PortSettings) -> ScannerResult<SerialDevice> {
            match self.opens.lock().unwrap().pop_front().flatten() {
                Some((bytes, fail_when_empty)) => Ok(Box::new(ScriptedDevice {
                    data: bytes.bytes().collect(),
                    fail_when_empty,
                })),
                None => Err(ScannerError::Open {
                    port: port.into(),
                    reason: "busy".into(),
                }),
            }
        }
    }

    fn supervisor(backend: FakeBackend) -> ScannerSupervisor {
        ScannerSupervisor::new(Arc::new(backend), PortSettings::default())
            .with_reconnect_delay(Duration::from_millis(10))
    }

    fn wait_for_scan(supervisor: &ScannerSupervisor, expected: &str) {
        let deadline = Instant::now() + Duration::from_secs(2);
        while supervisor.mailbox().peek().as_deref() != Some(expected) {
            assert!(Instant::now() < deadline, "scan {expected} never arrived");
            thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn test_worker_overwrites_pushed_code() {
        let scanner = supervisor(FakeBackend::new(vec![Some(("XYZ999\r\n", false))]));

        scanner.push_scan("ABC123").unwrap();
        assert_eq!(scanner.start().unwrap(), StartOutcome::Started { port: "COM7".into() });
        wait_for_scan(&scanner, "XYZ999");

        assert_eq!(scanner.take_last_scanned().as_deref(), Some("XYZ999"));
        assert_eq!(scanner.take_last_scanned(), None);
        assert!(scanner.stop());
    }

    #[test]
    fn test_start_twice_is_noop() {
        let scanner = supervisor(FakeBackend::new(vec![Some(("", false))]));

        assert!(matches!(scanner.start().unwrap(), StartOutcome::Started { .. }));
        assert_eq!(scanner.start().unwrap(), StartOutcome::AlreadyRunning);
        assert!(scanner.is_running());

        assert!(scanner.stop());
        assert!(!scanner.is_running());
        assert!(!scanner.stop());
    }

    #[test]
    fn test_worker_reconnects_after_failures() {
        let scanner = supervisor(FakeBackend::new(vec![
            None,
            Some(("FIRST\n", true)),
            Some(("SECOND\n", false)),
        ]));

        scanner.start().unwrap();
        wait_for_scan(&scanner, "SECOND");
        scanner.stop();
    }

    #[test]
    fn test_start_without_ports() {
        let mut backend = FakeBackend::new(vec![]);
        backend.ports = Ok(vec![]);
        let scanner = supervisor(backend);

        assert!(matches!(scanner.start(), Err(ScannerError::NoDevice)));
        assert!(!scanner.is_running());
    }

    #[test]
    fn test_start_without_driver() {
        let mut backend = FakeBackend::new(vec![]);
        backend.ports = Err(());
        let scanner = supervisor(backend);

        assert!(matches!(scanner.start(), Err(ScannerError::DriverUnavailable(_))));
        assert!(!scanner.is_running());
    }
}
