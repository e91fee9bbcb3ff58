//! # inventario-scanner: Serial Barcode Scanner Pipeline
//!
//! A producer/consumer pipeline with a single-slot mailbox.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  USB/serial scanner ──► scanner-worker thread ──┐                       │
//! │                                                 │                       │
//! │  POST /push_scan   (forwarder on another PC) ───┼──► ScanMailbox        │
//! │  POST /simulate_scan                         ───┘    (last write wins)  │
//! │                                                          │              │
//! │                                   GET /last_scanned ◄────┘ take()       │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use inventario_scanner::{PortSettings, ScannerSupervisor, SystemSerial};
//!
//! let scanner = ScannerSupervisor::new(Arc::new(SystemSerial), PortSettings::default());
//! scanner.start()?;
//! if let Some(code) = scanner.take_last_scanned() {
//!     println!("scanned {code}");
//! }
//! ```

pub mod device;
pub mod discovery;
pub mod error;
pub mod mailbox;
pub mod supervisor;

pub use device::{pump_lines, DtrMode, PortSettings, SerialBackend, SerialDevice, SystemSerial, DEFAULT_BAUD};
pub use discovery::{select_forwarder_port, select_server_port, PortInfo};
pub use error::{ScannerError, ScannerResult};
pub use mailbox::ScanMailbox;
pub use supervisor::{ScannerSupervisor, StartOutcome};
