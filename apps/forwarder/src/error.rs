//! Forwarder errors.

use inventario_scanner::ScannerError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ForwarderError {
    /// Hostname, server files and the LAN probe all came up empty.
    #[error("No server found on network. Create server.txt with the server IP or pass --server")]
    NoServer,

    /// No serial port was given and none was detected.
    #[error("No serial port provided or detected. Use --port or --auto")]
    NoPort,

    /// The reconnect budget ran out.
    #[error("Exhausted retries after serial connection loss")]
    RetriesExhausted,

    #[error("Serial error: {0}")]
    Serial(#[from] ScannerError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type ForwarderResult<T> = Result<T, ForwarderError>;
