//! Scanner errors.

use thiserror::Error;

/// Failures surfaced by discovery, the worker and the mailbox.
#[derive(Debug, Error)]
pub enum ScannerError {
    /// No serial port is present at all.
    #[error("No se detectó ningún escáner USB-COM-STD")]
    NoDevice,

    /// The platform's port enumeration failed.
    #[error("Controlador serie no disponible: {0}")]
    DriverUnavailable(String),

    /// A port was found but could not be opened.
    #[error("No se pudo abrir {port}: {reason}")]
    Open { port: String, reason: String },

    /// A pushed code was missing or blank.
    #[error("code required")]
    MissingCode,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type ScannerResult<T> = Result<T, ScannerError>;
