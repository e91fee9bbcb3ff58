//! Single-slot scan mailbox.
//!
//! The worker thread and HTTP handlers both write the slot; the UI polls and
//! drains it. Last write wins, reads are destructive.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::error::{ScannerError, ScannerResult};

/// Shared holder of the most recent scan.
#[derive(Debug, Clone, Default)]
pub struct ScanMailbox {
    slot: Arc<Mutex<Option<String>>>,
}

impl ScanMailbox {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Option<String>> {
        // A writer that panicked cannot leave a half-written Option behind.
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Stores a code pushed from outside the worker, trimmed.
    ///
    /// ## Returns
    /// * `Ok(code)` - The stored code
    /// * `Err(MissingCode)` - `code` was blank
    pub fn push(&self, code: &str) -> ScannerResult<String> {
        let code = code.trim();
        if code.is_empty() {
            return Err(ScannerError::MissingCode);
        }
        self.store(code.to_string());
        Ok(code.to_string())
    }

    /// Overwrites the slot.
    pub fn store(&self, code: String) {
        *self.lock() = Some(code);
    }

    /// Reads and clears the slot.
    pub fn take(&self) -> Option<String> {
        self.lock().take()
    }

    /// Reads the slot without clearing it.
    pub fn peek(&self) -> Option<String> {
        self.lock().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_take_is_destructive() {
        let mailbox = ScanMailbox::new();
        mailbox.push("  ABC123 ").unwrap();

        assert_eq!(mailbox.take().as_deref(), Some("ABC123"));
        assert_eq!(mailbox.take(), None);
    }

    #[test]
    fn test_last_write_wins() {
        let mailbox = ScanMailbox::new();
        let worker = mailbox.clone();

        mailbox.push("ABC123").unwrap();
        worker.store("XYZ999".into());

        assert_eq!(mailbox.take().as_deref(), Some("XYZ999"));
        assert_eq!(mailbox.take(), None);
    }

    #[test]
    fn test_blank_push_is_rejected() {
        let mailbox = ScanMailbox::new();
        assert!(matches!(mailbox.push("   "), Err(ScannerError::MissingCode)));
        assert_eq!(mailbox.peek(), None);
    }
}
