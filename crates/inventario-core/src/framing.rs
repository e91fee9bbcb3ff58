//! # Scanner Line Framing
//!
//! Barcode scanners in serial mode emit each code followed by `\r`, `\n` or
//! both. [`LineAssembler`] turns the raw byte stream into trimmed codes.
//!
//! ```text
//!  bytes:  A B C 1 2 3 \r \n X Y Z \n
//!          └─────┬────┘ │  │ └──┬─┘ │
//!                │      │  │    │   └─► emit "XYZ"
//!                │      │  └────┼─────► empty line, dropped
//!                └──────┴───────┼─────► emit "ABC123"
//!                               └─────► buffered
//! ```
//!
//! Used by both the in-process scanner worker and the remote forwarder.

/// Longest line kept. A device that never terminates its output loses the
/// oversized line instead of growing the buffer.
pub const MAX_LINE_BYTES: usize = 4096;

/// Accumulates bytes until a line terminator.
#[derive(Debug, Default)]
pub struct LineAssembler {
    buf: Vec<u8>,
    /// Set once the current line passed `MAX_LINE_BYTES`; cleared at the
    /// next terminator.
    overflowed: bool,
}

impl LineAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one byte; returns a completed code when `byte` ends a line.
    ///
    /// Bytes are decoded as UTF-8 with invalid sequences dropped, then
    /// trimmed. Blank and oversized lines yield `None`.
    pub fn push_byte(&mut self, byte: u8) -> Option<String> {
        if byte != b'\r' && byte != b'\n' {
            if self.overflowed {
                return None;
            }
            if self.buf.len() == MAX_LINE_BYTES {
                self.buf.clear();
                self.overflowed = true;
                return None;
            }
            self.buf.push(byte);
            return None;
        }

        if std::mem::take(&mut self.overflowed) {
            return None;
        }

        let line = decode_ignoring_invalid(&self.buf);
        self.buf.clear();

        let code = line.trim();
        if code.is_empty() {
            None
        } else {
            Some(code.to_string())
        }
    }

    /// Feeds a chunk, returning every code it completes.
    pub fn push_bytes(&mut self, bytes: &[u8]) -> Vec<String> {
        bytes.iter().filter_map(|b| self.push_byte(*b)).collect()
    }

    /// Bytes received since the last terminator.
    pub fn pending(&self) -> usize {
        self.buf.len()
    }
}

fn decode_ignoring_invalid(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).replace('\u{FFFD}', "")
}
