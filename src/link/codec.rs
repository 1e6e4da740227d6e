//! Newline-delimited record codec.
//!
//! Wire format:
//! ```text
//! ┌──────────────────────────────┬────────────┐
//! │ ASCII record [+ \r] ≤ 256 B  │ \n         │
//! └──────────────────────────────┴────────────┘
//! ```
//!
//! The codec accumulates incoming bytes and yields complete records. A
//! single serial read may return part of a record, several records, or
//! the tail of one and the head of the next. A partial record that
//! outgrows the buffer is dropped together with everything up to the next
//! newline.

use heapless::Vec as HVec;
use log::warn;

use crate::error::ProtocolFault;

/// Maximum record length, including an optional trailing `\r`.
pub const MAX_LINE: usize = 256;

/// Decoder state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DecoderState {
    /// Appending bytes to the current record.
    Collecting,
    /// Current record overflowed; skipping to the next newline.
    Discarding,
}

/// Streaming line decoder.
pub struct LineDecoder {
    state: DecoderState,
    buf: HVec<u8, MAX_LINE>,
    discarded: u64,
}

impl Default for LineDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl LineDecoder {
    pub fn new() -> Self {
        Self {
            state: DecoderState::Collecting,
            buf: HVec::new(),
            discarded: 0,
        }
    }

    /// Feed bytes into the decoder and collect every record they complete.
    ///
    /// Records are returned without terminator; a trailing `\r` is removed
    /// and empty records are skipped.
    pub fn feed(&mut self, data: &[u8]) -> Vec<String> {
        let mut lines = Vec::new();
        for &byte in data {
            match (self.state, byte) {
                (DecoderState::Discarding, b'\n') => {
                    self.state = DecoderState::Collecting;
                }
                (DecoderState::Discarding, _) => {}
                (DecoderState::Collecting, b'\n') => {
                    if let Some(line) = self.take_line() {
                        lines.push(line);
                    }
                }
                (DecoderState::Collecting, _) => {
                    if self.buf.push(byte).is_err() {
                        self.discarded += 1;
                        warn!("{}", ProtocolFault::Oversize(MAX_LINE));
                        self.buf.clear();
                        self.state = DecoderState::Discarding;
                    }
                }
            }
        }
        lines
    }

    /// Number of oversize records dropped so far.
    pub fn discarded(&self) -> u64 {
        self.discarded
    }

    /// Bytes of the incomplete record currently buffered.
    pub fn pending(&self) -> usize {
        self.buf.len()
    }


    fn take_line(&mut self) -> Option<String> {
        let mut end = self.buf.len();
        if end > 0 && self.buf[end - 1] == b'\r' {
            end -= 1;
        }
        let line = (end > 0).then(|| String::from_utf8_lossy(&self.buf[..end]).into_owned());
        self.buf.clear();
        line
    }
}
