//! MySQL payload writing utilities.
//!
//! `PacketWriter` builds a payload in protocol-field order on top of the
//! append family in [`encoding`](super::encoding). It grows as needed, so
//! callers never pre-size it.

use crate::protocol::encoding;
use crate::protocol::{EofPacket, ErrPacket, OkPacket};

/// A writer for MySQL payloads.
#[derive(Debug, Default)]
pub struct PacketWriter {
    buffer: Vec<u8>,
}

impl PacketWriter {
    /// Create a new writer with default capacity.
    pub fn new() -> Self {
        Self::with_capacity(256)
    }

    /// Create a new writer with specified capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(capacity),
        }
    }

    /// Reuse an existing buffer, appending after its current contents.
    pub fn from_vec(buffer: Vec<u8>) -> Self {
        Self { buffer }
    }

    /// Get the current buffer length.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Check if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Clear the buffer, keeping its allocation.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    /// Get the buffer as a byte slice.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }

    /// Consume the writer and return the buffer.
    pub fn into_bytes(self) -> Vec<u8> {
        self.buffer
    }

    /// Write a single byte.
    pub fn write_u8(&mut self, value: u8) {
        encoding::append_byte(&mut self.buffer, value);
    }

    /// Write a u16 (little-endian).
    pub fn write_u16_le(&mut self, value: u16) {
        encoding::append_u16(&mut self.buffer, value);
    }

    /// Write a u24 (little-endian, 3 bytes).
    pub fn write_u24_le(&mut self, value: u32) {
        encoding::append_u24(&mut self.buffer, value);
    }

    /// Write a u32 (little-endian).
    pub fn write_u32_le(&mut self, value: u32) {
        encoding::append_u32(&mut self.buffer, value);
    }

    /// Write a u64 (little-endian).
    pub fn write_u64_le(&mut self, value: u64) {
        encoding::append_u64(&mut self.buffer, value);
    }

    /// Write a length-encoded integer.
    pub fn write_lenenc_int(&mut self, value: u64) {
        encoding::append_lenenc_int(&mut self.buffer, value);
    }

    /// Write the length-encoded NULL marker (0xFB).
    pub fn write_lenenc_null(&mut self) {
        encoding::append_byte(&mut self.buffer, encoding::LENENC_NULL);
    }

    /// Write a length-encoded string.
    pub fn write_lenenc_string(&mut self, s: &str) {
        encoding::append_lenenc_string(&mut self.buffer, s);
    }

    /// Write a length-encoded byte slice.
    pub fn write_lenenc_bytes(&mut self, data: &[u8]) {
        encoding::append_lenenc_bytes(&mut self.buffer, data);
    }

    /// Write a null-terminated string.
    pub fn write_null_string(&mut self, s: &str) {
        encoding::append_null_string(&mut self.buffer, s);
    }

    /// Write a fixed-length string, padding with zeros if necessary.
    pub fn write_fixed_string(&mut self, s: &str, len: usize) {
        let bytes = s.as_bytes();
        if bytes.len() >= len {
            encoding::append_bytes(&mut self.buffer, &bytes[..len]);
        } else {
            encoding::append_bytes(&mut self.buffer, bytes);
            encoding::append_zeroes(&mut self.buffer, len - bytes.len());
        }
    }

    /// Write raw bytes.
    pub fn write_bytes(&mut self, data: &[u8]) {
        encoding::append_bytes(&mut self.buffer, data);
    }

    /// Write zeros (padding).
    pub fn write_zeros(&mut self, count: usize) {
        encoding::append_zeroes(&mut self.buffer, count);
    }

    /// Write an OK packet payload.
    pub fn write_ok_packet(&mut self, ok: &OkPacket) {
        self.write_u8(0x00);
        self.write_lenenc_int(ok.affected_rows);
        self.write_lenenc_int(ok.last_insert_id);
        self.write_u16_le(ok.status_flags);
        self.write_u16_le(ok.warnings);
        self.write_bytes(ok.info.as_bytes());
    }

    /// Write an ERR packet payload.
    ///
    /// The SQL state is always emitted (protocol 4.1 form); a state that is
    /// not 5 bytes long is truncated or zero-padded.
    pub fn write_err_packet(&mut self, err: &ErrPacket) {
        self.write_u8(0xFF);
        self.write_u16_le(err.error_code);
        self.write_u8(b'#');
        self.write_fixed_string(&err.sql_state, 5);
        self.write_bytes(err.error_message.as_bytes());
    }

    /// Write an EOF packet payload.
    pub fn write_eof_packet(&mut self, eof: &EofPacket) {
        self.write_u8(0xFE);
        self.write_u16_le(eof.warnings);
        self.write_u16_le(eof.status_flags);
    }
}
