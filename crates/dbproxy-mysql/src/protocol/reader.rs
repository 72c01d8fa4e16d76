//! MySQL payload reading utilities.
//!
//! `PacketReader` threads a cursor through the functions in
//! [`encoding`](super::encoding) so packet parsers don't have to carry the
//! position by hand. A failed read returns `None` and leaves the cursor
//! where it was.

use crate::protocol::encoding::{self, LenEncInt};
use crate::protocol::{EofPacket, ErrPacket, OkPacket};

/// A cursor over a MySQL packet payload.
#[derive(Debug, Clone)]
pub struct PacketReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> PacketReader<'a> {
    /// Create a new reader from a byte slice.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Current cursor position.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Get remaining bytes in the buffer.
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    /// Check if we've reached the end of the data.
    pub fn is_empty(&self) -> bool {
        self.pos >= self.data.len()
    }

    /// Peek at the next byte without advancing.
    pub fn peek(&self) -> Option<u8> {
        self.data.get(self.pos).copied()
    }

    #[inline]
    fn advance<T>(&mut self, decoded: Option<(T, usize)>) -> Option<T> {
        let (value, next) = decoded?;
        self.pos = next;
        Some(value)
    }

    /// Read a single byte.
    pub fn read_u8(&mut self) -> Option<u8> {
        self.advance(encoding::read_byte(self.data, self.pos))
    }

    /// Read a u16 (little-endian).
    pub fn read_u16_le(&mut self) -> Option<u16> {
        self.advance(encoding::read_u16(self.data, self.pos))
    }

    /// Read a u24 (little-endian, 3 bytes).
    pub fn read_u24_le(&mut self) -> Option<u32> {
        self.advance(encoding::read_u24(self.data, self.pos))
    }

    /// Read a u32 (little-endian).
    pub fn read_u32_le(&mut self) -> Option<u32> {
        self.advance(encoding::read_u32(self.data, self.pos))
    }

    /// Read a u64 (little-endian).
    pub fn read_u64_le(&mut self) -> Option<u64> {
        self.advance(encoding::read_u64(self.data, self.pos))
    }

    /// Read a length-encoded integer that may be NULL.
    ///
    /// Use [`read_lenenc_int`](Self::read_lenenc_int) for fields that are
    /// never NULL; it rejects the 0xFB marker.
    pub fn read_lenenc_int_or_null(&mut self) -> Option<LenEncInt> {
        self.advance(encoding::read_lenenc_int(self.data, self.pos))
    }

    /// Read a length-encoded integer that must not be NULL.
    ///
    /// Use [`read_lenenc_int_or_null`](Self::read_lenenc_int_or_null) where
    /// NULL is a legal value.
    ///
    /// Fields such as affected rows are never NULL on the wire; a NULL
    /// marker there is treated as malformed.
    pub fn read_lenenc_int(&mut self) -> Option<u64> {
        let (value, next) = encoding::read_lenenc_int(self.data, self.pos)?;
        let value = value.into_option()?;
        self.pos = next;
        Some(value)
    }

    /// Read a length-encoded string. NULL reads as `""`.
    pub fn read_lenenc_string(&mut self) -> Option<String> {
        self.advance(encoding::read_lenenc_string(self.data, self.pos))
    }

    /// Read a length-encoded byte slice. `Some(None)` is SQL NULL.
    pub fn read_lenenc_bytes(&mut self) -> Option<Option<&'a [u8]>> {
        self.advance(encoding::read_lenenc_bytes(self.data, self.pos))
    }

    /// Skip a length-encoded string without allocating.
    pub fn skip_lenenc_string(&mut self) -> bool {
        match encoding::skip_lenenc_string(self.data, self.pos) {
            Some(next) => {
                self.pos = next;
                true
            }
            None => false,
        }
    }

    /// Read a null-terminated string.
    ///
    /// Fails without moving the cursor when no terminator remains.
    pub fn read_null_string(&mut self) -> Option<String> {
        self.advance(encoding::read_null_string(self.data, self.pos))
    }

    /// Read a fixed-length string.
    pub fn read_string(&mut self, len: usize) -> Option<String> {
        let bytes = self.read_bytes(len)?;
        Some(String::from_utf8_lossy(bytes).into_owned())
    }

    /// Read remaining data as a string.
    pub fn read_rest_string(&mut self) -> String {
        String::from_utf8_lossy(self.read_rest()).into_owned()
    }

    /// Read a fixed number of bytes as a view into the payload.
    pub fn read_bytes(&mut self, len: usize) -> Option<&'a [u8]> {
        self.advance(encoding::read_bytes(self.data, self.pos, len))
    }

    /// Read a fixed number of bytes into an owned buffer.
    pub fn read_bytes_copy(&mut self, len: usize) -> Option<Vec<u8>> {
        self.advance(encoding::read_bytes_copy(self.data, self.pos, len))
    }

    /// Read remaining bytes.
    pub fn read_rest(&mut self) -> &'a [u8] {
        let rest = self.data.get(self.pos..).unwrap_or_default();
        self.pos = self.pos.max(self.data.len());
        rest
    }

    /// Skip a number of bytes.
    pub fn skip(&mut self, n: usize) -> bool {
        self.read_bytes(n).is_some()
    }

    /// Parse an OK packet from the current position.
    ///
    /// OK packet format (protocol 4.1+):
    /// - 0x00 header (skipped if present)
    /// - affected_rows: lenenc int
    /// - last_insert_id: lenenc int
    /// - status_flags: 2 bytes
    /// - warnings: 2 bytes
    /// - info: rest of packet (optional)
    pub fn parse_ok_packet(&mut self) -> Option<OkPacket> {
        let start = self.pos;
        let parsed = self.parse_ok_fields();
        if parsed.is_none() {
            self.pos = start;
        }
        parsed
    }

    fn parse_ok_fields(&mut self) -> Option<OkPacket> {
        if self.peek() == Some(0x00) {
            self.skip(1);
        }

        let affected_rows = self.read_lenenc_int()?;
        let last_insert_id = self.read_lenenc_int()?;
        let status_flags = self.read_u16_le()?;
        let warnings = self.read_u16_le()?;
        let info = self.read_rest_string();

        Some(OkPacket {
            affected_rows,
            last_insert_id,
            status_flags,
            warnings,
            info,
        })
    }

    /// Parse an Error packet from the current position.
    ///
    /// ERR packet format (protocol 4.1+):
    /// - 0xFF header (skipped if present)
    /// - error_code: 2 bytes
    /// - '#' marker + sql_state: 5 bytes (optional)
    /// - error_message: rest of packet
    pub fn parse_err_packet(&mut self) -> Option<ErrPacket> {
        let start = self.pos;
        let parsed = self.parse_err_fields();
        if parsed.is_none() {
            self.pos = start;
        }
        parsed
    }

    fn parse_err_fields(&mut self) -> Option<ErrPacket> {
        if self.peek() == Some(0xFF) {
            self.skip(1);
        }

        let error_code = self.read_u16_le()?;

        let sql_state = if self.peek() == Some(b'#') {
            self.skip(1);
            self.read_string(5)?
        } else {
            String::new()
        };

        let error_message = self.read_rest_string();

        Some(ErrPacket {
            error_code,
            sql_state,
            error_message,
        })
    }

    /// Parse an EOF packet from the current position.
    ///
    /// EOF packet format:
    /// - 0xFE header (skipped if present)
    /// - warnings: 2 bytes
    /// - status_flags: 2 bytes
    pub fn parse_eof_packet(&mut self) -> Option<EofPacket> {
        let start = self.pos;
        if self.peek() == Some(0xFE) {
            self.skip(1);
        }

        let fields = self
            .read_u16_le()
            .and_then(|warnings| Some((warnings, self.read_u16_le()?)));
        let Some((warnings, status_flags)) = fields else {
            self.pos = start;
            return None;
        };

        Some(EofPacket {
            warnings,
            status_flags,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_u8() {
        let mut reader = PacketReader::new(&[0x42, 0x43]);
        assert_eq!(reader.read_u8(), Some(0x42));
        assert_eq!(reader.read_u8(), Some(0x43));
        assert_eq!(reader.read_u8(), None);
        assert!(reader.is_empty());
    }

    #[test]
    fn test_read_fixed_width() {
        let mut reader = PacketReader::new(&[
            0x34, 0x12, 0x56, 0x34, 0x12, 0x78, 0x56, 0x34, 0x12, 0x01, 0x02, 0x03, 0x04, 0x05,
            0x06, 0x07, 0x08,
        ]);
        assert_eq!(reader.read_u16_le(), Some(0x1234));
        assert_eq!(reader.read_u24_le(), Some(0x0012_3456));
        assert_eq!(reader.read_u32_le(), Some(0x1234_5678));
        assert_eq!(reader.read_u64_le(), Some(0x0807_0605_0403_0201));
        assert_eq!(reader.remaining(), 0);
    }

    #[test]
    fn test_failed_read_keeps_position() {
        let mut reader = PacketReader::new(&[0x01, 0xFC, 0x34]);
        assert_eq!(reader.read_u8(), Some(0x01));
        assert_eq!(reader.read_lenenc_int_or_null(), None);
        assert_eq!(reader.position(), 1);
        assert_eq!(reader.read_u32_le(), None);
        assert_eq!(reader.position(), 1);
        assert!(!reader.skip(3));
        assert_eq!(reader.remaining(), 2);
    }

    #[test]
    fn test_read_lenenc_int_rejects_null_that_or_null_accepts() {
        let mut reader = PacketReader::new(&[0x42, 0xFC, 0x34, 0x12, 0xFB]);
        assert_eq!(reader.read_lenenc_int(), Some(0x42));
        assert_eq!(reader.read_lenenc_int(), Some(0x1234));
        // NULL is rejected by the numeric form and the cursor stays put.
        assert_eq!(reader.read_lenenc_int(), None);
        assert_eq!(reader.position(), 4);
        assert_eq!(reader.read_lenenc_int_or_null(), Some(LenEncInt::Null));
        assert!(reader.is_empty());
    }

    #[test]
    fn test_read_null_string() {
        let mut reader = PacketReader::new(b"hello\0world\0tail");
        assert_eq!(reader.read_null_string(), Some("hello".to_string()));
        assert_eq!(reader.read_null_string(), Some("world".to_string()));
        assert_eq!(reader.read_null_string(), None);
        assert_eq!(reader.read_rest(), b"tail");
    }

    #[test]
    fn test_read_lenenc_string_and_bytes() {
        let mut reader = PacketReader::new(&[
            0x05, b'h', b'e', b'l', b'l', b'o', 0xFB, 0x02, b'i', b'd', 0x01, b'x',
        ]);
        assert_eq!(reader.read_lenenc_string(), Some("hello".to_string()));
        assert_eq!(reader.read_lenenc_bytes(), Some(None));
        assert!(reader.skip_lenenc_string());
        assert_eq!(reader.read_lenenc_bytes(), Some(Some(&b"x"[..])));
        assert!(!reader.skip_lenenc_string());
    }

    #[test]
    fn test_read_bytes_copy_outlives_payload() {
        let payload = vec![0xAA, 0xBB, 0xCC];
        let copy = {
            let mut reader = PacketReader::new(&payload);
            reader.skip(1);
            reader.read_bytes_copy(2).unwrap()
        };
        drop(payload);
        assert_eq!(copy, vec![0xBB, 0xCC]);
    }

    #[test]
    fn test_parse_ok_packet() {
        // OK packet: affected_rows=1, last_insert_id=42, status=2, warnings=0
        let data = [0x00, 0x01, 0x2A, 0x02, 0x00, 0x00, 0x00];
        let mut reader = PacketReader::new(&data);
        let ok = reader.parse_ok_packet().unwrap();
        assert_eq!(ok.affected_rows, 1);
        assert_eq!(ok.last_insert_id, 42);
        assert_eq!(ok.status_flags, 2);
        assert_eq!(ok.warnings, 0);
        assert!(ok.info.is_empty());
    }

    #[test]
    fn test_parse_truncated_ok_packet() {
        let data = [0x00, 0xFC, 0x01];
        let mut reader = PacketReader::new(&data);
        assert!(reader.parse_ok_packet().is_none());
        assert_eq!(reader.position(), 0);
    }

    #[test]
    fn test_parse_err_packet() {
        // ERR packet: error_code=1045, sql_state=28000, message="Access denied"
        let mut data = vec![0xFF, 0x15, 0x04, b'#'];
        data.extend_from_slice(b"28000");
        data.extend_from_slice(b"Access denied");
        let mut reader = PacketReader::new(&data);
        let err = reader.parse_err_packet().unwrap();
        assert_eq!(err.error_code, 1045);
        assert_eq!(err.sql_state, "28000");
        assert_eq!(err.error_message, "Access denied");
    }

    #[test]
    fn test_parse_err_packet_truncated_sql_state() {
        let data = [0xFF, 0x15, 0x04, b'#', b'2', b'8'];
        let mut reader = PacketReader::new(&data);
        assert!(reader.parse_err_packet().is_none());
        assert_eq!(reader.position(), 0);
    }

    #[test]
    fn test_parse_eof_packet() {
        // EOF packet: warnings=0, status=2
        let data = [0xFE, 0x00, 0x00, 0x02, 0x00];
        let mut reader = PacketReader::new(&data);
        let eof = reader.parse_eof_packet().unwrap();
        assert_eq!(eof.warnings, 0);
        assert_eq!(eof.status_flags, 2);

        let mut short = PacketReader::new(&[0xFE, 0x00, 0x00, 0x02]);
        assert!(short.parse_eof_packet().is_none());
        assert_eq!(short.position(), 0);
    }
}
