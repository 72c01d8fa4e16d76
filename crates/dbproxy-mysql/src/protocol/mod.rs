//! MySQL wire protocol codec.
//!
//! The proxy never interprets a packet without going through this module:
//!
//! - [`encoding`]: stateless encode/decode of the protocol's value types
//! - [`reader`]: a cursor over a payload built on the decoders
//! - [`writer`]: a growable payload builder built on the append encoders
//!
//! Packet framing (the 3-byte length + sequence header) is handled by the
//! connection layer; everything here works on a single payload.

pub mod encoding;
pub mod reader;
pub mod writer;

pub use encoding::LenEncInt;
pub use reader::PacketReader;
pub use writer::PacketWriter;

use dbproxy_core::{Error, Result};

/// MySQL server status flags.
#[allow(dead_code)]
pub mod server_status {
    pub const SERVER_STATUS_IN_TRANS: u16 = 0x0001;
    pub const SERVER_STATUS_AUTOCOMMIT: u16 = 0x0002;
    pub const SERVER_MORE_RESULTS_EXISTS: u16 = 0x0008;
    pub const SERVER_STATUS_NO_GOOD_INDEX_USED: u16 = 0x0010;
    pub const SERVER_STATUS_NO_INDEX_USED: u16 = 0x0020;
    pub const SERVER_STATUS_CURSOR_EXISTS: u16 = 0x0040;
    pub const SERVER_STATUS_LAST_ROW_SENT: u16 = 0x0080;
    pub const SERVER_STATUS_DB_DROPPED: u16 = 0x0100;
    pub const SERVER_STATUS_NO_BACKSLASH_ESCAPES: u16 = 0x0200;
    pub const SERVER_STATUS_METADATA_CHANGED: u16 = 0x0400;
    pub const SERVER_QUERY_WAS_SLOW: u16 = 0x0800;
    pub const SERVER_PS_OUT_PARAMS: u16 = 0x1000;
    pub const SERVER_STATUS_IN_TRANS_READONLY: u16 = 0x2000;
    pub const SERVER_SESSION_STATE_CHANGED: u16 = 0x4000;
}

/// Server response packet types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketType {
    /// OK packet (0x00)
    Ok,
    /// Error packet (0xFF)
    Error,
    /// EOF packet (0xFE) - deprecated in CLIENT_DEPRECATE_EOF
    Eof,
    /// Local infile request (0xFB)
    LocalInfile,
    /// Data packet (result set row, column count, etc.)
    Data,
}

impl PacketType {
    /// Detect packet type from the first byte of payload.
    pub fn from_first_byte(byte: u8, payload_len: usize) -> Self {
        match byte {
            0x00 => PacketType::Ok,
            0xFF => PacketType::Error,
            // A row can also start with 0xFE (8-byte lenenc); EOF is short.
            0xFE if payload_len < 9 => PacketType::Eof,
            0xFB => PacketType::LocalInfile,
            _ => PacketType::Data,
        }
    }
}

/// Parsed OK packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OkPacket {
    /// Number of affected rows
    pub affected_rows: u64,
    /// Last insert ID
    pub last_insert_id: u64,
    /// Server status flags
    pub status_flags: u16,
    /// Number of warnings
    pub warnings: u16,
    /// Info string (if any)
    pub info: String,
}

impl OkPacket {
    /// Check if the server reports an open transaction.
    pub fn in_transaction(&self) -> bool {
        self.status_flags & server_status::SERVER_STATUS_IN_TRANS != 0
    }

    /// Check if more result sets follow.
    pub fn more_results(&self) -> bool {
        self.status_flags & server_status::SERVER_MORE_RESULTS_EXISTS != 0
    }
}

/// Parsed Error packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrPacket {
    /// Error code
    pub error_code: u16,
    /// SQL state (5 characters)
    pub sql_state: String,
    /// Error message
    pub error_message: String,
}

/// Parsed EOF packet (deprecated in newer MySQL versions).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EofPacket {
    /// Number of warnings
    pub warnings: u16,
    /// Server status flags
    pub status_flags: u16,
}

/// A classified server payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerResponse<'a> {
    Ok(OkPacket),
    Err(ErrPacket),
    Eof(EofPacket),
    /// LOCAL INFILE request carrying the file name.
    LocalInfile(String),
    /// Anything else, left for the result-set layer.
    Data(&'a [u8]),
}

/// Classify and decode a server payload.
///
/// A payload that is classified as OK/ERR/EOF but cannot be decoded is a
/// protocol error for the enclosing packet; the payload is attached to the
/// error so the session layer can log it before resetting the connection.
pub fn parse_response(payload: &[u8]) -> Result<ServerResponse<'_>> {
    let Some(&first) = payload.first() else {
        return Err(Error::protocol("empty server payload", None));
    };

    let mut reader = PacketReader::new(payload);
    let response = match PacketType::from_first_byte(first, payload.len()) {
        PacketType::Ok => reader.parse_ok_packet().map(ServerResponse::Ok),
        PacketType::Error => reader.parse_err_packet().map(ServerResponse::Err),
        PacketType::Eof => reader.parse_eof_packet().map(ServerResponse::Eof),
        PacketType::LocalInfile => {
            reader.skip(1);
            Some(ServerResponse::LocalInfile(reader.read_rest_string()))
        }
        PacketType::Data => Some(ServerResponse::Data(payload)),
    };

    response.ok_or_else(|| {
        tracing::trace!(
            first_byte = first,
            len = payload.len(),
            "Malformed server payload"
        );
        Error::protocol(
            format!("truncated server payload (first byte 0x{first:02X})"),
            Some(payload),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_packet_type_detection() {
        assert_eq!(PacketType::from_first_byte(0x00, 10), PacketType::Ok);
        assert_eq!(PacketType::from_first_byte(0xFF, 10), PacketType::Error);
        assert_eq!(PacketType::from_first_byte(0xFE, 5), PacketType::Eof);
        assert_eq!(PacketType::from_first_byte(0xFE, 100), PacketType::Data);
        assert_eq!(
            PacketType::from_first_byte(0xFB, 10),
            PacketType::LocalInfile
        );
        assert_eq!(PacketType::from_first_byte(0x42, 10), PacketType::Data);
    }

    #[test]
    fn test_parse_response_ok() {
        let payload = [0x00, 0x00, 0x00, 0x03, 0x00, 0x00, 0x00];
        match parse_response(&payload).unwrap() {
            ServerResponse::Ok(ok) => {
                assert!(ok.in_transaction());
                assert!(!ok.more_results());
            }
            other => panic!("expected OK, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_response_local_infile() {
        let payload = b"\xFB/tmp/data.csv";
        assert_eq!(
            parse_response(payload).unwrap(),
            ServerResponse::LocalInfile("/tmp/data.csv".to_string())
        );
    }

    #[test]
    fn test_parse_response_data_passthrough() {
        let payload = [0x03, b'd', b'e', b'f'];
        assert_eq!(
            parse_response(&payload).unwrap(),
            ServerResponse::Data(&payload[..])
        );
    }

    #[test]
    fn test_parse_response_truncated_is_protocol_error() {
        let payload = [0x00, 0xFE, 0x01];
        let err = parse_response(&payload).unwrap_err();
        assert!(err.is_connection_fatal());
        assert_eq!(err.raw_data(), Some(&payload[..]));
    }

    #[test]
    fn test_parse_response_empty() {
        let err = parse_response(&[]).unwrap_err();
        assert!(matches!(err, Error::Protocol(_)));
        assert!(err.raw_data().is_none());
    }
}
