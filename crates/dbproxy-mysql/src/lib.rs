//! MySQL wire-protocol codec for DbProxy.
//!
//! DbProxy sits between MySQL clients and a pool of backend MySQL nodes and
//! re-emits the client/server protocol so queries can be routed, split and
//! merged across shards. This crate is the byte-level layer of that path:
//!
//! - Fixed-width little-endian integers (1, 2, 3, 4 and 8 bytes)
//! - Length-encoded integers, including the 0xFB NULL marker
//! - Length-encoded and NUL-terminated strings
//! - Zero-copy and copying reads, sized writes and growable appends
//! - OK / ERR / EOF payload parsing and building
//!
//! Every codec function is a pure function of its inputs and is safe to
//! call from any number of threads, each on its own buffer.
//!
//! # Example
//!
//! ```rust
//! use dbproxy_mysql::protocol::encoding::{append_lenenc_int, read_lenenc_int};
//! use dbproxy_mysql::protocol::LenEncInt;
//!
//! let mut buf = Vec::new();
//! append_lenenc_int(&mut buf, 300);
//! assert_eq!(buf, [0xFC, 0x2C, 0x01]);
//! assert_eq!(read_lenenc_int(&buf, 0), Some((LenEncInt::Value(300), 3)));
//! ```

pub mod protocol;

pub use protocol::{
    EofPacket, ErrPacket, LenEncInt, OkPacket, PacketReader, PacketType, PacketWriter,
    ServerResponse, parse_response,
};
