//! Value-level encodings of the MySQL wire protocol.
//!
//! This module holds the primitive codec every packet goes through:
//! little-endian fixed-width integers, length-encoded integers, and
//! length-encoded / NUL-terminated strings.
//!
//! All functions are pure functions of `(buffer, position, value)`:
//!
//! - Decoders start reading at `pos` and return the decoded value together
//!   with the position of the next unread byte, or `None` when the buffer
//!   does not hold enough bytes. A failed decode never reads past the end
//!   of the buffer and never produces a partial value.
//! - `write_*` encoders start writing at `pos` and return the next position.
//!   The caller guarantees capacity; it is only checked in debug builds and
//!   an overflowing write panics.
//! - `append_*` encoders grow a `Vec<u8>` and never need pre-sizing.
//!
//! # Length-encoded integers
//!
//! | First byte  | Meaning                  | Total size |
//! |-------------|--------------------------|------------|
//! | 0x00..=0xFA | the value itself         | 1          |
//! | 0xFB        | SQL NULL                 | 1          |
//! | 0xFC        | 2-byte value follows     | 3          |
//! | 0xFD        | 3-byte value follows     | 4          |
//! | 0xFE        | 8-byte value follows     | 9          |
//! | 0xFF        | reserved, never decoded  | -          |

#![allow(clippy::cast_possible_truncation)]

/// First byte of a length-encoded NULL.
pub const LENENC_NULL: u8 = 0xFB;
/// First byte of a length-encoded integer carrying 2 value bytes.
pub const LENENC_U16: u8 = 0xFC;
/// First byte of a length-encoded integer carrying 3 value bytes.
pub const LENENC_U24: u8 = 0xFD;
/// First byte of a length-encoded integer carrying 8 value bytes.
pub const LENENC_U64: u8 = 0xFE;

/// A decoded length-encoded integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LenEncInt {
    /// A numeric value.
    Value(u64),
    /// The 0xFB marker: SQL NULL, not a number.
    Null,
}

impl LenEncInt {
    /// Numeric value, 0 for NULL.
    pub fn value(self) -> u64 {
        match self {
            LenEncInt::Value(v) => v,
            LenEncInt::Null => 0,
        }
    }

    /// Check if this is the NULL marker.
    pub fn is_null(self) -> bool {
        matches!(self, LenEncInt::Null)
    }

    /// Convert to `Option`, mapping NULL to `None`.
    pub fn into_option(self) -> Option<u64> {
        match self {
            LenEncInt::Value(v) => Some(v),
            LenEncInt::Null => None,
        }
    }
}

// ==================== Sizes ====================

/// Number of bytes needed to length-encode `value`.
///
/// Values needing more than 3 bytes always take the 9-byte 0xFE form.
pub const fn lenenc_int_size(value: u64) -> usize {
    if value < 251 {
        1
    } else if value < 1 << 16 {
        3
    } else if value < 1 << 24 {
        4
    } else {
        9
    }
}

/// Number of bytes needed to write `value` as a length-encoded string.
pub fn lenenc_bytes_size(value: &[u8]) -> usize {
    lenenc_int_size(value.len() as u64) + value.len()
}

/// Number of bytes needed to write `value` as a length-encoded string.
pub fn lenenc_string_size(value: &str) -> usize {
    lenenc_bytes_size(value.as_bytes())
}

/// Number of bytes needed to write `value` as a NUL-terminated string.
pub fn null_string_size(value: &str) -> usize {
    value.len() + 1
}

// ==================== Decoding ====================

#[inline]
fn window(data: &[u8], pos: usize, size: usize) -> Option<&[u8]> {
    let end = pos.checked_add(size)?;
    data.get(pos..end)
}

#[inline]
fn read_array<const N: usize>(data: &[u8], pos: usize) -> Option<([u8; N], usize)> {
    let bytes = <[u8; N]>::try_from(window(data, pos, N)?).ok()?;
    Some((bytes, pos + N))
}

/// Read one byte.
#[inline]
pub fn read_byte(data: &[u8], pos: usize) -> Option<(u8, usize)> {
    data.get(pos).map(|&b| (b, pos + 1))
}

/// Read `size` bytes as a view into `data`.
///
/// The returned slice borrows the source buffer. Use [`read_bytes_copy`]
/// when the value must outlive a reused packet buffer.
#[inline]
pub fn read_bytes(data: &[u8], pos: usize, size: usize) -> Option<(&[u8], usize)> {
    window(data, pos, size).map(|bytes| (bytes, pos + size))
}

/// Read `size` bytes into an independently owned buffer.
pub fn read_bytes_copy(data: &[u8], pos: usize, size: usize) -> Option<(Vec<u8>, usize)> {
    read_bytes(data, pos, size).map(|(bytes, next)| (bytes.to_vec(), next))
}

/// Read a little-endian u16.
#[inline]
pub fn read_u16(data: &[u8], pos: usize) -> Option<(u16, usize)> {
    read_array(data, pos).map(|(b, next)| (u16::from_le_bytes(b), next))
}

/// Read a little-endian 3-byte integer.
#[inline]
pub fn read_u24(data: &[u8], pos: usize) -> Option<(u32, usize)> {
    read_array::<3>(data, pos).map(|([b0, b1, b2], next)| {
        (
            u32::from(b0) | (u32::from(b1) << 8) | (u32::from(b2) << 16),
            next,
        )
    })
}

/// Read a little-endian u32.
#[inline]
pub fn read_u32(data: &[u8], pos: usize) -> Option<(u32, usize)> {
    read_array(data, pos).map(|(b, next)| (u32::from_le_bytes(b), next))
}

/// Read a little-endian u64.
#[inline]
pub fn read_u64(data: &[u8], pos: usize) -> Option<(u64, usize)> {
    read_array(data, pos).map(|(b, next)| (u64::from_le_bytes(b), next))
}

/// Read a NUL-terminated byte string as a view, excluding the terminator.
///
/// Fails if no zero byte follows `pos`. The returned position points just
/// past the terminator.
pub fn read_null_bytes(data: &[u8], pos: usize) -> Option<(&[u8], usize)> {
    let rest = data.get(pos..)?;
    let end = rest.iter().position(|&b| b == 0)?;
    Some((&rest[..end], pos + end + 1))
}

/// Read a NUL-terminated string. Invalid UTF-8 is replaced lossily.
pub fn read_null_string(data: &[u8], pos: usize) -> Option<(String, usize)> {
    read_null_bytes(data, pos)
        .map(|(bytes, next)| (String::from_utf8_lossy(bytes).into_owned(), next))
}

/// Read a length-encoded integer.
///
/// The marker byte is bounds-checked first, then the value bytes of the
/// selected tier, so a truncated wide value fails even when its marker is
/// present. The reserved 0xFF marker fails.
pub fn read_lenenc_int(data: &[u8], pos: usize) -> Option<(LenEncInt, usize)> {
    let (first, next) = read_byte(data, pos)?;
    match first {
        0x00..=0xFA => Some((LenEncInt::Value(u64::from(first)), next)),
        0xFB => Some((LenEncInt::Null, next)),
        0xFC => read_u16(data, next).map(|(v, next)| (LenEncInt::Value(u64::from(v)), next)),
        0xFD => read_u24(data, next).map(|(v, next)| (LenEncInt::Value(u64::from(v)), next)),
        0xFE => read_u64(data, next).map(|(v, next)| (LenEncInt::Value(v), next)),
        0xFF => None,
    }
}

/// Read a length-encoded byte string as a view.
///
/// Returns `Some((None, next))` for the NULL marker. A declared length that
/// exceeds the remaining bytes fails.
pub fn read_lenenc_bytes(data: &[u8], pos: usize) -> Option<(Option<&[u8]>, usize)> {
    let (len, next) = read_lenenc_int(data, pos)?;
    match len {
        LenEncInt::Null => Some((None, next)),
        LenEncInt::Value(len) => {
            let size = usize::try_from(len).ok()?;
            read_bytes(data, next, size).map(|(bytes, next)| (Some(bytes), next))
        }
    }
}

/// Read a length-encoded string.
///
/// A NULL marker reads as the empty string; use [`read_lenenc_bytes`] when
/// NULL must be told apart from `""`. Invalid UTF-8 is replaced lossily.
pub fn read_lenenc_string(data: &[u8], pos: usize) -> Option<(String, usize)> {
    read_lenenc_bytes(data, pos).map(|(bytes, next)| {
        let s = bytes.map_or_else(String::new, |b| String::from_utf8_lossy(b).into_owned());
        (s, next)
    })
}

/// Advance past a length-encoded string without materializing it.
pub fn skip_lenenc_string(data: &[u8], pos: usize) -> Option<usize> {
    read_lenenc_bytes(data, pos).map(|(_, next)| next)
}

// ==================== Encoding into a sized buffer ====================

#[inline]
fn debug_check_capacity(data: &[u8], pos: usize, size: usize) {
    debug_assert!(
        pos.checked_add(size).is_some_and(|end| end <= data.len()),
        "writing {size} bytes at {pos} overflows a {}-byte buffer",
        data.len()
    );
}

/// Write one byte.
#[inline]
pub fn write_byte(data: &mut [u8], pos: usize, value: u8) -> usize {
    debug_check_capacity(data, pos, 1);
    data[pos] = value;
    pos + 1
}

/// Write raw bytes.
#[inline]
pub fn write_bytes(data: &mut [u8], pos: usize, value: &[u8]) -> usize {
    debug_check_capacity(data, pos, value.len());
    let end = pos + value.len();
    data[pos..end].copy_from_slice(value);
    end
}

/// Write a little-endian u16.
#[inline]
pub fn write_u16(data: &mut [u8], pos: usize, value: u16) -> usize {
    write_bytes(data, pos, &value.to_le_bytes())
}

/// Write the low 3 bytes of `value`, little-endian.
#[inline]
pub fn write_u24(data: &mut [u8], pos: usize, value: u32) -> usize {
    write_bytes(data, pos, &value.to_le_bytes()[..3])
}

/// Write a little-endian u32.
#[inline]
pub fn write_u32(data: &mut [u8], pos: usize, value: u32) -> usize {
    write_bytes(data, pos, &value.to_le_bytes())
}

/// Write a little-endian u64.
#[inline]
pub fn write_u64(data: &mut [u8], pos: usize, value: u64) -> usize {
    write_bytes(data, pos, &value.to_le_bytes())
}

/// Fill `count` bytes with zero (reserved/padding fields).
pub fn write_zeroes(data: &mut [u8], pos: usize, count: usize) -> usize {
    debug_check_capacity(data, pos, count);
    let end = pos + count;
    data[pos..end].fill(0);
    end
}

/// Write `value` followed by a zero byte.
pub fn write_null_string(data: &mut [u8], pos: usize, value: &str) -> usize {
    let pos = write_bytes(data, pos, value.as_bytes());
    write_byte(data, pos, 0)
}

/// Write a length-encoded integer in its narrowest form.
pub fn write_lenenc_int(data: &mut [u8], pos: usize, value: u64) -> usize {
    if value < 251 {
        write_byte(data, pos, value as u8)
    } else if value < 1 << 16 {
        let pos = write_byte(data, pos, LENENC_U16);
        write_u16(data, pos, value as u16)
    } else if value < 1 << 24 {
        let pos = write_byte(data, pos, LENENC_U24);
        write_u24(data, pos, value as u32)
    } else {
        let pos = write_byte(data, pos, LENENC_U64);
        write_u64(data, pos, value)
    }
}

/// Write a length-encoded byte string.
pub fn write_lenenc_bytes(data: &mut [u8], pos: usize, value: &[u8]) -> usize {
    let pos = write_lenenc_int(data, pos, value.len() as u64);
    write_bytes(data, pos, value)
}

/// Write a length-encoded string.
pub fn write_lenenc_string(data: &mut [u8], pos: usize, value: &str) -> usize {
    write_lenenc_bytes(data, pos, value.as_bytes())
}

// ==================== Appending to a growable buffer ====================

/// Append one byte.
#[inline]
pub fn append_byte(buf: &mut Vec<u8>, value: u8) {
    buf.push(value);
}

/// Append raw bytes.
#[inline]
pub fn append_bytes(buf: &mut Vec<u8>, value: &[u8]) {
    buf.extend_from_slice(value);
}

/// Append a little-endian u16.
#[inline]
pub fn append_u16(buf: &mut Vec<u8>, value: u16) {
    buf.extend_from_slice(&value.to_le_bytes());
}

/// Append the low 3 bytes of `value`, little-endian.
#[inline]
pub fn append_u24(buf: &mut Vec<u8>, value: u32) {
    buf.extend_from_slice(&value.to_le_bytes()[..3]);
}

/// Append a little-endian u32.
#[inline]
pub fn append_u32(buf: &mut Vec<u8>, value: u32) {
    buf.extend_from_slice(&value.to_le_bytes());
}

/// Append a little-endian u64.
#[inline]
pub fn append_u64(buf: &mut Vec<u8>, value: u64) {
    buf.extend_from_slice(&value.to_le_bytes());
}

/// Append `count` zero bytes.
pub fn append_zeroes(buf: &mut Vec<u8>, count: usize) {
    buf.resize(buf.len() + count, 0);
}

/// Append `value` followed by a zero byte.
pub fn append_null_string(buf: &mut Vec<u8>, value: &str) {
    buf.reserve(null_string_size(value));
    buf.extend_from_slice(value.as_bytes());
    buf.push(0);
}

/// Append a length-encoded integer in its narrowest form.
pub fn append_lenenc_int(buf: &mut Vec<u8>, value: u64) {
    if value < 251 {
        buf.push(value as u8);
    } else if value < 1 << 16 {
        buf.push(LENENC_U16);
        append_u16(buf, value as u16);
    } else if value < 1 << 24 {
        buf.push(LENENC_U24);
        append_u24(buf, value as u32);
    } else {
        buf.push(LENENC_U64);
        append_u64(buf, value);
    }
}

/// Append a length-encoded byte string.
pub fn append_lenenc_bytes(buf: &mut Vec<u8>, value: &[u8]) {
    buf.reserve(lenenc_bytes_size(value));
    append_lenenc_int(buf, value.len() as u64);
    buf.extend_from_slice(value);
}

/// Append a length-encoded string.
pub fn append_lenenc_string(buf: &mut Vec<u8>, value: &str) {
    append_lenenc_bytes(buf, value.as_bytes());
}
