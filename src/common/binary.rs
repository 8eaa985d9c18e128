//! Little-endian readers for BIFF record payloads.
//!
//! Every reader is bounds-checked and reports the offset it needed, so record
//! parsers can turn a short payload into an error instead of panicking.

use thiserror::Error;
use zerocopy::{F64, FromBytes, LE, U16, U32};

/// Binary parsing error type
#[derive(Debug, Clone, Error, PartialEq)]
pub enum BinaryError {
    /// Not enough data to read the requested type
    #[error("Insufficient data: expected {expected}, got {available}")]
    InsufficientData { expected: usize, available: usize },
    /// Failed to parse the data
    #[error("Parse error: {0}")]
    ParseError(String),
}

/// Result type for binary operations
pub type BinaryResult<T> = Result<T, BinaryError>;

#[inline]
fn window(data: &[u8], offset: usize, len: usize) -> BinaryResult<&[u8]> {
    let end = offset.checked_add(len).ok_or(BinaryError::InsufficientData {
        expected: usize::MAX,
        available: data.len(),
    })?;
    data.get(offset..end).ok_or(BinaryError::InsufficientData {
        expected: end,
        available: data.len(),
    })
}

/// Read a single byte at the given offset.
#[inline]
pub fn read_u8(data: &[u8], offset: usize) -> BinaryResult<u8> {
    window(data, offset, 1).map(|bytes| bytes[0])
}

/// Read a little-endian u16 from a byte slice at the given offset.
///
/// # Examples
///
/// ```
/// use gridfold::common::binary::read_u16_le;
/// let data = [0x34, 0x12, 0x78, 0x56];
/// assert_eq!(read_u16_le(&data, 0).unwrap(), 0x1234);
/// assert_eq!(read_u16_le(&data, 2).unwrap(), 0x5678);
/// ```
#[inline]
pub fn read_u16_le(data: &[u8], offset: usize) -> BinaryResult<u16> {
    U16::<LE>::read_from_bytes(window(data, offset, 2)?)
        .map(|v| v.get())
        .map_err(|_| BinaryError::ParseError("Failed to read u16".to_string()))
}

/// Read a little-endian u32 from a byte slice at the given offset.
///
/// # Examples
///
/// ```
/// use gridfold::common::binary::read_u32_le;
/// let data = [0x78, 0x56, 0x34, 0x12];
/// assert_eq!(read_u32_le(&data, 0).unwrap(), 0x12345678);
/// ```
#[inline]
pub fn read_u32_le(data: &[u8], offset: usize) -> BinaryResult<u32> {
    U32::<LE>::read_from_bytes(window(data, offset, 4)?)
        .map(|v| v.get())
        .map_err(|_| BinaryError::ParseError("Failed to read u32".to_string()))
}

/// Read a little-endian f64 from a byte slice at the given offset.
#[inline]
pub fn read_f64_le(data: &[u8], offset: usize) -> BinaryResult<f64> {
    F64::<LE>::read_from_bytes(window(data, offset, 8)?)
        .map(|v| v.get())
        .map_err(|_| BinaryError::ParseError("Failed to read f64".to_string()))
}

/// Decode `char_count` UTF-16LE code units starting at `offset`.
///
/// Unpaired surrogates are replaced rather than rejected.
pub fn read_utf16le(data: &[u8], offset: usize, char_count: usize) -> BinaryResult<String> {
    let bytes = window(data, offset, char_count.saturating_mul(2))?;
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect();
    Ok(String::from_utf16_lossy(&units))
}
