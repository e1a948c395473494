//! Field codecs for the GoPiGo3 SPI protocol.
//!
//! All multi-byte integers are big-endian. The readers return the raw
//! unsigned value; fields that can be negative go through the `sign*`
//! helpers, which undo two's complement at the field's own width.

use crate::error::{ProtocolError, Result};

// ---------------------------------------------------------------------------
// Read helpers
// ---------------------------------------------------------------------------

/// Read an unsigned 8-bit integer.
pub fn read8(data: &[u8], offset: usize) -> Result<u8> {
    check_len(data, offset, 1, "UINT8")?;
    Ok(data[offset])
}

/// Read a big-endian unsigned 16-bit integer.
pub fn read16(data: &[u8], offset: usize) -> Result<u16> {
    check_len(data, offset, 2, "UINT16")?;
    Ok(u16::from_be_bytes([data[offset], data[offset + 1]]))
}

/// Read a big-endian unsigned 32-bit integer.
pub fn read32(data: &[u8], offset: usize) -> Result<u32> {
    check_len(data, offset, 4, "UINT32")?;
    Ok(u32::from_be_bytes([
        data[offset],
        data[offset + 1],
        data[offset + 2],
        data[offset + 3],
    ]))
}

/// Decode a string stored as a run of non-zero bytes, ending at the first
/// zero or after `max` bytes, whichever comes first.
pub fn read_cstr(data: &[u8], offset: usize, max: usize) -> Result<String> {
    check_len(data, offset, max, "STRING")?;
    let slot = &data[offset..offset + max];
    let end = slot.iter().position(|&b| b == 0).unwrap_or(slot.len());
    Ok(String::from_utf8_lossy(&slot[..end]).into_owned())
}

/// Render `len` bytes as lowercase hex, two digits per byte.
pub fn read_hex(data: &[u8], offset: usize, len: usize) -> Result<String> {
    check_len(data, offset, len, "HEX")?;
    Ok(data[offset..offset + len].iter().map(|b| format!("{b:02x}")).collect())
}

// ---------------------------------------------------------------------------
// Sign conversion
// ---------------------------------------------------------------------------

/// Reinterpret an 8-bit field as two's complement.
pub fn sign8(raw: u8) -> i8 {
    if raw & 0x80 != 0 {
        (i16::from(raw) - 0x100) as i8
    } else {
        raw as i8
    }
}

/// Reinterpret a 16-bit field as two's complement.
pub fn sign16(raw: u16) -> i16 {
    if raw & 0x8000 != 0 {
        (i32::from(raw) - 0x1_0000) as i16
    } else {
        raw as i16
    }
}

/// Reinterpret a 32-bit field as two's complement.
pub fn sign32(raw: u32) -> i32 {
    if raw & 0x8000_0000 != 0 {
        (i64::from(raw) - 0x1_0000_0000) as i32
    } else {
        raw as i32
    }
}

// ---------------------------------------------------------------------------
// Write helpers
// ---------------------------------------------------------------------------

/// Write a signed 8-bit integer as its two's-complement byte.
pub fn write_i8(buf: &mut Vec<u8>, val: i8) {
    buf.push(val as u8);
}

/// Write a big-endian unsigned 16-bit integer.
pub fn write_u16(buf: &mut Vec<u8>, val: u16) {
    buf.extend_from_slice(&val.to_be_bytes());
}

/// Write a big-endian signed 16-bit integer.
pub fn write_i16(buf: &mut Vec<u8>, val: i16) {
    buf.extend_from_slice(&val.to_be_bytes());
}

/// Write a big-endian signed 32-bit integer.
pub fn write_i32(buf: &mut Vec<u8>, val: i32) {
    buf.extend_from_slice(&val.to_be_bytes());
}

/// Space-separated uppercase hex, for logs.
pub fn hex_dump(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{b:02X}"))
        .collect::<Vec<_>>()
        .join(" ")
}

// ---------------------------------------------------------------------------
// Internal
// ---------------------------------------------------------------------------

fn check_len(data: &[u8], offset: usize, need: usize, field: &'static str) -> Result<()> {
    if data.len() < offset + need {
        Err(ProtocolError::ReplyTooShort {
            field,
            need: offset + need,
            got: data.len(),
        }
        .into())
    } else {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
