//! Bounds-checked fixed-width reads
//!
//! `Buf::get_*` panics on a short buffer, so every fixed-width field read
//! from untrusted input goes through these helpers instead.

use crate::error::{MqttError, Result};
use bytes::Buf;

/// Reads one byte
///
/// # Errors
///
/// Returns `MalformedPacket` naming `field` if the buffer is empty
pub fn decode_u8<B: Buf>(buf: &mut B, field: &str) -> Result<u8> {
    if !buf.has_remaining() {
        return Err(MqttError::MalformedPacket(format!("Missing {field}")));
    }
    Ok(buf.get_u8())
}

/// Reads a big-endian u16
///
/// # Errors
///
/// Returns `MalformedPacket` naming `field` if fewer than 2 bytes remain
pub fn decode_u16<B: Buf>(buf: &mut B, field: &str) -> Result<u16> {
    if buf.remaining() < 2 {
        return Err(MqttError::MalformedPacket(format!(
            "Insufficient bytes for {field}: expected 2, got {}",
            buf.remaining()
        )));
    }
    Ok(buf.get_u16())
}

/// Reads a big-endian u32
///
/// # Errors
///
/// Returns `MalformedPacket` naming `field` if fewer than 4 bytes remain
pub fn decode_u32<B: Buf>(buf: &mut B, field: &str) -> Result<u32> {
    if buf.remaining() < 4 {
        return Err(MqttError::MalformedPacket(format!(
            "Insufficient bytes for {field}: expected 4, got {}",
            buf.remaining()
        )));
    }
    Ok(buf.get_u32())
}
