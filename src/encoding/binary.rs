use crate::constants::limits::MAX_BINARY_LENGTH;
use crate::error::{MqttError, Result};
use bytes::{Buf, BufMut, Bytes};

/// Encodes binary data with a 2-byte big-endian length prefix
///
/// # Errors
///
/// Returns `MalformedPacket` if the data is longer than 65,535 bytes
pub fn encode_binary<B: BufMut>(buf: &mut B, data: &[u8]) -> Result<()> {
    let len = u16::try_from(data.len()).map_err(|_| {
        MqttError::MalformedPacket(format!(
            "Binary data length {} exceeds maximum {MAX_BINARY_LENGTH}",
            data.len()
        ))
    })?;

    buf.put_u16(len);
    buf.put_slice(data);
    Ok(())
}

/// Decodes length-prefixed binary data
///
/// # Errors
///
/// Returns `MalformedPacket` if there are insufficient bytes in the buffer
pub fn decode_binary<B: Buf>(buf: &mut B) -> Result<Bytes> {
    if buf.remaining() < 2 {
        return Err(MqttError::MalformedPacket(
            "Insufficient bytes for binary data length".to_string(),
        ));
    }

    let len = buf.get_u16() as usize;

    if buf.remaining() < len {
        return Err(MqttError::MalformedPacket(format!(
            "Insufficient bytes for binary data: expected {len}, got {}",
            buf.remaining()
        )));
    }

    Ok(buf.copy_to_bytes(len))
}

/// Encoded length of binary data (2 bytes for length + data bytes)
#[must_use]
pub fn binary_len(data: &[u8]) -> usize {
    2 + data.len()
}
