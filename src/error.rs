use thiserror::Error;

pub type Result<T> = std::result::Result<T, MqttError>;

/// Errors produced while encoding or decoding MQTT control packets
///
/// Every error is terminal for the call that produced it. The codec never
/// retries and never returns a partially decoded packet.
///
/// # Error Categories
///
/// - **I/O**: `Io` wraps failures of the underlying reader or writer unchanged
/// - **Framing**: `MalformedLength`, `LengthMismatch`, `TruncatedInput`, `PacketTooLarge`
/// - **Packet content**: `UnknownPacketType`, `UnsupportedProtocolVersion`,
///   `ProtocolError`, `MalformedPacket`
///
/// # Examples
///
/// ```
/// use mqtt_packets::{MqttError, Result};
///
/// fn check_version(byte: u8) -> Result<()> {
///     if !(3..=5).contains(&byte) {
///         return Err(MqttError::UnsupportedProtocolVersion(byte));
///     }
///     Ok(())
/// }
///
/// assert!(check_version(4).is_ok());
/// assert!(check_version(7).is_err());
/// ```
#[derive(Error, Debug)]
pub enum MqttError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed variable length integer: {0}")]
    MalformedLength(String),

    #[error("Unknown packet type: {0}")]
    UnknownPacketType(u8),

    #[error("Unsupported protocol version: {0}")]
    UnsupportedProtocolVersion(u8),

    #[error("Truncated input: needed {needed} bytes, {available} available")]
    TruncatedInput { needed: usize, available: usize },

    #[error("Protocol error: {0}")]
    ProtocolError(String),

    #[error("Length mismatch: remaining length {declared}, got {actual} bytes")]
    LengthMismatch { declared: usize, actual: usize },

    #[error("Malformed packet: {0}")]
    MalformedPacket(String),

    #[error("Packet too large: size {size} exceeds maximum {max}")]
    PacketTooLarge { size: usize, max: usize },
}

impl MqttError {
    /// Returns true if the error came from the underlying reader or writer
    #[must_use]
    pub fn is_io(&self) -> bool {
        matches!(self, Self::Io(_))
    }

    /// Returns true if more input may complete the frame
    ///
    /// Only in-memory decoding reports `TruncatedInput`, so stream readers
    /// never see this return true.
    #[must_use]
    pub fn is_incomplete(&self) -> bool {
        matches!(self, Self::TruncatedInput { .. })
    }
}
