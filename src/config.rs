use crate::constants::limits::MAX_REMAINING_LENGTH;
use crate::protocol::ProtocolVersion;

/// Settings applied when reading packets
///
/// ```
/// use mqtt_packets::{CodecConfig, ProtocolVersion};
///
/// let config = CodecConfig::new(ProtocolVersion::V311).with_maximum_packet_size(64 * 1024);
/// assert_eq!(config.maximum_packet_size, 65_536);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodecConfig {
    /// Version used to build every packet except CONNECT
    pub protocol_version: ProtocolVersion,
    /// Largest remaining length accepted before reading the body
    pub maximum_packet_size: u32,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            protocol_version: ProtocolVersion::V5,
            maximum_packet_size: MAX_REMAINING_LENGTH,
        }
    }
}

impl CodecConfig {
    #[must_use]
    pub fn new(protocol_version: ProtocolVersion) -> Self {
        Self {
            protocol_version,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_protocol_version(mut self, version: ProtocolVersion) -> Self {
        self.protocol_version = version;
        self
    }

    /// Caps the accepted remaining length; values above the protocol limit
    /// are clamped
    #[must_use]
    pub fn with_maximum_packet_size(mut self, size: u32) -> Self {
        self.maximum_packet_size = size.min(MAX_REMAINING_LENGTH);
        self
    }
}

impl From<ProtocolVersion> for CodecConfig {
    fn from(version: ProtocolVersion) -> Self {
        Self::new(version)
    }
}
