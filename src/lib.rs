//! # MQTT control packet codec
//!
//! Bit-exact encoding and decoding of the fifteen MQTT control packets for
//! protocol versions 3.1, 3.1.1 and 5.0.
//!
//! The crate is a codec only. It turns bytes from a reader into typed packets
//! and typed packets into bytes on a writer. Sessions, QoS retry, routing and
//! connection management belong to the caller.
//!
//! ## Layout
//!
//! - [`packet`]: the [`FixedHeader`], the [`MqttPacket`] contract and one
//!   module per packet type
//! - [`protocol`]: [`ProtocolVersion`], 5.0 reason codes and properties
//! - [`control`]: the [`ControlPacket`] envelope with blocking reads and
//!   vectored writes
//! - [`transport`]: the same reads and writes over tokio streams
//!
//! ## Example
//!
//! ```rust
//! use mqtt_packets::packet::publish::PublishPacket;
//! use mqtt_packets::{read_packet, ControlPacket, Packet, ProtocolVersion, QoS};
//! use std::io::Cursor;
//!
//! # fn main() -> mqtt_packets::Result<()> {
//! let publish = PublishPacket::new("sensors/temp", &b"21.5"[..], QoS::AtLeastOnce)
//!     .with_packet_id(1)
//!     .with_version(ProtocolVersion::V311);
//!
//! let mut wire = Vec::new();
//! ControlPacket::from(publish.clone()).write_to(&mut wire)?;
//!
//! let packet = read_packet(&mut Cursor::new(wire), ProtocolVersion::V311)?;
//! assert_eq!(packet.content, Packet::Publish(publish));
//! # Ok(())
//! # }
//! ```

#![warn(clippy::pedantic)]

pub mod config;
pub mod constants;
pub mod control;
pub mod encoding;
pub mod error;
pub mod flags;
pub mod packet;
pub mod protocol;
pub mod transport;

pub use config::CodecConfig;
pub use control::{new_control_packet, read_packet, read_packet_with_config, ControlPacket};
pub use error::{MqttError, Result};
pub use packet::publish::PublishPacket;
pub use packet::{FixedHeader, MqttPacket, Packet, PacketType};
pub use protocol::v5::properties::{Properties, PropertyId, PropertyValue, PropertyValueType};
pub use protocol::v5::reason_codes::ReasonCode;
pub use protocol::ProtocolVersion;
pub use transport::{read_packet_async, PacketIo};

/// Quality of service level
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum QoS {
    #[default]
    AtMostOnce = 0,
    AtLeastOnce = 1,
    ExactlyOnce = 2,
}

impl TryFrom<u8> for QoS {
    type Error = MqttError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(QoS::AtMostOnce),
            1 => Ok(QoS::AtLeastOnce),
            2 => Ok(QoS::ExactlyOnce),
            _ => Err(MqttError::ProtocolError(format!("Invalid QoS value: {value}"))),
        }
    }
}

impl From<QoS> for u8 {
    fn from(qos: QoS) -> Self {
        qos as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_qos_values() {
        assert_eq!(QoS::AtMostOnce as u8, 0);
        assert_eq!(QoS::AtLeastOnce as u8, 1);
        assert_eq!(QoS::ExactlyOnce as u8, 2);
    }

    #[test]
    fn test_qos_try_from_u8() {
        assert_eq!(QoS::try_from(0).unwrap(), QoS::AtMostOnce);
        assert_eq!(QoS::try_from(1).unwrap(), QoS::AtLeastOnce);
        assert_eq!(QoS::try_from(2).unwrap(), QoS::ExactlyOnce);

        assert!(matches!(QoS::try_from(3), Err(MqttError::ProtocolError(_))));
        assert!(QoS::try_from(255).is_err());
    }

    #[test]
    fn test_qos_into_u8() {
        assert_eq!(u8::from(QoS::AtMostOnce), 0);
        assert_eq!(u8::from(QoS::AtLeastOnce), 1);
        assert_eq!(u8::from(QoS::ExactlyOnce), 2);
    }
}
