use crate::error::Result;
use crate::packet::{ack, bag_for_version, FixedHeader, MqttPacket, PacketType};
use crate::protocol::v5::properties::Properties;
use crate::protocol::v5::reason_codes::ReasonCode;
use crate::protocol::ProtocolVersion;
use bytes::Bytes;

/// MQTT PUBACK packet (`QoS` 1 publish acknowledgment)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PubAckPacket {
    pub packet_id: u16,
    pub reason_code: ReasonCode,
    /// PUBACK properties (v5.0 only)
    pub properties: Option<Properties>,
}

impl Default for PubAckPacket {
    fn default() -> Self {
        Self {
            packet_id: 0,
            reason_code: ReasonCode::Success,
            properties: None,
        }
    }
}

impl PubAckPacket {
    /// Creates a new v5.0 PUBACK packet with reason Success
    #[must_use]
    pub fn new(packet_id: u16) -> Self {
        Self {
            packet_id,
            properties: Some(Properties::new()),
            ..Self::default()
        }
    }

    /// Creates a new v5.0 PUBACK packet with a reason code
    #[must_use]
    pub fn new_with_reason(packet_id: u16, reason_code: ReasonCode) -> Self {
        Self {
            reason_code,
            ..Self::new(packet_id)
        }
    }

    /// Switches the packet to the layout of `version`
    #[must_use]
    pub fn with_version(mut self, version: ProtocolVersion) -> Self {
        self.properties = bag_for_version(version, self.properties.take());
        self
    }

    /// Sets the reason string
    #[must_use]
    pub fn with_reason_string(mut self, reason: String) -> Self {
        self.properties
            .get_or_insert_with(Properties::new)
            .set_reason_string(reason);
        self
    }

    /// Adds a user property
    #[must_use]
    pub fn with_user_property(mut self, key: String, value: String) -> Self {
        self.properties
            .get_or_insert_with(Properties::new)
            .add_user_property(key, value);
        self
    }
}

impl MqttPacket for PubAckPacket {
    fn packet_type(&self) -> PacketType {
        PacketType::PubAck
    }

    fn decode_body(&mut self, buf: &mut Bytes, fixed_header: &FixedHeader) -> Result<()> {
        let body = ack::decode(buf, fixed_header, self.properties.is_some())?;
        self.packet_id = body.packet_id;
        self.reason_code = body.reason_code;
        self.properties = body.properties;
        Ok(())
    }

    fn segments(&self) -> Result<Vec<Bytes>> {
        ack::segments(
            PacketType::PubAck,
            self.packet_id,
            self.reason_code,
            self.properties.as_ref(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MqttError;
    use crate::protocol::v5::properties::PropertyId;

    fn round_trip(packet: &PubAckPacket) -> PubAckPacket {
        let mut buf = Vec::new();
        packet.write_to(&mut buf).unwrap();

        let (header, len) = FixedHeader::parse(&buf).unwrap();
        assert_eq!(header.packet_type, PacketType::PubAck);
        assert_eq!(header.flags, 0);

        let mut body = Bytes::copy_from_slice(&buf[len..]);
        let mut decoded = PubAckPacket::default().with_version(if packet.properties.is_some() {
            ProtocolVersion::V5
        } else {
            ProtocolVersion::V311
        });
        decoded.decode_body(&mut body, &header).unwrap();
        assert!(body.is_empty());
        decoded
    }

    #[test]
    fn test_puback_short_form() {
        let packet = PubAckPacket::new(0x1234);
        let segments = packet.segments().unwrap();
        assert_eq!(segments.len(), 1);
        assert_eq!(&segments[0][..], &[0x12, 0x34]);
        assert_eq!(round_trip(&packet), packet);
    }

    #[test]
    fn test_puback_with_reason() {
        let packet = PubAckPacket::new_with_reason(456, ReasonCode::NoMatchingSubscribers)
            .with_reason_string("No subscribers for topic".to_string());

        let decoded = round_trip(&packet);
        assert_eq!(decoded.reason_code, ReasonCode::NoMatchingSubscribers);
        assert!(decoded
            .properties
            .as_ref()
            .unwrap()
            .contains(PropertyId::ReasonString));
        assert_eq!(decoded, packet);
    }

    #[test]
    fn test_puback_reason_without_properties_keeps_reason_byte() {
        let packet = PubAckPacket::new_with_reason(1, ReasonCode::QuotaExceeded);
        let mut buf = Vec::new();
        packet.write_to(&mut buf).unwrap();
        assert_eq!(buf, vec![0x40, 0x03, 0x00, 0x01, 0x97]);
    }

    #[test]
    fn test_puback_v311() {
        let packet = PubAckPacket::new(1234).with_version(ProtocolVersion::V311);
        let mut buf = Vec::new();
        packet.write_to(&mut buf).unwrap();
        assert_eq!(buf, vec![0x40, 0x02, 0x04, 0xD2]);
        assert_eq!(round_trip(&packet), packet);
    }

    #[test]
    fn test_puback_invalid_reason_code() {
        let mut body = Bytes::from_static(&[0x00, 0x7B, 0xFF]);
        let header = FixedHeader::new(PacketType::PubAck, 0, 3);
        let result = PubAckPacket::new(0).decode_body(&mut body, &header);
        assert!(matches!(result, Err(MqttError::MalformedPacket(_))));
    }

}
