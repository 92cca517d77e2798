use crate::encoding::{decode_string, decode_u16, encode_string};
use crate::error::{MqttError, Result};
use crate::packet::{
    bag_for_version, decode_properties, push_properties, FixedHeader, MqttPacket, PacketType,
};
use crate::protocol::v5::properties::Properties;
use crate::protocol::ProtocolVersion;
use bytes::{Buf, Bytes, BytesMut};

/// MQTT UNSUBSCRIBE packet
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnsubscribePacket {
    pub packet_id: u16,
    /// Topic filters to unsubscribe from
    pub filters: Vec<String>,
    /// UNSUBSCRIBE properties (v5.0 only)
    pub properties: Option<Properties>,
}

impl UnsubscribePacket {
    /// Creates a new v5.0 UNSUBSCRIBE packet with no filters
    #[must_use]
    pub fn new(packet_id: u16) -> Self {
        Self {
            packet_id,
            filters: Vec::new(),
            properties: Some(Properties::new()),
        }
    }

    /// Switches the packet to the layout of `version`
    #[must_use]
    pub fn with_version(mut self, version: ProtocolVersion) -> Self {
        self.properties = bag_for_version(version, self.properties.take());
        self
    }

    /// Adds a topic filter to unsubscribe from
    #[must_use]
    pub fn add_filter(mut self, filter: impl Into<String>) -> Self {
        self.filters.push(filter.into());
        self
    }

    #[must_use]
    pub fn with_user_property(mut self, key: String, value: String) -> Self {
        self.properties
            .get_or_insert_with(Properties::new)
            .add_user_property(key, value);
        self
    }
}

impl MqttPacket for UnsubscribePacket {
    fn packet_type(&self) -> PacketType {
        PacketType::Unsubscribe
    }

    fn decode_body(&mut self, buf: &mut Bytes, fixed_header: &FixedHeader) -> Result<()> {
        tracing::trace!(
            fixed_header_remaining = fixed_header.remaining_length,
            buf_remaining = buf.remaining(),
            "UNSUBSCRIBE decode started"
        );

        self.packet_id = decode_u16(buf, "packet identifier")?;
        decode_properties(buf, &mut self.properties, PacketType::Unsubscribe.into())?;

        let mut filters = Vec::new();
        while buf.has_remaining() {
            filters.push(decode_string(buf)?);
        }

        if filters.is_empty() {
            return Err(MqttError::ProtocolError(
                "UNSUBSCRIBE packet must contain at least one topic filter".to_string(),
            ));
        }

        self.filters = filters;
        Ok(())
    }

    fn segments(&self) -> Result<Vec<Bytes>> {
        if self.filters.is_empty() {
            return Err(MqttError::ProtocolError(
                "UNSUBSCRIBE packet must contain at least one topic filter".to_string(),
            ));
        }

        let mut segments = vec![Bytes::copy_from_slice(&self.packet_id.to_be_bytes())];
        push_properties(
            &mut segments,
            self.properties.as_ref(),
            PacketType::Unsubscribe.into(),
        )?;

        let mut payload = BytesMut::new();
        for filter in &self.filters {
            encode_string(&mut payload, filter)?;
        }
        segments.push(payload.freeze());
        Ok(segments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(bytes: &'static [u8], version: ProtocolVersion) -> Result<UnsubscribePacket> {
        let mut body = Bytes::from_static(bytes);
        let header = FixedHeader::new(PacketType::Unsubscribe, 0x02, bytes.len() as u32);
        let mut packet = UnsubscribePacket::default().with_version(version);
        packet.decode_body(&mut body, &header)?;
        Ok(packet)
    }

    #[test]
    fn test_unsubscribe_v311_bytes() {
        let packet = UnsubscribePacket::new(3)
            .with_version(ProtocolVersion::V311)
            .add_filter("a/#");

        let mut buf = Vec::new();
        packet.write_to(&mut buf).unwrap();
        assert_eq!(buf, vec![0xA2, 0x07, 0x00, 0x03, 0x00, 0x03, b'a', b'/', b'#']);

        let decoded = decode(&[0x00, 0x03, 0x00, 0x03, b'a', b'/', b'#'], ProtocolVersion::V311)
            .unwrap();
        assert_eq!(decoded, packet);
    }

    #[test]
    fn test_unsubscribe_v5_round_trip() {
        let packet = UnsubscribePacket::new(1000)
            .add_filter("sensors/+/temp")
            .add_filter("alerts")
            .with_user_property("origin".to_string(), "test".to_string());

        let mut body = Bytes::from(packet.segments().unwrap().concat());
        let header = FixedHeader::new(PacketType::Unsubscribe, 0x02, body.len() as u32);
        let mut decoded = UnsubscribePacket::default().with_version(ProtocolVersion::V5);
        decoded.decode_body(&mut body, &header).unwrap();
        assert_eq!(decoded, packet);
    }

    #[test]
    fn test_unsubscribe_empty_rejected() {
        assert!(matches!(
            UnsubscribePacket::new(1).segments(),
            Err(MqttError::ProtocolError(_))
        ));
        assert!(matches!(
            decode(&[0x00, 0x01], ProtocolVersion::V311),
            Err(MqttError::ProtocolError(_))
        ));
    }

    #[test]
    fn test_unsubscribe_short_entry() {
        assert!(matches!(
            decode(&[0x00, 0x01, 0x00, 0x04, b'a', b'b'], ProtocolVersion::V311),
            Err(MqttError::MalformedPacket(_))
        ));
    }
}
