use crate::error::Result;
use crate::packet::{ack, bag_for_version, FixedHeader, MqttPacket, PacketType};
use crate::protocol::v5::properties::Properties;
use crate::protocol::v5::reason_codes::ReasonCode;
use crate::protocol::ProtocolVersion;
use bytes::Bytes;

/// MQTT PUBREL packet (`QoS` 2 publish release, part 2)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PubRelPacket {
    pub packet_id: u16,
    pub reason_code: ReasonCode,
    /// PUBREL properties (v5.0 only)
    pub properties: Option<Properties>,
}

impl Default for PubRelPacket {
    fn default() -> Self {
        Self {
            packet_id: 0,
            reason_code: ReasonCode::Success,
            properties: None,
        }
    }
}

impl PubRelPacket {
    /// Creates a new v5.0 PUBREL packet with reason Success
    #[must_use]
    pub fn new(packet_id: u16) -> Self {
        Self {
            packet_id,
            properties: Some(Properties::new()),
            ..Self::default()
        }
    }

    /// Creates a new v5.0 PUBREL packet with a reason code
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

impl MqttPacket for PubRelPacket {
    fn packet_type(&self) -> PacketType {
        PacketType::PubRel
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
            PacketType::PubRel,
            self.packet_id,
            self.reason_code,
            self.properties.as_ref(),
        )
    }
}
