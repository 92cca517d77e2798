use crate::constants::limits::LARGE_PACKET_THRESHOLD;
use crate::encoding::{decode_string, decode_u16, encode_string};
use crate::error::{MqttError, Result};
use crate::flags::PublishFlags;
use crate::packet::{
    bag_for_version, decode_properties, push_properties, take_remaining, FixedHeader, MqttPacket,
    PacketType,
};
use crate::protocol::v5::properties::Properties;
use crate::protocol::ProtocolVersion;
use crate::QoS;
use bytes::{Buf, BufMut, Bytes, BytesMut};

/// MQTT PUBLISH packet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishPacket {
    pub topic_name: String,
    /// Packet identifier, present iff `QoS` > 0
    pub packet_id: Option<u16>,
    pub payload: Bytes,
    pub qos: QoS,
    pub retain: bool,
    /// Duplicate delivery flag
    pub dup: bool,
    /// PUBLISH properties (v5.0 only)
    pub properties: Option<Properties>,
}

impl Default for PublishPacket {
    fn default() -> Self {
        Self {
            topic_name: String::new(),
            packet_id: None,
            payload: Bytes::new(),
            qos: QoS::AtMostOnce,
            retain: false,
            dup: false,
            properties: None,
        }
    }
}

impl PublishPacket {
    /// Creates a new v5.0 PUBLISH packet
    ///
    /// `QoS` 1 and 2 start with packet identifier 0; set a real one with
    /// `with_packet_id`.
    #[must_use]
    pub fn new(topic_name: impl Into<String>, payload: impl Into<Bytes>, qos: QoS) -> Self {
        Self {
            topic_name: topic_name.into(),
            packet_id: (qos != QoS::AtMostOnce).then_some(0),
            payload: payload.into(),
            qos,
            properties: Some(Properties::new()),
            ..Self::default()
        }
    }

    /// Switches the packet to the layout of `version`
    #[must_use]
    pub fn with_version(mut self, version: ProtocolVersion) -> Self {
        self.properties = bag_for_version(version, self.properties.take());
        self
    }

    /// Sets the packet identifier; ignored at `QoS` 0
    #[must_use]
    pub fn with_packet_id(mut self, id: u16) -> Self {
        if self.qos != QoS::AtMostOnce {
            self.packet_id = Some(id);
        }
        self
    }

    #[must_use]
    pub fn with_retain(mut self, retain: bool) -> Self {
        self.retain = retain;
        self
    }

    #[must_use]
    pub fn with_dup(mut self, dup: bool) -> Self {
        self.dup = dup;
        self
    }

    fn properties_mut(&mut self) -> &mut Properties {
        self.properties.get_or_insert_with(Properties::new)
    }

    /// Sets the payload format indicator
    #[must_use]
    pub fn with_payload_format_indicator(mut self, is_utf8: bool) -> Self {
        self.properties_mut().set_payload_format_indicator(is_utf8);
        self
    }

    /// Sets the message expiry interval
    #[must_use]
    pub fn with_message_expiry_interval(mut self, seconds: u32) -> Self {
        self.properties_mut().set_message_expiry_interval(seconds);
        self
    }

    #[must_use]
    pub fn with_topic_alias(mut self, alias: u16) -> Self {
        self.properties_mut().set_topic_alias(alias);
        self
    }

    #[must_use]
    pub fn with_response_topic(mut self, topic: String) -> Self {
        self.properties_mut().set_response_topic(topic);
        self
    }

    #[must_use]
    pub fn with_correlation_data(mut self, data: Bytes) -> Self {
        self.properties_mut().set_correlation_data(data);
        self
    }

    #[must_use]
    pub fn with_user_property(mut self, key: String, value: String) -> Self {
        self.properties_mut().add_user_property(key, value);
        self
    }
}

impl MqttPacket for PublishPacket {
    fn packet_type(&self) -> PacketType {
        PacketType::Publish
    }

    fn flags(&self) -> u8 {
        PublishFlags::pack(self.dup, self.qos, self.retain)
    }

    fn decode_body(&mut self, buf: &mut Bytes, fixed_header: &FixedHeader) -> Result<()> {
        tracing::trace!(
            fixed_header_remaining = fixed_header.remaining_length,
            buf_remaining = buf.remaining(),
            "PUBLISH decode started"
        );

        self.qos = fixed_header.publish_qos()?;
        self.dup = PublishFlags::is_dup(fixed_header.flags);
        self.retain = PublishFlags::is_retain(fixed_header.flags);

        self.topic_name = decode_string(buf)?;
        self.packet_id = if self.qos == QoS::AtMostOnce {
            None
        } else {
            Some(decode_u16(buf, "packet identifier")?)
        };

        decode_properties(buf, &mut self.properties, PacketType::Publish.into())?;

        self.payload = take_remaining(buf);
        if fixed_header.remaining_length > LARGE_PACKET_THRESHOLD {
            tracing::debug!(
                topic = %self.topic_name,
                payload_len = self.payload.len(),
                "Large PUBLISH decoded"
            );
        }
        Ok(())
    }

    fn segments(&self) -> Result<Vec<Bytes>> {
        let mut header = BytesMut::with_capacity(self.topic_name.len() + 4);
        encode_string(&mut header, &self.topic_name)?;
        if self.qos != QoS::AtMostOnce {
            let packet_id = self.packet_id.ok_or_else(|| {
                MqttError::ProtocolError(format!(
                    "PUBLISH with {:?} requires a packet identifier",
                    self.qos
                ))
            })?;
            header.put_u16(packet_id);
        }

        let mut segments = vec![header.freeze()];
        push_properties(
            &mut segments,
            self.properties.as_ref(),
            PacketType::Publish.into(),
        )?;
        segments.push(self.payload.clone());
        Ok(segments)
    }
}
