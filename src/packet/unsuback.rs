use crate::encoding::decode_u16;
use crate::error::{MqttError, Result};
use crate::packet::{
    bag_for_version, decode_properties, push_properties, take_remaining, FixedHeader, MqttPacket,
    PacketType,
};
use crate::protocol::v5::properties::Properties;
use crate::protocol::ProtocolVersion;
use bytes::{Buf, Bytes};

/// UNSUBACK reason codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum UnsubAckReasonCode {
    Success = 0x00,
    NoSubscriptionExisted = 0x11,
    UnspecifiedError = 0x80,
    ImplementationSpecificError = 0x83,
    NotAuthorized = 0x87,
    TopicFilterInvalid = 0x8F,
    PacketIdentifierInUse = 0x91,
}

impl UnsubAckReasonCode {
    #[must_use]
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x00 => Some(Self::Success),
            0x11 => Some(Self::NoSubscriptionExisted),
            0x80 => Some(Self::UnspecifiedError),
            0x83 => Some(Self::ImplementationSpecificError),
            0x87 => Some(Self::NotAuthorized),
            0x8F => Some(Self::TopicFilterInvalid),
            0x91 => Some(Self::PacketIdentifierInUse),
            _ => None,
        }
    }

    /// Returns true for codes below 0x80
    #[must_use]
    pub fn is_success(self) -> bool {
        (self as u8) < 0x80
    }
}

/// MQTT UNSUBACK packet
///
/// Before 5.0 the packet carries only the identifier; reason codes are
/// not written for a packet without a property bag.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnsubAckPacket {
    pub packet_id: u16,
    /// One reason code per UNSUBSCRIBE topic filter (v5.0 only)
    pub reason_codes: Vec<UnsubAckReasonCode>,
    /// UNSUBACK properties (v5.0 only)
    pub properties: Option<Properties>,
}

impl UnsubAckPacket {
    /// Creates a new v5.0 UNSUBACK packet
    #[must_use]
    pub fn new(packet_id: u16) -> Self {
        Self {
            packet_id,
            reason_codes: Vec::new(),
            properties: Some(Properties::new()),
        }
    }

    /// Switches the packet to the layout of `version`
    #[must_use]
    pub fn with_version(mut self, version: ProtocolVersion) -> Self {
        self.properties = bag_for_version(version, self.properties.take());
        if self.properties.is_none() {
            self.reason_codes.clear();
        }
        self
    }

    #[must_use]
    pub fn add_reason_code(mut self, code: UnsubAckReasonCode) -> Self {
        self.reason_codes.push(code);
        self
    }

    #[must_use]
    pub fn with_reason_string(mut self, reason: String) -> Self {
        self.properties
            .get_or_insert_with(Properties::new)
            .set_reason_string(reason);
        self
    }
}

impl MqttPacket for UnsubAckPacket {
    fn packet_type(&self) -> PacketType {
        PacketType::UnsubAck
    }

    fn decode_body(&mut self, buf: &mut Bytes, fixed_header: &FixedHeader) -> Result<()> {
        tracing::trace!(
            fixed_header_remaining = fixed_header.remaining_length,
            buf_remaining = buf.remaining(),
            "UNSUBACK decode started"
        );

        self.packet_id = decode_u16(buf, "packet identifier")?;
        self.reason_codes.clear();
        if self.properties.is_none() {
            return Ok(());
        }

        decode_properties(buf, &mut self.properties, PacketType::UnsubAck.into())?;
        self.reason_codes = take_remaining(buf)
            .iter()
            .map(|&byte| {
                UnsubAckReasonCode::from_u8(byte).ok_or_else(|| {
                    MqttError::MalformedPacket(format!(
                        "Invalid UNSUBACK reason code: 0x{byte:02X}"
                    ))
                })
            })
            .collect::<Result<_>>()?;
        Ok(())
    }

    fn segments(&self) -> Result<Vec<Bytes>> {
        let mut segments = vec![Bytes::copy_from_slice(&self.packet_id.to_be_bytes())];
        if self.properties.is_some() {
            push_properties(
                &mut segments,
                self.properties.as_ref(),
                PacketType::UnsubAck.into(),
            )?;
            segments.push(self.reason_codes.iter().map(|&c| c as u8).collect());
        }
        Ok(segments)
    }
}
