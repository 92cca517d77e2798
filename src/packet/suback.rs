use crate::encoding::decode_u16;
use crate::error::{MqttError, Result};
use crate::packet::{
    bag_for_version, decode_properties, push_properties, take_remaining, FixedHeader, MqttPacket,
    PacketType,
};
use crate::protocol::v5::properties::Properties;
use crate::protocol::ProtocolVersion;
use crate::QoS;
use bytes::{Buf, Bytes};

/// SUBACK reason codes, one per requested subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SubAckReasonCode {
    GrantedQoS0 = 0x00,
    GrantedQoS1 = 0x01,
    GrantedQoS2 = 0x02,
    /// Unspecified error; the only failure code before 5.0
    UnspecifiedError = 0x80,
    ImplementationSpecificError = 0x83,
    NotAuthorized = 0x87,
    TopicFilterInvalid = 0x8F,
    PacketIdentifierInUse = 0x91,
    QuotaExceeded = 0x97,
    SharedSubscriptionsNotSupported = 0x9E,
    SubscriptionIdentifiersNotSupported = 0xA1,
    WildcardSubscriptionsNotSupported = 0xA2,
}

impl SubAckReasonCode {
    /// Creates a reason code from a granted `QoS` level
    #[must_use]
    pub fn from_qos(qos: QoS) -> Self {
        match qos {
            QoS::AtMostOnce => Self::GrantedQoS0,
            QoS::AtLeastOnce => Self::GrantedQoS1,
            QoS::ExactlyOnce => Self::GrantedQoS2,
        }
    }

    #[must_use]
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x00 => Some(Self::GrantedQoS0),
            0x01 => Some(Self::GrantedQoS1),
            0x02 => Some(Self::GrantedQoS2),
            0x80 => Some(Self::UnspecifiedError),
            0x83 => Some(Self::ImplementationSpecificError),
            0x87 => Some(Self::NotAuthorized),
            0x8F => Some(Self::TopicFilterInvalid),
            0x91 => Some(Self::PacketIdentifierInUse),
            0x97 => Some(Self::QuotaExceeded),
            0x9E => Some(Self::SharedSubscriptionsNotSupported),
            0xA1 => Some(Self::SubscriptionIdentifiersNotSupported),
            0xA2 => Some(Self::WildcardSubscriptionsNotSupported),
            _ => None,
        }
    }

    /// Returns true if the subscription was granted
    #[must_use]
    pub fn is_success(self) -> bool {
        (self as u8) < 0x80
    }

    /// Granted `QoS`, if the subscription succeeded
    #[must_use]
    pub fn granted_qos(self) -> Option<QoS> {
        match self {
            Self::GrantedQoS0 => Some(QoS::AtMostOnce),
            Self::GrantedQoS1 => Some(QoS::AtLeastOnce),
            Self::GrantedQoS2 => Some(QoS::ExactlyOnce),
            _ => None,
        }
    }

    /// Returns true if the code exists in 3.1 and 3.1.1
    #[must_use]
    pub fn is_v3(self) -> bool {
        self.is_success() || self == Self::UnspecifiedError
    }
}

/// MQTT SUBACK packet
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubAckPacket {
    pub packet_id: u16,
    /// Reason codes in the order of the SUBSCRIBE topic filters
    pub reason_codes: Vec<SubAckReasonCode>,
    /// SUBACK properties (v5.0 only)
    pub properties: Option<Properties>,
}

impl SubAckPacket {
    /// Creates a new v5.0 SUBACK packet
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
        self
    }

    #[must_use]
    pub fn add_reason_code(mut self, code: SubAckReasonCode) -> Self {
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

    fn check_code(&self, code: SubAckReasonCode) -> Result<()> {
        if self.properties.is_none() && !code.is_v3() {
            return Err(MqttError::MalformedPacket(format!(
                "SUBACK return code {code:?} requires MQTT 5.0"
            )));
        }
        Ok(())
    }
}

impl MqttPacket for SubAckPacket {
    fn packet_type(&self) -> PacketType {
        PacketType::SubAck
    }

    fn decode_body(&mut self, buf: &mut Bytes, fixed_header: &FixedHeader) -> Result<()> {
        tracing::trace!(
            fixed_header_remaining = fixed_header.remaining_length,
            buf_remaining = buf.remaining(),
            "SUBACK decode started"
        );

        self.packet_id = decode_u16(buf, "packet identifier")?;
        decode_properties(buf, &mut self.properties, PacketType::SubAck.into())?;

        let codes = take_remaining(buf);
        let mut reason_codes = Vec::with_capacity(codes.len());
        for &byte in &codes {
            let code = SubAckReasonCode::from_u8(byte).ok_or_else(|| {
                MqttError::MalformedPacket(format!("Invalid SUBACK reason code: 0x{byte:02X}"))
            })?;
            self.check_code(code)?;
            reason_codes.push(code);
        }
        self.reason_codes = reason_codes;
        Ok(())
    }

    fn segments(&self) -> Result<Vec<Bytes>> {
        for &code in &self.reason_codes {
            self.check_code(code)?;
        }

        let mut segments = vec![Bytes::copy_from_slice(&self.packet_id.to_be_bytes())];
        push_properties(
            &mut segments,
            self.properties.as_ref(),
            PacketType::SubAck.into(),
        )?;
        segments.push(self.reason_codes.iter().map(|&c| c as u8).collect());
        Ok(segments)
    }
}
