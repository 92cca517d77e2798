use crate::encoding::decode_u8;
use crate::error::{MqttError, Result};
use crate::flags::ConnAckFlags;
use crate::packet::{
    bag_for_version, decode_properties, push_properties, FixedHeader, MqttPacket, PacketType,
};
use crate::protocol::v5::properties::Properties;
use crate::protocol::v5::reason_codes::{ConnectReturnCode, ReasonCode};
use crate::protocol::ProtocolVersion;
use bytes::{Buf, Bytes};

/// MQTT CONNACK packet
///
/// The code byte is kept raw: 3.x return codes and 5.0 reason codes share
/// the same position and overlap in value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnAckPacket {
    /// Session present flag
    pub session_present: bool,
    /// Return code (3.x) or reason code (5.0)
    pub reason_code: u8,
    /// CONNACK properties (v5.0 only)
    pub properties: Option<Properties>,
}

impl ConnAckPacket {
    /// Creates a new v5.0 CONNACK packet
    #[must_use]
    pub fn new(session_present: bool, reason_code: ReasonCode) -> Self {
        Self {
            session_present,
            reason_code: u8::from(reason_code),
            properties: Some(Properties::new()),
        }
    }

    /// Creates a new CONNACK packet for MQTT 3.1 or 3.1.1
    #[must_use]
    pub fn new_v3(session_present: bool, return_code: ConnectReturnCode) -> Self {
        Self {
            session_present,
            reason_code: u8::from(return_code),
            properties: None,
        }
    }

    /// Switches the packet to the layout of `version`
    #[must_use]
    pub fn with_version(mut self, version: ProtocolVersion) -> Self {
        self.properties = bag_for_version(version, self.properties.take());
        self
    }

    fn properties_mut(&mut self) -> &mut Properties {
        self.properties.get_or_insert_with(Properties::new)
    }

    /// Sets the session expiry interval
    #[must_use]
    pub fn with_session_expiry_interval(mut self, interval: u32) -> Self {
        self.properties_mut().set_session_expiry_interval(interval);
        self
    }

    /// Sets the receive maximum
    #[must_use]
    pub fn with_receive_maximum(mut self, max: u16) -> Self {
        self.properties_mut().set_receive_maximum(max);
        self
    }

    /// Sets the maximum `QoS`
    #[must_use]
    pub fn with_maximum_qos(mut self, qos: u8) -> Self {
        self.properties_mut().set_maximum_qos(qos);
        self
    }

    /// Sets the assigned client identifier
    #[must_use]
    pub fn with_assigned_client_id(mut self, id: String) -> Self {
        self.properties_mut().set_assigned_client_identifier(id);
        self
    }

    #[must_use]
    pub fn with_reason_string(mut self, reason: String) -> Self {
        self.properties_mut().set_reason_string(reason);
        self
    }

    /// The code as a 5.0 reason code
    #[must_use]
    pub fn reason(&self) -> Option<ReasonCode> {
        ReasonCode::from_u8(self.reason_code)
    }

    /// The code as a 3.x return code
    #[must_use]
    pub fn return_code(&self) -> Option<ConnectReturnCode> {
        ConnectReturnCode::from_u8(self.reason_code)
    }

    /// Returns true if the connection was accepted
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.reason_code == 0
    }

    fn check_code(&self) -> Result<()> {
        let valid = if self.properties.is_some() {
            self.reason()
                .is_some_and(|code| code.is_valid_for(PacketType::ConnAck))
        } else {
            self.return_code().is_some()
        };

        if valid {
            Ok(())
        } else {
            Err(MqttError::MalformedPacket(format!(
                "Invalid CONNACK code: 0x{:02X}",
                self.reason_code
            )))
        }
    }
}

impl MqttPacket for ConnAckPacket {
    fn packet_type(&self) -> PacketType {
        PacketType::ConnAck
    }

    fn decode_body(&mut self, buf: &mut Bytes, fixed_header: &FixedHeader) -> Result<()> {
        tracing::trace!(
            fixed_header_remaining = fixed_header.remaining_length,
            buf_remaining = buf.remaining(),
            "CONNACK decode started"
        );

        let flags = decode_u8(buf, "acknowledge flags")?;
        if flags & !(ConnAckFlags::SessionPresent as u8) != 0 {
            return Err(MqttError::ProtocolError(format!(
                "CONNACK acknowledge flags 0x{flags:02X} have reserved bits set"
            )));
        }
        self.session_present =
            ConnAckFlags::decompose(flags).contains(&ConnAckFlags::SessionPresent);

        self.reason_code = decode_u8(buf, "reason code")?;
        self.check_code()?;

        decode_properties(buf, &mut self.properties, PacketType::ConnAck.into())
    }

    fn segments(&self) -> Result<Vec<Bytes>> {
        self.check_code()?;

        let flags = if self.session_present {
            ConnAckFlags::SessionPresent as u8
        } else {
            0
        };

        let mut segments = vec![Bytes::copy_from_slice(&[flags, self.reason_code])];
        push_properties(
            &mut segments,
            self.properties.as_ref(),
            PacketType::ConnAck.into(),
        )?;
        Ok(segments)
    }
}
