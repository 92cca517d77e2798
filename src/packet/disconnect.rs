use crate::error::{MqttError, Result};
use crate::packet::{bag_for_version, push_properties, FixedHeader, MqttPacket, PacketType};
use crate::protocol::v5::properties::Properties;
use crate::protocol::v5::reason_codes::{ReasonCode, NORMAL_DISCONNECTION};
use crate::protocol::ProtocolVersion;
use bytes::{Buf, Bytes};

/// MQTT DISCONNECT packet
///
/// Pre-5.0 the body is empty and the reason code stays at normal
/// disconnection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisconnectPacket {
    pub reason_code: ReasonCode,
    /// DISCONNECT properties (v5.0 only)
    pub properties: Option<Properties>,
}

impl Default for DisconnectPacket {
    fn default() -> Self {
        Self {
            reason_code: NORMAL_DISCONNECTION,
            properties: None,
        }
    }
}

impl DisconnectPacket {
    /// Creates a new v5.0 DISCONNECT packet
    #[must_use]
    pub fn new(reason_code: ReasonCode) -> Self {
        Self {
            reason_code,
            properties: Some(Properties::new()),
        }
    }

    /// Creates a v5.0 normal disconnection packet
    #[must_use]
    pub fn normal() -> Self {
        Self::new(NORMAL_DISCONNECTION)
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

    #[must_use]
    pub fn with_session_expiry_interval(mut self, seconds: u32) -> Self {
        self.properties_mut().set_session_expiry_interval(seconds);
        self
    }

    #[must_use]
    pub fn with_reason_string(mut self, reason: String) -> Self {
        self.properties_mut().set_reason_string(reason);
        self
    }

    /// Sets the server reference for redirect
    #[must_use]
    pub fn with_server_reference(mut self, reference: String) -> Self {
        self.properties_mut().set_server_reference(reference);
        self
    }

    #[must_use]
    pub fn with_user_property(mut self, key: String, value: String) -> Self {
        self.properties_mut().add_user_property(key, value);
        self
    }
}

/// Decodes the optional reason code and property block of a 5.0
/// DISCONNECT or AUTH body
///
/// An empty body means Success with no properties, a single byte is the
/// reason code alone.
pub(crate) fn decode_reason_block(
    buf: &mut Bytes,
    packet_type: PacketType,
) -> Result<(ReasonCode, Properties)> {
    if !buf.has_remaining() {
        tracing::debug!("{packet_type} short form: empty body");
        return Ok((ReasonCode::Success, Properties::new()));
    }

    let reason_code = ReasonCode::decode_for(buf.get_u8(), packet_type)?;
    if !buf.has_remaining() {
        tracing::debug!(?reason_code, "{packet_type} short form: reason code only");
        return Ok((reason_code, Properties::new()));
    }

    let properties = Properties::decode(buf, packet_type.into())?;
    Ok((reason_code, properties))
}

/// Serializes a 5.0 reason code and property block in its shortest form
pub(crate) fn reason_block_segments(
    packet_type: PacketType,
    reason_code: ReasonCode,
    properties: &Properties,
) -> Result<Vec<Bytes>> {
    if !reason_code.is_valid_for(packet_type) {
        return Err(MqttError::ProtocolError(format!(
            "Reason code {reason_code:?} is not valid in {packet_type}"
        )));
    }

    if properties.is_empty() {
        if reason_code == ReasonCode::Success {
            return Ok(Vec::new());
        }
        return Ok(vec![Bytes::copy_from_slice(&[u8::from(reason_code)])]);
    }

    let mut segments = vec![Bytes::copy_from_slice(&[u8::from(reason_code)])];
    push_properties(&mut segments, Some(properties), packet_type.into())?;
    Ok(segments)
}

impl MqttPacket for DisconnectPacket {
    fn packet_type(&self) -> PacketType {
        PacketType::Disconnect
    }

    fn decode_body(&mut self, buf: &mut Bytes, fixed_header: &FixedHeader) -> Result<()> {
        tracing::trace!(
            fixed_header_remaining = fixed_header.remaining_length,
            buf_remaining = buf.remaining(),
            "DISCONNECT decode started"
        );

        if self.properties.is_none() {
            self.reason_code = NORMAL_DISCONNECTION;
            return Ok(());
        }

        let (reason_code, properties) = decode_reason_block(buf, PacketType::Disconnect)?;
        self.reason_code = reason_code;
        self.properties = Some(properties);
        Ok(())
    }

    fn segments(&self) -> Result<Vec<Bytes>> {
        match &self.properties {
            Some(properties) => {
                reason_block_segments(PacketType::Disconnect, self.reason_code, properties)
            }
            None => Ok(Vec::new()),
        }
    }
}
