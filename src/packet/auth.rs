use crate::error::{MqttError, Result};
use crate::packet::disconnect::{decode_reason_block, reason_block_segments};
use crate::packet::{bag_for_version, FixedHeader, MqttPacket, PacketType};
use crate::protocol::v5::properties::Properties;
use crate::protocol::v5::reason_codes::ReasonCode;
use crate::protocol::ProtocolVersion;
use bytes::{Buf, Bytes};

/// AUTH packet for MQTT v5.0 enhanced authentication
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthPacket {
    /// Success, Continue authentication or Re-authenticate
    pub reason_code: ReasonCode,
    /// AUTH properties; `None` only for a packet built for an older version
    pub properties: Option<Properties>,
}

impl Default for AuthPacket {
    fn default() -> Self {
        Self {
            reason_code: ReasonCode::Success,
            properties: None,
        }
    }
}

impl AuthPacket {
    #[must_use]
    pub fn new(reason_code: ReasonCode) -> Self {
        Self {
            reason_code,
            properties: Some(Properties::new()),
        }
    }

    /// Switches the packet to the layout of `version`
    #[must_use]
    pub fn with_version(mut self, version: ProtocolVersion) -> Self {
        self.properties = bag_for_version(version, self.properties.take());
        self
    }

    /// Creates an AUTH packet continuing an exchange with `method`
    #[must_use]
    pub fn continue_authentication(method: String, data: Option<Bytes>) -> Self {
        Self::new(ReasonCode::ContinueAuthentication).with_method(method, data)
    }

    /// Creates an AUTH packet starting re-authentication with `method`
    #[must_use]
    pub fn re_authenticate(method: String, data: Option<Bytes>) -> Self {
        Self::new(ReasonCode::ReAuthenticate).with_method(method, data)
    }

    /// Sets the authentication method and, if given, the data
    #[must_use]
    pub fn with_method(mut self, method: String, data: Option<Bytes>) -> Self {
        let properties = self.properties.get_or_insert_with(Properties::new);
        properties.set_authentication_method(method);
        if let Some(data) = data {
            properties.set_authentication_data(data);
        }
        self
    }

    #[must_use]
    pub fn with_reason_string(mut self, reason: String) -> Self {
        self.properties
            .get_or_insert_with(Properties::new)
            .set_reason_string(reason);
        self
    }

    #[must_use]
    pub fn authentication_method(&self) -> Option<&str> {
        self.properties.as_ref()?.authentication_method()
    }

    fn require_v5(&self) -> Result<&Properties> {
        self.properties.as_ref().ok_or_else(|| {
            MqttError::ProtocolError("AUTH packets exist only in MQTT 5.0".to_string())
        })
    }
}

impl MqttPacket for AuthPacket {
    fn packet_type(&self) -> PacketType {
        PacketType::Auth
    }

    fn decode_body(&mut self, buf: &mut Bytes, fixed_header: &FixedHeader) -> Result<()> {
        tracing::trace!(
            fixed_header_remaining = fixed_header.remaining_length,
            buf_remaining = buf.remaining(),
            "AUTH decode started"
        );

        self.require_v5()?;
        let (reason_code, properties) = decode_reason_block(buf, PacketType::Auth)?;
        self.reason_code = reason_code;
        self.properties = Some(properties);
        Ok(())
    }

    fn segments(&self) -> Result<Vec<Bytes>> {
        let properties = self.require_v5()?;
        reason_block_segments(PacketType::Auth, self.reason_code, properties)
    }
}
