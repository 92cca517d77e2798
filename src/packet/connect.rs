use crate::encoding::{
    decode_binary, decode_string, decode_u16, decode_u8, encode_binary, encode_string,
};
use crate::error::{MqttError, Result};
use crate::flags::ConnectFlagSet;
use crate::packet::{FixedHeader, MqttPacket, PacketType};
use crate::protocol::v5::properties::{Properties, PropertyContext};
use crate::protocol::ProtocolVersion;
use crate::QoS;
use bytes::{Buf, BufMut, Bytes, BytesMut};

/// Will message carried in CONNECT
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WillMessage {
    pub topic: String,
    pub payload: Bytes,
    pub qos: QoS,
    pub retain: bool,
    /// Will properties (v5.0 only)
    pub properties: Option<Properties>,
}

impl WillMessage {
    #[must_use]
    pub fn new(topic: impl Into<String>, payload: impl Into<Bytes>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
            qos: QoS::AtMostOnce,
            retain: false,
            properties: None,
        }
    }

    #[must_use]
    pub fn with_qos(mut self, qos: QoS) -> Self {
        self.qos = qos;
        self
    }

    #[must_use]
    pub fn with_retain(mut self, retain: bool) -> Self {
        self.retain = retain;
        self
    }

    /// Attaches will properties; only emitted by 5.0 packets
    #[must_use]
    pub fn with_properties(mut self, properties: Properties) -> Self {
        self.properties = Some(properties);
        self
    }
}

/// MQTT CONNECT packet
///
/// The protocol version field selects the wire layout, both when encoding and
/// when decoding: the version byte read from the wire replaces it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectPacket {
    pub protocol_version: ProtocolVersion,
    /// Clean start flag (Clean Session before 5.0)
    pub clean_start: bool,
    /// Keep alive interval in seconds
    pub keep_alive: u16,
    pub client_id: String,
    pub will: Option<WillMessage>,
    pub username: Option<String>,
    pub password: Option<Bytes>,
    /// CONNECT properties (v5.0 only)
    pub properties: Option<Properties>,
}

impl Default for ConnectPacket {
    fn default() -> Self {
        Self {
            protocol_version: ProtocolVersion::V5,
            clean_start: false,
            keep_alive: 0,
            client_id: String::new(),
            will: None,
            username: None,
            password: None,
            properties: Some(Properties::new()),
        }
    }
}

impl ConnectPacket {
    /// Creates a v5.0 CONNECT with a client identifier and clean start
    #[must_use]
    pub fn new(client_id: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            clean_start: true,
            ..Self::default()
        }
    }

    /// Switches the packet, including its will, to the layout of `version`
    #[must_use]
    pub fn with_version(mut self, version: ProtocolVersion) -> Self {
        self.protocol_version = version;
        self.properties = super::bag_for_version(version, self.properties.take());
        if let Some(will) = self.will.as_mut() {
            will.properties = super::bag_for_version(version, will.properties.take());
        }
        self
    }

    #[must_use]
    pub fn with_keep_alive(mut self, seconds: u16) -> Self {
        self.keep_alive = seconds;
        self
    }

    #[must_use]
    pub fn with_clean_start(mut self, clean_start: bool) -> Self {
        self.clean_start = clean_start;
        self
    }

    /// Sets the will; a 5.0 packet gives it an empty property bag if it has none
    #[must_use]
    pub fn with_will(mut self, mut will: WillMessage) -> Self {
        will.properties = super::bag_for_version(self.protocol_version, will.properties.take());
        self.will = Some(will);
        self
    }

    #[must_use]
    pub fn with_credentials(mut self, username: Option<String>, password: Option<Bytes>) -> Self {
        self.username = username;
        self.password = password;
        self
    }

    /// The flags byte for the current fields
    #[must_use]
    pub fn flag_set(&self) -> ConnectFlagSet {
        ConnectFlagSet {
            username: self.username.is_some(),
            password: self.password.is_some(),
            will_retain: self.will.as_ref().is_some_and(|w| w.retain),
            will_qos: self.will.as_ref().map_or(QoS::AtMostOnce, |w| w.qos),
            will: self.will.is_some(),
            clean_start: self.clean_start,
        }
    }

    fn encode_will(&self, will: &WillMessage, buf: &mut BytesMut) -> Result<()> {
        if self.protocol_version.has_properties() {
            let properties = will.properties.clone().unwrap_or_default();
            properties.validate_for(PropertyContext::Will)?;
            properties.encode(buf)?;
        }
        encode_string(buf, &will.topic)?;
        encode_binary(buf, &will.payload)
    }
}

impl MqttPacket for ConnectPacket {
    fn packet_type(&self) -> PacketType {
        PacketType::Connect
    }

    fn decode_body(&mut self, buf: &mut Bytes, fixed_header: &FixedHeader) -> Result<()> {
        tracing::trace!(
            fixed_header_remaining = fixed_header.remaining_length,
            buf_remaining = buf.remaining(),
            "CONNECT decode started"
        );

        let protocol_name = decode_string(buf)?;
        let version = ProtocolVersion::try_from(decode_u8(buf, "protocol version")?)?;
        if protocol_name != version.protocol_name() {
            return Err(MqttError::ProtocolError(format!(
                "Protocol name {protocol_name:?} does not match protocol version {version}"
            )));
        }

        let flags = ConnectFlagSet::unpack(decode_u8(buf, "connect flags")?)?;
        let keep_alive = decode_u16(buf, "keep alive")?;

        let properties = if version.has_properties() {
            Some(Properties::decode(buf, PacketType::Connect.into())?)
        } else {
            None
        };

        let client_id = decode_string(buf)?;

        let will = if flags.will {
            let will_properties = if version.has_properties() {
                Some(Properties::decode(buf, PropertyContext::Will)?)
            } else {
                None
            };
            let topic = decode_string(buf)?;
            let payload = decode_binary(buf)?;
            Some(WillMessage {
                topic,
                payload,
                qos: flags.will_qos,
                retain: flags.will_retain,
                properties: will_properties,
            })
        } else {
            None
        };

        let username = if flags.username {
            Some(decode_string(buf)?)
        } else {
            None
        };

        let password = if flags.password {
            Some(decode_binary(buf)?)
        } else {
            None
        };

        *self = Self {
            protocol_version: version,
            clean_start: flags.clean_start,
            keep_alive,
            client_id,
            will,
            username,
            password,
            properties,
        };
        Ok(())
    }

    fn segments(&self) -> Result<Vec<Bytes>> {
        let version = self.protocol_version;

        let mut header = BytesMut::with_capacity(10);
        encode_string(&mut header, version.protocol_name())?;
        header.put_u8(version.level());
        header.put_u8(self.flag_set().pack());
        header.put_u16(self.keep_alive);
        let mut segments = vec![header.freeze()];

        if version.has_properties() {
            let properties = self.properties.clone().unwrap_or_default();
            properties.validate_for(PacketType::Connect.into())?;
            segments.push(properties.to_segment()?);
        }

        let mut payload = BytesMut::new();
        encode_string(&mut payload, &self.client_id)?;
        if let Some(will) = &self.will {
            self.encode_will(will, &mut payload)?;
        }
        if let Some(username) = &self.username {
            encode_string(&mut payload, username)?;
        }
        if let Some(password) = &self.password {
            encode_binary(&mut payload, password)?;
        }
        segments.push(payload.freeze());

        Ok(segments)
    }
}
