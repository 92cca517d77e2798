//! MQTT v5.0 properties
//!
//! A property block is a Variable Byte Integer length followed by
//! (identifier, value) pairs. Which identifiers may appear, and whether they
//! may repeat, depends on the packet carrying the block.

use crate::encoding::{
    binary_len, decode_binary, decode_string, decode_u16, decode_u32, decode_u8,
    decode_variable_int, encode_binary, encode_string, encode_variable_int, string_len,
    variable_int_len,
};
use crate::error::{MqttError, Result};
use crate::packet::PacketType;
use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::collections::BTreeMap;
use std::fmt;

/// Where a property block appears
///
/// Will properties travel inside CONNECT but follow their own allow-list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyContext {
    Packet(PacketType),
    Will,
}

impl PropertyContext {
    /// Returns true if a property block can appear in this context at all
    #[must_use]
    pub fn carries_properties(self) -> bool {
        match self {
            Self::Packet(packet_type) => {
                !matches!(packet_type, PacketType::PingReq | PacketType::PingResp)
            }
            Self::Will => true,
        }
    }
}

impl From<PacketType> for PropertyContext {
    fn from(packet_type: PacketType) -> Self {
        Self::Packet(packet_type)
    }
}

impl fmt::Display for PropertyContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Packet(packet_type) => write!(f, "{packet_type}"),
            Self::Will => f.write_str("Will"),
        }
    }
}

/// MQTT v5.0 Property Identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PropertyId {
    // Byte properties
    PayloadFormatIndicator = 0x01,
    RequestProblemInformation = 0x17,
    RequestResponseInformation = 0x19,
    MaximumQoS = 0x24,
    RetainAvailable = 0x25,
    WildcardSubscriptionAvailable = 0x28,
    SubscriptionIdentifierAvailable = 0x29,
    SharedSubscriptionAvailable = 0x2A,

    // Two Byte Integer properties
    ServerKeepAlive = 0x13,
    ReceiveMaximum = 0x21,
    TopicAliasMaximum = 0x22,
    TopicAlias = 0x23,

    // Four Byte Integer properties
    MessageExpiryInterval = 0x02,
    SessionExpiryInterval = 0x11,
    WillDelayInterval = 0x18,
    MaximumPacketSize = 0x27,

    // Variable Byte Integer properties
    SubscriptionIdentifier = 0x0B,

    // UTF-8 Encoded String properties
    ContentType = 0x03,
    ResponseTopic = 0x08,
    AssignedClientIdentifier = 0x12,
    AuthenticationMethod = 0x15,
    ResponseInformation = 0x1A,
    ServerReference = 0x1C,
    ReasonString = 0x1F,

    // Binary Data properties
    CorrelationData = 0x09,
    AuthenticationData = 0x16,

    // UTF-8 String Pair properties
    UserProperty = 0x26,
}

impl PropertyId {
    /// Converts a u8 to `PropertyId`
    #[must_use]
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x01 => Some(Self::PayloadFormatIndicator),
            0x02 => Some(Self::MessageExpiryInterval),
            0x03 => Some(Self::ContentType),
            0x08 => Some(Self::ResponseTopic),
            0x09 => Some(Self::CorrelationData),
            0x0B => Some(Self::SubscriptionIdentifier),
            0x11 => Some(Self::SessionExpiryInterval),
            0x12 => Some(Self::AssignedClientIdentifier),
            0x13 => Some(Self::ServerKeepAlive),
            0x15 => Some(Self::AuthenticationMethod),
            0x16 => Some(Self::AuthenticationData),
            0x17 => Some(Self::RequestProblemInformation),
            0x18 => Some(Self::WillDelayInterval),
            0x19 => Some(Self::RequestResponseInformation),
            0x1A => Some(Self::ResponseInformation),
            0x1C => Some(Self::ServerReference),
            0x1F => Some(Self::ReasonString),
            0x21 => Some(Self::ReceiveMaximum),
            0x22 => Some(Self::TopicAliasMaximum),
            0x23 => Some(Self::TopicAlias),
            0x24 => Some(Self::MaximumQoS),
            0x25 => Some(Self::RetainAvailable),
            0x26 => Some(Self::UserProperty),
            0x27 => Some(Self::MaximumPacketSize),
            0x28 => Some(Self::WildcardSubscriptionAvailable),
            0x29 => Some(Self::SubscriptionIdentifierAvailable),
            0x2A => Some(Self::SharedSubscriptionAvailable),
            _ => None,
        }
    }

    /// Returns true if this property may appear in the given context
    #[must_use]
    pub fn allowed_in(self, context: PropertyContext) -> bool {
        use PacketType as P;
        use PropertyContext::{Packet, Will};

        match self {
            Self::PayloadFormatIndicator
            | Self::MessageExpiryInterval
            | Self::ContentType
            | Self::ResponseTopic
            | Self::CorrelationData => matches!(context, Packet(P::Publish) | Will),

            Self::SubscriptionIdentifier => matches!(context, Packet(P::Publish | P::Subscribe)),

            Self::SessionExpiryInterval => {
                matches!(context, Packet(P::Connect | P::ConnAck | P::Disconnect))
            }

            Self::AuthenticationMethod | Self::AuthenticationData => {
                matches!(context, Packet(P::Connect | P::ConnAck | P::Auth))
            }

            Self::RequestProblemInformation | Self::RequestResponseInformation => {
                context == Packet(P::Connect)
            }

            Self::ReceiveMaximum | Self::TopicAliasMaximum | Self::MaximumPacketSize => {
                matches!(context, Packet(P::Connect | P::ConnAck))
            }

            Self::AssignedClientIdentifier
            | Self::ServerKeepAlive
            | Self::ResponseInformation
            | Self::MaximumQoS
            | Self::RetainAvailable
            | Self::WildcardSubscriptionAvailable
            | Self::SubscriptionIdentifierAvailable
            | Self::SharedSubscriptionAvailable => context == Packet(P::ConnAck),

            Self::ServerReference => matches!(context, Packet(P::ConnAck | P::Disconnect)),

            Self::ReasonString => matches!(
                context,
                Packet(
                    P::ConnAck
                        | P::PubAck
                        | P::PubRec
                        | P::PubRel
                        | P::PubComp
                        | P::SubAck
                        | P::UnsubAck
                        | P::Disconnect
                        | P::Auth
                )
            ),

            Self::WillDelayInterval => context == Will,

            Self::TopicAlias => context == Packet(P::Publish),

            Self::UserProperty => context.carries_properties(),
        }
    }

    /// Returns true if this property may repeat within the given context
    ///
    /// User Property repeats everywhere. Subscription Identifier repeats only
    /// in PUBLISH, where a message can match several subscriptions.
    #[must_use]
    pub fn allows_multiple_in(self, context: PropertyContext) -> bool {
        match self {
            Self::UserProperty => true,
            Self::SubscriptionIdentifier => context == PropertyContext::Packet(PacketType::Publish),
            _ => false,
        }
    }

    /// Returns true if this property can repeat in at least one context
    #[must_use]
    pub fn allows_multiple(self) -> bool {
        matches!(self, Self::UserProperty | Self::SubscriptionIdentifier)
    }

    /// Gets the expected value type for this property
    #[must_use]
    pub fn value_type(&self) -> PropertyValueType {
        match self {
            Self::PayloadFormatIndicator
            | Self::RequestProblemInformation
            | Self::RequestResponseInformation
            | Self::MaximumQoS
            | Self::RetainAvailable
            | Self::WildcardSubscriptionAvailable
            | Self::SubscriptionIdentifierAvailable
            | Self::SharedSubscriptionAvailable => PropertyValueType::Byte,

            Self::ServerKeepAlive
            | Self::ReceiveMaximum
            | Self::TopicAliasMaximum
            | Self::TopicAlias => PropertyValueType::TwoByteInteger,

            Self::MessageExpiryInterval
            | Self::SessionExpiryInterval
            | Self::WillDelayInterval
            | Self::MaximumPacketSize => PropertyValueType::FourByteInteger,

            Self::SubscriptionIdentifier => PropertyValueType::VariableByteInteger,

            Self::ContentType
            | Self::ResponseTopic
            | Self::AssignedClientIdentifier
            | Self::AuthenticationMethod
            | Self::ResponseInformation
            | Self::ServerReference
            | Self::ReasonString => PropertyValueType::Utf8String,

            Self::CorrelationData | Self::AuthenticationData => PropertyValueType::BinaryData,

            Self::UserProperty => PropertyValueType::Utf8StringPair,
        }
    }
}

/// Property value types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyValueType {
    Byte,
    TwoByteInteger,
    FourByteInteger,
    VariableByteInteger,
    BinaryData,
    Utf8String,
    Utf8StringPair,
}

/// Property value storage
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyValue {
    Byte(u8),
    TwoByteInteger(u16),
    FourByteInteger(u32),
    VariableByteInteger(u32),
    BinaryData(Bytes),
    Utf8String(String),
    Utf8StringPair(String, String),
}

impl PropertyValue {
    /// Gets the value type
    #[must_use]
    pub fn value_type(&self) -> PropertyValueType {
        match self {
            Self::Byte(_) => PropertyValueType::Byte,
            Self::TwoByteInteger(_) => PropertyValueType::TwoByteInteger,
            Self::FourByteInteger(_) => PropertyValueType::FourByteInteger,
            Self::VariableByteInteger(_) => PropertyValueType::VariableByteInteger,
            Self::BinaryData(_) => PropertyValueType::BinaryData,
            Self::Utf8String(_) => PropertyValueType::Utf8String,
            Self::Utf8StringPair(_, _) => PropertyValueType::Utf8StringPair,
        }
    }

    /// Validates that this value matches the expected type for a property
    #[must_use]
    pub fn matches_type(&self, expected: PropertyValueType) -> bool {
        self.value_type() == expected
    }
}

/// Container for MQTT v5.0 properties
///
/// Values are kept per identifier in insertion order and encoded in ascending
/// identifier order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Properties {
    properties: BTreeMap<PropertyId, Vec<PropertyValue>>,
}

impl Properties {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a property value
    ///
    /// Repeats are accepted for identifiers that can repeat in some context;
    /// `validate_for` checks them against a specific packet.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError` if the value type doesn't match the property,
    /// or the property can never repeat and is already present
    pub fn add(&mut self, id: PropertyId, value: PropertyValue) -> Result<()> {
        if !value.matches_type(id.value_type()) {
            return Err(MqttError::ProtocolError(format!(
                "Property {id:?} expects type {:?}, got {:?}",
                id.value_type(),
                value.value_type()
            )));
        }

        if !id.allows_multiple() && self.properties.contains_key(&id) {
            return Err(MqttError::ProtocolError(format!(
                "Duplicate property {id:?}"
            )));
        }

        self.properties.entry(id).or_default().push(value);
        Ok(())
    }

    /// Gets the first value of a property
    #[must_use]
    pub fn get(&self, id: PropertyId) -> Option<&PropertyValue> {
        self.properties.get(&id).and_then(|v| v.first())
    }

    /// Gets all values of a property in insertion order
    #[must_use]
    pub fn get_all(&self, id: PropertyId) -> Option<&[PropertyValue]> {
        self.properties.get(&id).map(Vec::as_slice)
    }

    #[must_use]
    pub fn contains(&self, id: PropertyId) -> bool {
        self.properties.contains_key(&id)
    }

    /// Removes a property and returns its values
    pub fn remove(&mut self, id: PropertyId) -> Option<Vec<PropertyValue>> {
        self.properties.remove(&id)
    }

    /// Returns the number of distinct property identifiers
    #[must_use]
    pub fn len(&self) -> usize {
        self.properties.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    /// Iterates over every (identifier, value) pair in wire order
    pub fn iter(&self) -> impl Iterator<Item = (PropertyId, &PropertyValue)> + '_ {
        self.properties
            .iter()
            .flat_map(|(id, values)| values.iter().map(move |value| (*id, value)))
    }

    /// Checks every property against the allow-list of `context`
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError` if a property is not allowed in `context` or
    /// repeats where it may not
    pub fn validate_for(&self, context: PropertyContext) -> Result<()> {
        for (id, values) in &self.properties {
            if !id.allowed_in(context) {
                return Err(MqttError::ProtocolError(format!(
                    "Property {id:?} is not allowed in {context}"
                )));
            }
            if values.len() > 1 && !id.allows_multiple_in(context) {
                return Err(MqttError::ProtocolError(format!(
                    "Property {id:?} may appear only once in {context}"
                )));
            }
        }
        Ok(())
    }

    /// Encodes the length-prefixed property block
    ///
    /// An empty container encodes as the single byte `0x00`.
    ///
    /// # Errors
    ///
    /// Returns an error if a string or binary value is too long, or the block
    /// exceeds the Variable Byte Integer range
    pub fn encode<B: BufMut>(&self, buf: &mut B) -> Result<()> {
        let body_len = u32::try_from(self.body_len()).map_err(|_| {
            MqttError::MalformedLength("property block too large".to_string())
        })?;
        encode_variable_int(buf, body_len)?;
        self.encode_body(buf)
    }

    /// Encodes the length-prefixed property block as one segment
    ///
    /// # Errors
    ///
    /// Same as [`Properties::encode`]
    pub fn to_segment(&self) -> Result<Bytes> {
        let mut buf = BytesMut::with_capacity(self.encoded_len());
        self.encode(&mut buf)?;
        Ok(buf.freeze())
    }

    fn encode_body<B: BufMut>(&self, buf: &mut B) -> Result<()> {
        for (id, value) in self.iter() {
            encode_variable_int(buf, u32::from(id as u8))?;

            match value {
                PropertyValue::Byte(v) => buf.put_u8(*v),
                PropertyValue::TwoByteInteger(v) => buf.put_u16(*v),
                PropertyValue::FourByteInteger(v) => buf.put_u32(*v),
                PropertyValue::VariableByteInteger(v) => encode_variable_int(buf, *v)?,
                PropertyValue::BinaryData(v) => encode_binary(buf, v)?,
                PropertyValue::Utf8String(v) => encode_string(buf, v)?,
                PropertyValue::Utf8StringPair(k, v) => {
                    encode_string(buf, k)?;
                    encode_string(buf, v)?;
                }
            }
        }
        Ok(())
    }

    /// Decodes a length-prefixed property block for `context`
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError` if an identifier is not allowed in `context`
    /// or repeats where it may not. Returns `MalformedPacket` if an
    /// identifier is unknown or the block is truncated.
    pub fn decode<B: Buf>(buf: &mut B, context: PropertyContext) -> Result<Self> {
        let props_len = decode_variable_int(buf)? as usize;

        if buf.remaining() < props_len {
            return Err(MqttError::MalformedPacket(format!(
                "Insufficient data for properties: expected {props_len}, got {}",
                buf.remaining()
            )));
        }

        let mut props_buf = buf.copy_to_bytes(props_len);
        let mut properties = Self::new();

        while props_buf.has_remaining() {
            let id_val = decode_variable_int(&mut props_buf)?;
            let id = u8::try_from(id_val)
                .ok()
                .and_then(PropertyId::from_u8)
                .ok_or_else(|| {
                    MqttError::MalformedPacket(format!("Unknown property identifier 0x{id_val:02X}"))
                })?;

            if !id.allowed_in(context) {
                return Err(MqttError::ProtocolError(format!(
                    "Property {id:?} is not allowed in {context}"
                )));
            }
            if properties.contains(id) && !id.allows_multiple_in(context) {
                return Err(MqttError::ProtocolError(format!(
                    "Property {id:?} may appear only once in {context}"
                )));
            }

            let value = Self::decode_value(&mut props_buf, id)?;
            properties.properties.entry(id).or_default().push(value);
        }

        Ok(properties)
    }

    fn decode_value(buf: &mut Bytes, id: PropertyId) -> Result<PropertyValue> {
        let value = match id.value_type() {
            PropertyValueType::Byte => PropertyValue::Byte(decode_u8(buf, "byte property")?),
            PropertyValueType::TwoByteInteger => {
                PropertyValue::TwoByteInteger(decode_u16(buf, "two-byte integer property")?)
            }
            PropertyValueType::FourByteInteger => {
                PropertyValue::FourByteInteger(decode_u32(buf, "four-byte integer property")?)
            }
            PropertyValueType::VariableByteInteger => {
                PropertyValue::VariableByteInteger(decode_variable_int(buf)?)
            }
            PropertyValueType::BinaryData => PropertyValue::BinaryData(decode_binary(buf)?),
            PropertyValueType::Utf8String => PropertyValue::Utf8String(decode_string(buf)?),
            PropertyValueType::Utf8StringPair => {
                let key = decode_string(buf)?;
                let value = decode_string(buf)?;
                PropertyValue::Utf8StringPair(key, value)
            }
        };
        Ok(value)
    }

    /// Encoded length including the length prefix
    #[must_use]
    pub fn encoded_len(&self) -> usize {
        let body_len = self.body_len();
        variable_int_len(u32::try_from(body_len).unwrap_or(u32::MAX)) + body_len
    }

    fn body_len(&self) -> usize {
        self.iter()
            .map(|(id, value)| {
                variable_int_len(u32::from(id as u8))
                    + match value {
                        PropertyValue::Byte(_) => 1,
                        PropertyValue::TwoByteInteger(_) => 2,
                        PropertyValue::FourByteInteger(_) => 4,
                        PropertyValue::VariableByteInteger(v) => variable_int_len(*v),
                        PropertyValue::BinaryData(v) => binary_len(v),
                        PropertyValue::Utf8String(v) => string_len(v),
                        PropertyValue::Utf8StringPair(k, v) => string_len(k) + string_len(v),
                    }
            })
            .sum()
    }

    fn set(&mut self, id: PropertyId, value: PropertyValue) {
        self.properties.insert(id, vec![value]);
    }

    fn get_string(&self, id: PropertyId) -> Option<&str> {
        match self.get(id) {
            Some(PropertyValue::Utf8String(s)) => Some(s),
            _ => None,
        }
    }

    fn get_u32(&self, id: PropertyId) -> Option<u32> {
        match self.get(id) {
            Some(PropertyValue::FourByteInteger(v) | PropertyValue::VariableByteInteger(v)) => {
                Some(*v)
            }
            _ => None,
        }
    }

    // Setters replace any existing value of single-valued properties

    /// Sets the payload format indicator (0 = unspecified bytes, 1 = UTF-8)
    pub fn set_payload_format_indicator(&mut self, is_utf8: bool) {
        self.set(
            PropertyId::PayloadFormatIndicator,
            PropertyValue::Byte(u8::from(is_utf8)),
        );
    }

    pub fn set_message_expiry_interval(&mut self, seconds: u32) {
        self.set(
            PropertyId::MessageExpiryInterval,
            PropertyValue::FourByteInteger(seconds),
        );
    }

    pub fn set_content_type(&mut self, content_type: String) {
        self.set(PropertyId::ContentType, PropertyValue::Utf8String(content_type));
    }

    pub fn set_response_topic(&mut self, topic: String) {
        self.set(PropertyId::ResponseTopic, PropertyValue::Utf8String(topic));
    }

    pub fn set_correlation_data(&mut self, data: Bytes) {
        self.set(PropertyId::CorrelationData, PropertyValue::BinaryData(data));
    }

    /// Appends a subscription identifier
    pub fn add_subscription_identifier(&mut self, id: u32) {
        self.properties
            .entry(PropertyId::SubscriptionIdentifier)
            .or_default()
            .push(PropertyValue::VariableByteInteger(id));
    }

    pub fn set_session_expiry_interval(&mut self, seconds: u32) {
        self.set(
            PropertyId::SessionExpiryInterval,
            PropertyValue::FourByteInteger(seconds),
        );
    }

    pub fn set_assigned_client_identifier(&mut self, id: String) {
        self.set(
            PropertyId::AssignedClientIdentifier,
            PropertyValue::Utf8String(id),
        );
    }

    pub fn set_server_keep_alive(&mut self, seconds: u16) {
        self.set(
            PropertyId::ServerKeepAlive,
            PropertyValue::TwoByteInteger(seconds),
        );
    }

    pub fn set_authentication_method(&mut self, method: String) {
        self.set(
            PropertyId::AuthenticationMethod,
            PropertyValue::Utf8String(method),
        );
    }

    pub fn set_authentication_data(&mut self, data: Bytes) {
        self.set(PropertyId::AuthenticationData, PropertyValue::BinaryData(data));
    }

    pub fn set_request_problem_information(&mut self, request: bool) {
        self.set(
            PropertyId::RequestProblemInformation,
            PropertyValue::Byte(u8::from(request)),
        );
    }

    pub fn set_will_delay_interval(&mut self, seconds: u32) {
        self.set(
            PropertyId::WillDelayInterval,
            PropertyValue::FourByteInteger(seconds),
        );
    }

    pub fn set_request_response_information(&mut self, request: bool) {
        self.set(
            PropertyId::RequestResponseInformation,
            PropertyValue::Byte(u8::from(request)),
        );
    }

    pub fn set_response_information(&mut self, info: String) {
        self.set(
            PropertyId::ResponseInformation,
            PropertyValue::Utf8String(info),
        );
    }

    pub fn set_server_reference(&mut self, reference: String) {
        self.set(
            PropertyId::ServerReference,
            PropertyValue::Utf8String(reference),
        );
    }

    pub fn set_reason_string(&mut self, reason: String) {
        self.set(PropertyId::ReasonString, PropertyValue::Utf8String(reason));
    }

    pub fn set_receive_maximum(&mut self, max: u16) {
        self.set(PropertyId::ReceiveMaximum, PropertyValue::TwoByteInteger(max));
    }

    pub fn set_topic_alias_maximum(&mut self, max: u16) {
        self.set(
            PropertyId::TopicAliasMaximum,
            PropertyValue::TwoByteInteger(max),
        );
    }

    pub fn set_topic_alias(&mut self, alias: u16) {
        self.set(PropertyId::TopicAlias, PropertyValue::TwoByteInteger(alias));
    }

    pub fn set_maximum_qos(&mut self, qos: u8) {
        self.set(PropertyId::MaximumQoS, PropertyValue::Byte(qos));
    }

    pub fn set_retain_available(&mut self, available: bool) {
        self.set(
            PropertyId::RetainAvailable,
            PropertyValue::Byte(u8::from(available)),
        );
    }

    /// Appends a user property; duplicates and order are preserved
    pub fn add_user_property(&mut self, key: String, value: String) {
        self.properties
            .entry(PropertyId::UserProperty)
            .or_default()
            .push(PropertyValue::Utf8StringPair(key, value));
    }

    pub fn set_maximum_packet_size(&mut self, size: u32) {
        self.set(
            PropertyId::MaximumPacketSize,
            PropertyValue::FourByteInteger(size),
        );
    }

    pub fn set_wildcard_subscription_available(&mut self, available: bool) {
        self.set(
            PropertyId::WildcardSubscriptionAvailable,
            PropertyValue::Byte(u8::from(available)),
        );
    }

    pub fn set_subscription_identifier_available(&mut self, available: bool) {
        self.set(
            PropertyId::SubscriptionIdentifierAvailable,
            PropertyValue::Byte(u8::from(available)),
        );
    }

    pub fn set_shared_subscription_available(&mut self, available: bool) {
        self.set(
            PropertyId::SharedSubscriptionAvailable,
            PropertyValue::Byte(u8::from(available)),
        );
    }

    #[must_use]
    pub fn reason_string(&self) -> Option<&str> {
        self.get_string(PropertyId::ReasonString)
    }

    #[must_use]
    pub fn authentication_method(&self) -> Option<&str> {
        self.get_string(PropertyId::AuthenticationMethod)
    }

    #[must_use]
    pub fn session_expiry_interval(&self) -> Option<u32> {
        self.get_u32(PropertyId::SessionExpiryInterval)
    }

    /// User properties in the order they were added or received
    pub fn user_properties(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.get_all(PropertyId::UserProperty)
            .unwrap_or_default()
            .iter()
            .filter_map(|value| match value {
                PropertyValue::Utf8StringPair(k, v) => Some((k.as_str(), v.as_str())),
                _ => None,
            })
    }

    /// Subscription identifiers in the order they were added or received
    pub fn subscription_identifiers(&self) -> impl Iterator<Item = u32> + '_ {
        self.get_all(PropertyId::SubscriptionIdentifier)
            .unwrap_or_default()
            .iter()
            .filter_map(|value| match value {
                PropertyValue::VariableByteInteger(v) => Some(*v),
                _ => None,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PUBLISH: PropertyContext = PropertyContext::Packet(PacketType::Publish);
    const CONNECT: PropertyContext = PropertyContext::Packet(PacketType::Connect);
    const PUBACK: PropertyContext = PropertyContext::Packet(PacketType::PubAck);

    #[test]
    fn test_property_id_from_u8() {
        assert_eq!(
            PropertyId::from_u8(0x01),
            Some(PropertyId::PayloadFormatIndicator)
        );
        assert_eq!(PropertyId::from_u8(0x26), Some(PropertyId::UserProperty));
        assert_eq!(PropertyId::from_u8(0xFF), None);
        assert_eq!(PropertyId::from_u8(0x00), None);
    }

    #[test]
    fn test_every_identifier_is_allowed_somewhere() {
        let contexts: Vec<PropertyContext> = (1..=15)
            .filter_map(PacketType::from_u8)
            .map(PropertyContext::from)
            .chain(std::iter::once(PropertyContext::Will))
            .collect();

        for byte in 0u8..=0x2A {
            if let Some(id) = PropertyId::from_u8(byte) {
                assert_eq!(id as u8, byte);
                assert!(
                    contexts.iter().any(|c| id.allowed_in(*c)),
                    "{id:?} has no legal context"
                );
            }
        }
    }

    #[test]
    fn test_allow_list_samples() {
        assert!(PropertyId::TopicAlias.allowed_in(PUBLISH));
        assert!(!PropertyId::TopicAlias.allowed_in(CONNECT));
        assert!(PropertyId::WillDelayInterval.allowed_in(PropertyContext::Will));
        assert!(!PropertyId::WillDelayInterval.allowed_in(CONNECT));
        assert!(PropertyId::ReasonString.allowed_in(PUBACK));
        assert!(!PropertyId::ReasonString.allowed_in(PUBLISH));
        assert!(PropertyId::UserProperty.allowed_in(PropertyContext::Will));
        assert!(!PropertyId::UserProperty.allowed_in(PacketType::PingReq.into()));
    }

    #[test]
    fn test_repeatable_per_context() {
        assert!(PropertyId::UserProperty.allows_multiple_in(CONNECT));
        assert!(PropertyId::SubscriptionIdentifier.allows_multiple_in(PUBLISH));
        assert!(!PropertyId::SubscriptionIdentifier
            .allows_multiple_in(PropertyContext::Packet(PacketType::Subscribe)));
        assert!(!PropertyId::ContentType.allows_multiple_in(PUBLISH));
    }

    #[test]
    fn test_properties_add_type_mismatch() {
        let mut props = Properties::new();
        let result = props.add(
            PropertyId::PayloadFormatIndicator,
            PropertyValue::FourByteInteger(100),
        );
        assert!(matches!(result, Err(MqttError::ProtocolError(_))));
    }

    #[test]
    fn test_properties_add_duplicate_single_value() {
        let mut props = Properties::new();
        props
            .add(PropertyId::PayloadFormatIndicator, PropertyValue::Byte(0))
            .unwrap();
        let result = props.add(PropertyId::PayloadFormatIndicator, PropertyValue::Byte(1));
        assert!(result.is_err());
    }

    #[test]
    fn test_empty_encodes_as_single_zero() {
        let props = Properties::new();
        let mut buf = BytesMut::new();
        props.encode(&mut buf).unwrap();
        assert_eq!(&buf[..], &[0x00]);
        assert_eq!(props.encoded_len(), 1);

        let decoded = Properties::decode(&mut buf, PUBLISH).unwrap();
        assert!(decoded.is_empty());
    }

    #[test]
    fn test_wire_layout_is_sorted_by_identifier() {
        let mut props = Properties::new();
        props.set_topic_alias(0x0102);
        props.set_payload_format_indicator(true);

        let segment = props.to_segment().unwrap();
        assert_eq!(
            &segment[..],
            &[0x05, 0x01, 0x01, 0x23, 0x01, 0x02],
        );
    }

    #[test]
    fn test_publish_round_trip_all_types() {
        let mut props = Properties::new();
        props.set_payload_format_indicator(true);
        props.set_message_expiry_interval(3600);
        props.set_content_type("text/plain".to_string());
        props.set_response_topic("reply/here".to_string());
        props.set_correlation_data(Bytes::from_static(&[1, 2, 3, 4]));
        props.set_topic_alias(100);
        props.add_subscription_identifier(10);
        props.add_subscription_identifier(268_435_455);
        props.add_user_property("key".to_string(), "value".to_string());

        let mut buf = BytesMut::new();
        props.encode(&mut buf).unwrap();
        assert_eq!(buf.len(), props.encoded_len());

        let decoded = Properties::decode(&mut buf, PUBLISH).unwrap();
        assert_eq!(decoded, props);
        assert_eq!(
            decoded.subscription_identifiers().collect::<Vec<_>>(),
            vec![10, 268_435_455]
        );
    }

    #[test]
    fn test_user_property_order_and_duplicates_preserved() {
        let mut props = Properties::new();
        props.add_user_property("b".to_string(), "2".to_string());
        props.add_user_property("a".to_string(), "1".to_string());
        props.add_user_property("b".to_string(), "2".to_string());

        let mut buf = BytesMut::new();
        props.encode(&mut buf).unwrap();
        let decoded = Properties::decode(&mut buf, PUBACK).unwrap();

        let pairs: Vec<_> = decoded.user_properties().collect();
        assert_eq!(pairs, vec![("b", "2"), ("a", "1"), ("b", "2")]);
    }

    #[test]
    fn test_decode_rejects_disallowed_identifier() {
        // Topic Alias (0x23) inside a PUBACK property block
        let mut buf = &[0x03u8, 0x23, 0x00, 0x05][..];
        let result = Properties::decode(&mut buf, PUBACK);
        assert!(matches!(result, Err(MqttError::ProtocolError(_))));

        // Will Delay Interval is only legal in will properties
        let bytes = [0x05u8, 0x18, 0x00, 0x00, 0x00, 0x0A];
        assert!(Properties::decode(&mut &bytes[..], CONNECT).is_err());
        assert!(Properties::decode(&mut &bytes[..], PropertyContext::Will).is_ok());
    }

    #[test]
    fn test_decode_rejects_duplicate_single_value() {
        // Two Reason Strings
        let mut buf = &[0x08u8, 0x1F, 0x00, 0x01, b'a', 0x1F, 0x00, 0x01, b'b'][..];
        let result = Properties::decode(&mut buf, PUBACK);
        assert!(matches!(result, Err(MqttError::ProtocolError(_))));

        // Two Subscription Identifiers are fine in PUBLISH but not in SUBSCRIBE
        let bytes = [0x04u8, 0x0B, 0x01, 0x0B, 0x02];
        assert!(Properties::decode(&mut &bytes[..], PUBLISH).is_ok());
        assert!(Properties::decode(
            &mut &bytes[..],
            PropertyContext::Packet(PacketType::Subscribe)
        )
        .is_err());
    }

    #[test]
    fn test_decode_unknown_identifier() {
        let mut buf = &[0x01u8, 0x7E][..];
        let result = Properties::decode(&mut buf, PUBLISH);
        assert!(matches!(result, Err(MqttError::MalformedPacket(_))));
    }

    #[test]
    fn test_decode_insufficient_data() {
        let mut buf = &[0x0Au8][..];
        assert!(matches!(
            Properties::decode(&mut buf, PUBLISH),
            Err(MqttError::MalformedPacket(_))
        ));

        // Block claims 2 bytes; the four-byte value inside is cut short
        let mut buf = &[0x02u8, 0x02, 0x00][..];
        assert!(matches!(
            Properties::decode(&mut buf, PUBLISH),
            Err(MqttError::MalformedPacket(_))
        ));
    }

    #[test]
    fn test_validate_for() {
        let mut props = Properties::new();
        props.set_reason_string("fine".to_string());
        assert!(props.validate_for(PUBACK).is_ok());
        assert!(props.validate_for(PUBLISH).is_err());

        let mut props = Properties::new();
        props.add_subscription_identifier(1);
        props.add_subscription_identifier(2);
        assert!(props.validate_for(PUBLISH).is_ok());
        assert!(props
            .validate_for(PropertyContext::Packet(PacketType::Subscribe))
            .is_err());
    }

    #[test]
    fn test_setters_replace() {
        let mut props = Properties::new();
        props.set_session_expiry_interval(10);
        props.set_session_expiry_interval(20);
        assert_eq!(props.session_expiry_interval(), Some(20));
        assert_eq!(props.get_all(PropertyId::SessionExpiryInterval).unwrap().len(), 1);
    }
}
