use crate::constants::subscription::{
    NO_LOCAL_MASK, RETAIN_AS_PUBLISHED_MASK, RETAIN_HANDLING_SHIFT, V3_RESERVED_BITS_MASK,
};
use crate::encoding::{decode_string, decode_u16, decode_u8, encode_string};
use crate::error::{MqttError, Result};
use crate::packet::{
    bag_for_version, decode_properties, push_properties, FixedHeader, MqttPacket, PacketType,
};
use crate::protocol::v5::properties::{Properties, PropertyId};
use crate::protocol::ProtocolVersion;
use crate::QoS;
use bebytes::BeBytes;
use bytes::{Buf, BufMut, Bytes, BytesMut};

/// Retain handling options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum RetainHandling {
    /// Send retained messages at subscribe time
    #[default]
    SendAtSubscribe = 0,
    /// Send retained messages at subscribe time only if subscription doesn't exist
    SendAtSubscribeIfNew = 1,
    /// Don't send retained messages at subscribe time
    DoNotSend = 2,
}

impl TryFrom<u8> for RetainHandling {
    type Error = MqttError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(Self::SendAtSubscribe),
            1 => Ok(Self::SendAtSubscribeIfNew),
            2 => Ok(Self::DoNotSend),
            _ => Err(MqttError::ProtocolError(format!(
                "Invalid retain handling value: {value}"
            ))),
        }
    }
}

/// Subscription options
///
/// Only `qos` exists before 5.0; the other fields must stay at their defaults
/// for 3.1 and 3.1.1 packets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionOptions {
    /// Maximum `QoS` level the client will accept
    pub qos: QoS,
    /// Messages published by this connection are not sent back to it
    pub no_local: bool,
    /// Keep the RETAIN flag as published when forwarding
    pub retain_as_published: bool,
    pub retain_handling: RetainHandling,
}

impl Default for SubscriptionOptions {
    fn default() -> Self {
        Self {
            qos: QoS::AtMostOnce,
            no_local: false,
            retain_as_published: false,
            retain_handling: RetainHandling::SendAtSubscribe,
        }
    }
}

/// The options byte as bit fields, most significant first
#[derive(Debug, Clone, Copy, PartialEq, Eq, BeBytes)]
pub struct SubscriptionOptionsBits {
    /// Reserved bits (bits 7-6) - must be 0
    #[bits(2)]
    pub reserved_bits: u8,
    /// Retain Handling (bits 5-4)
    #[bits(2)]
    pub retain_handling: u8,
    /// Retain As Published flag (bit 3)
    #[bits(1)]
    pub retain_as_published: u8,
    /// No Local flag (bit 2)
    #[bits(1)]
    pub no_local: u8,
    /// QoS level (bits 1-0)
    #[bits(2)]
    pub qos: u8,
}

impl SubscriptionOptionsBits {
    /// Validates the fields and converts them to `SubscriptionOptions`
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError` if reserved bits are set, or `QoS` or retain
    /// handling is 3
    pub fn to_options(&self) -> Result<SubscriptionOptions> {
        if self.reserved_bits != 0 {
            return Err(MqttError::ProtocolError(
                "Reserved bits in subscription options must be 0".to_string(),
            ));
        }

        Ok(SubscriptionOptions {
            qos: QoS::try_from(self.qos)?,
            no_local: self.no_local != 0,
            retain_as_published: self.retain_as_published != 0,
            retain_handling: RetainHandling::try_from(self.retain_handling)?,
        })
    }
}

impl SubscriptionOptions {
    /// Creates subscription options with the specified `QoS`
    #[must_use]
    pub fn new(qos: QoS) -> Self {
        Self {
            qos,
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_no_local(mut self, no_local: bool) -> Self {
        self.no_local = no_local;
        self
    }

    #[must_use]
    pub fn with_retain_as_published(mut self, retain_as_published: bool) -> Self {
        self.retain_as_published = retain_as_published;
        self
    }

    #[must_use]
    pub fn with_retain_handling(mut self, retain_handling: RetainHandling) -> Self {
        self.retain_handling = retain_handling;
        self
    }

    /// Packs the options into the wire byte
    #[must_use]
    pub fn encode(&self) -> u8 {
        let mut byte = u8::from(self.qos);

        if self.no_local {
            byte |= NO_LOCAL_MASK;
        }

        if self.retain_as_published {
            byte |= RETAIN_AS_PUBLISHED_MASK;
        }

        byte |= (self.retain_handling as u8) << RETAIN_HANDLING_SHIFT;

        byte
    }

    /// Unpacks the wire byte for the given protocol version
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError` if reserved bits are set or a field holds 3.
    /// Before 5.0 every bit above the `QoS` is reserved.
    pub fn decode(byte: u8, version: ProtocolVersion) -> Result<Self> {
        if !version.has_properties() && byte & V3_RESERVED_BITS_MASK != 0 {
            return Err(MqttError::ProtocolError(format!(
                "Subscription options 0x{byte:02X} set bits reserved before MQTT 5.0"
            )));
        }

        let (bits, _consumed) =
            SubscriptionOptionsBits::try_from_be_bytes(&[byte]).map_err(|e| {
                MqttError::MalformedPacket(format!("Invalid subscription options byte: {e}"))
            })?;

        bits.to_options()
    }
}

/// Topic filter with subscription options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
    pub topic_filter: String,
    pub options: SubscriptionOptions,
}

impl Subscription {
    #[must_use]
    pub fn new(topic_filter: impl Into<String>, qos: QoS) -> Self {
        Self {
            topic_filter: topic_filter.into(),
            options: SubscriptionOptions::new(qos),
        }
    }

    #[must_use]
    pub fn with_options(topic_filter: impl Into<String>, options: SubscriptionOptions) -> Self {
        Self {
            topic_filter: topic_filter.into(),
            options,
        }
    }
}

/// MQTT SUBSCRIBE packet
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubscribePacket {
    pub packet_id: u16,
    pub subscriptions: Vec<Subscription>,
    /// SUBSCRIBE properties (v5.0 only)
    pub properties: Option<Properties>,
}

impl SubscribePacket {
    /// Creates a new v5.0 SUBSCRIBE packet with no subscriptions
    #[must_use]
    pub fn new(packet_id: u16) -> Self {
        Self {
            packet_id,
            subscriptions: Vec::new(),
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
    pub fn add_filter(mut self, topic_filter: impl Into<String>, qos: QoS) -> Self {
        self.subscriptions.push(Subscription::new(topic_filter, qos));
        self
    }

    #[must_use]
    pub fn add_subscription(mut self, subscription: Subscription) -> Self {
        self.subscriptions.push(subscription);
        self
    }

    /// Sets the subscription identifier
    #[must_use]
    pub fn with_subscription_identifier(mut self, id: u32) -> Self {
        let properties = self.properties.get_or_insert_with(Properties::new);
        properties.remove(PropertyId::SubscriptionIdentifier);
        properties.add_subscription_identifier(id);
        self
    }

    #[must_use]
    pub fn with_user_property(mut self, key: String, value: String) -> Self {
        self.properties
            .get_or_insert_with(Properties::new)
            .add_user_property(key, value);
        self
    }

    fn version(&self) -> ProtocolVersion {
        if self.properties.is_some() {
            ProtocolVersion::V5
        } else {
            ProtocolVersion::V311
        }
    }
}

impl MqttPacket for SubscribePacket {
    fn packet_type(&self) -> PacketType {
        PacketType::Subscribe
    }

    fn decode_body(&mut self, buf: &mut Bytes, fixed_header: &FixedHeader) -> Result<()> {
        tracing::trace!(
            fixed_header_remaining = fixed_header.remaining_length,
            buf_remaining = buf.remaining(),
            "SUBSCRIBE decode started"
        );

        let version = self.version();
        self.packet_id = decode_u16(buf, "packet identifier")?;
        decode_properties(buf, &mut self.properties, PacketType::Subscribe.into())?;

        let mut subscriptions = Vec::new();
        while buf.has_remaining() {
            let topic_filter = decode_string(buf)?;
            let options_byte = decode_u8(buf, "subscription options")?;
            let options = SubscriptionOptions::decode(options_byte, version)?;
            subscriptions.push(Subscription {
                topic_filter,
                options,
            });
        }

        if subscriptions.is_empty() {
            return Err(MqttError::ProtocolError(
                "SUBSCRIBE packet must contain at least one topic filter".to_string(),
            ));
        }

        self.subscriptions = subscriptions;
        Ok(())
    }

    fn segments(&self) -> Result<Vec<Bytes>> {
        if self.subscriptions.is_empty() {
            return Err(MqttError::ProtocolError(
                "SUBSCRIBE packet must contain at least one topic filter".to_string(),
            ));
        }

        let mut segments = vec![Bytes::copy_from_slice(&self.packet_id.to_be_bytes())];
        push_properties(
            &mut segments,
            self.properties.as_ref(),
            PacketType::Subscribe.into(),
        )?;

        let version = self.version();
        let mut payload = BytesMut::new();
        for subscription in &self.subscriptions {
            let options = subscription.options.encode();
            if !version.has_properties() && options & V3_RESERVED_BITS_MASK != 0 {
                return Err(MqttError::ProtocolError(format!(
                    "Subscription options for {:?} need MQTT 5.0",
                    subscription.topic_filter
                )));
            }
            encode_string(&mut payload, &subscription.topic_filter)?;
            payload.put_u8(options);
        }
        segments.push(payload.freeze());

        Ok(segments)
    }
}
