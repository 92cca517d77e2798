pub mod ack;
pub mod auth;
pub mod connack;
pub mod connect;
pub mod disconnect;
pub mod pingreq;
pub mod pingresp;
pub mod puback;
pub mod pubcomp;
pub mod publish;
pub mod pubrec;
pub mod pubrel;
pub mod suback;
pub mod subscribe;
pub mod unsuback;
pub mod unsubscribe;

#[cfg(test)]
mod property_tests;

use crate::constants::{flags, limits, masks};
use crate::encoding::{encode_variable_int, variable_int_len, VariableInt};
use crate::error::{MqttError, Result};
use crate::flags::PublishFlags;
use crate::protocol::v5::properties::{Properties, PropertyContext};
use crate::protocol::ProtocolVersion;
use crate::QoS;
use bebytes::BeBytes;
use bytes::{BufMut, Bytes, BytesMut};
use std::fmt;
use std::io::{self, IoSlice, Read, Write};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, BeBytes)]
pub enum PacketType {
    Connect = 1,
    ConnAck = 2,
    Publish = 3,
    PubAck = 4,
    PubRec = 5,
    PubRel = 6,
    PubComp = 7,
    Subscribe = 8,
    SubAck = 9,
    Unsubscribe = 10,
    UnsubAck = 11,
    PingReq = 12,
    PingResp = 13,
    Disconnect = 14,
    Auth = 15,
}

impl PacketType {
    /// Converts a u8 to `PacketType`
    #[must_use]
    pub fn from_u8(value: u8) -> Option<Self> {
        // Use the TryFrom implementation generated by BeBytes
        Self::try_from(value).ok()
    }

    /// Upper-case protocol name, e.g. "CONNECT"
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Connect => "CONNECT",
            Self::ConnAck => "CONNACK",
            Self::Publish => "PUBLISH",
            Self::PubAck => "PUBACK",
            Self::PubRec => "PUBREC",
            Self::PubRel => "PUBREL",
            Self::PubComp => "PUBCOMP",
            Self::Subscribe => "SUBSCRIBE",
            Self::SubAck => "SUBACK",
            Self::Unsubscribe => "UNSUBSCRIBE",
            Self::UnsubAck => "UNSUBACK",
            Self::PingReq => "PINGREQ",
            Self::PingResp => "PINGRESP",
            Self::Disconnect => "DISCONNECT",
            Self::Auth => "AUTH",
        }
    }

    /// Fixed header flags this packet type is sent with
    ///
    /// PUBLISH flags depend on the packet and are reported as 0 here.
    #[must_use]
    pub fn fixed_flags(self) -> u8 {
        match self {
            Self::PubRel => flags::PUBREL,
            Self::Subscribe => flags::SUBSCRIBE,
            Self::Unsubscribe => flags::UNSUBSCRIBE,
            Self::Auth => flags::AUTH,
            _ => 0,
        }
    }
}

impl From<PacketType> for u8 {
    fn from(packet_type: PacketType) -> Self {
        packet_type as u8
    }
}

impl fmt::Display for PacketType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// MQTT packet fixed header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedHeader {
    pub packet_type: PacketType,
    pub flags: u8,
    pub remaining_length: u32,
}

impl FixedHeader {
    /// Creates a new fixed header
    #[must_use]
    pub fn new(packet_type: PacketType, flags: u8, remaining_length: u32) -> Self {
        Self {
            packet_type,
            flags,
            remaining_length,
        }
    }

    /// Splits the first header byte into a packet type and validated flags
    ///
    /// # Errors
    ///
    /// Returns `UnknownPacketType` for type nibble 0, and `ProtocolError` if
    /// the flags are not legal for the type
    pub fn split_first_byte(byte: u8) -> Result<(PacketType, u8)> {
        let type_nibble = byte >> 4;
        let flags = byte & masks::FLAGS;

        let packet_type =
            PacketType::from_u8(type_nibble).ok_or(MqttError::UnknownPacketType(type_nibble))?;

        Self::new(packet_type, flags, 0).validate_flags()?;
        Ok((packet_type, flags))
    }

    /// Validates the flags for the packet type
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError` when the nibble is not legal for the type
    pub fn validate_flags(&self) -> Result<()> {
        let valid = match self.packet_type {
            PacketType::Publish => {
                PublishFlags::extract_qos(self.flags) != crate::constants::publish_flags::QOS_MASK
            }
            PacketType::PubRel | PacketType::Subscribe | PacketType::Unsubscribe => {
                self.flags == self.packet_type.fixed_flags()
            }
            PacketType::Auth => self.flags == 0 || self.flags == flags::AUTH,
            _ => self.flags == 0,
        };

        if valid {
            Ok(())
        } else {
            Err(MqttError::ProtocolError(format!(
                "Invalid fixed header flags 0b{:04b} for {}",
                self.flags, self.packet_type
            )))
        }
    }

    /// Encodes the fixed header
    ///
    /// # Errors
    ///
    /// Returns `MalformedLength` if the remaining length is too large
    pub fn encode<B: BufMut>(&self, buf: &mut B) -> Result<()> {
        let byte1 = (u8::from(self.packet_type) << 4) | (self.flags & masks::FLAGS);
        buf.put_u8(byte1);
        encode_variable_int(buf, self.remaining_length)?;
        Ok(())
    }

    /// Reads a fixed header from a blocking reader
    ///
    /// End of stream before the first byte is reported as `Io` with
    /// `UnexpectedEof`; inside the length it is `MalformedLength`.
    ///
    /// # Errors
    ///
    /// Returns an error if the type or flags are invalid or the remaining
    /// length is malformed
    pub fn read_from<R: Read>(reader: &mut R) -> Result<Self> {
        let mut first = [0u8; 1];
        reader.read_exact(&mut first)?;

        let (packet_type, flags) = Self::split_first_byte(first[0])?;
        let remaining_length = VariableInt::read_from(reader)?.value();

        Ok(Self::new(packet_type, flags, remaining_length))
    }

    /// Parses a fixed header from the front of an in-memory buffer
    ///
    /// Returns the header and the number of bytes it occupies. Nothing is
    /// consumed.
    ///
    /// # Errors
    ///
    /// Returns `TruncatedInput` if the buffer ends inside the header, and
    /// `MalformedLength` if the length would need a fifth byte
    pub fn parse(bytes: &[u8]) -> Result<(Self, usize)> {
        let Some(&first) = bytes.first() else {
            return Err(MqttError::TruncatedInput {
                needed: 2,
                available: 0,
            });
        };
        let (packet_type, flags) = Self::split_first_byte(first)?;

        let mut remaining_length = 0u32;
        for position in 0..limits::MAX_VARIABLE_INT_BYTES {
            let Some(&byte) = bytes.get(1 + position) else {
                return Err(MqttError::TruncatedInput {
                    needed: position + 2,
                    available: bytes.len(),
                });
            };
            remaining_length |= u32::from(byte & masks::VARIABLE_BYTE_VALUE) << (7 * position);
            if byte & masks::CONTINUATION_BIT == 0 {
                let header = Self::new(packet_type, flags, remaining_length);
                return Ok((header, position + 2));
            }
        }

        Err(MqttError::MalformedLength(
            "variable byte integer exceeds 4 bytes".to_string(),
        ))
    }

    /// Returns the encoded length of the fixed header
    #[must_use]
    pub fn encoded_len(&self) -> usize {
        1 + variable_int_len(self.remaining_length)
    }

    /// `QoS` carried in PUBLISH flags
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError` for `QoS` 3
    pub fn publish_qos(&self) -> Result<QoS> {
        QoS::try_from(PublishFlags::extract_qos(self.flags))
    }
}

/// Enum representing all MQTT packet types
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Packet {
    Connect(Box<connect::ConnectPacket>),
    ConnAck(connack::ConnAckPacket),
    Publish(publish::PublishPacket),
    PubAck(puback::PubAckPacket),
    PubRec(pubrec::PubRecPacket),
    PubRel(pubrel::PubRelPacket),
    PubComp(pubcomp::PubCompPacket),
    Subscribe(subscribe::SubscribePacket),
    SubAck(suback::SubAckPacket),
    Unsubscribe(unsubscribe::UnsubscribePacket),
    UnsubAck(unsuback::UnsubAckPacket),
    PingReq(pingreq::PingReqPacket),
    PingResp(pingresp::PingRespPacket),
    Disconnect(disconnect::DisconnectPacket),
    Auth(auth::AuthPacket),
}

impl Packet {
    /// Zero-valued packet of the given type
    ///
    /// The property bag is present and empty iff `version` is 5.0. CONNECT
    /// carries `version` as its protocol level.
    #[must_use]
    pub fn new(packet_type: PacketType, version: ProtocolVersion) -> Self {
        match packet_type {
            PacketType::Connect => Self::Connect(Box::new(
                connect::ConnectPacket::default().with_version(version),
            )),
            PacketType::ConnAck => {
                Self::ConnAck(connack::ConnAckPacket::default().with_version(version))
            }
            PacketType::Publish => {
                Self::Publish(publish::PublishPacket::default().with_version(version))
            }
            PacketType::PubAck => Self::PubAck(puback::PubAckPacket::default().with_version(version)),
            PacketType::PubRec => Self::PubRec(pubrec::PubRecPacket::default().with_version(version)),
            PacketType::PubRel => Self::PubRel(pubrel::PubRelPacket::default().with_version(version)),
            PacketType::PubComp => {
                Self::PubComp(pubcomp::PubCompPacket::default().with_version(version))
            }
            PacketType::Subscribe => {
                Self::Subscribe(subscribe::SubscribePacket::default().with_version(version))
            }
            PacketType::SubAck => Self::SubAck(suback::SubAckPacket::default().with_version(version)),
            PacketType::Unsubscribe => {
                Self::Unsubscribe(unsubscribe::UnsubscribePacket::default().with_version(version))
            }
            PacketType::UnsubAck => {
                Self::UnsubAck(unsuback::UnsubAckPacket::default().with_version(version))
            }
            PacketType::PingReq => Self::PingReq(pingreq::PingReqPacket),
            PacketType::PingResp => Self::PingResp(pingresp::PingRespPacket),
            PacketType::Disconnect => {
                Self::Disconnect(disconnect::DisconnectPacket::default().with_version(version))
            }
            PacketType::Auth => Self::Auth(auth::AuthPacket::default().with_version(version)),
        }
    }

    /// The variant as its packet contract
    #[must_use]
    pub fn as_packet(&self) -> &dyn MqttPacket {
        match self {
            Self::Connect(p) => p.as_ref(),
            Self::ConnAck(p) => p,
            Self::Publish(p) => p,
            Self::PubAck(p) => p,
            Self::PubRec(p) => p,
            Self::PubRel(p) => p,
            Self::PubComp(p) => p,
            Self::Subscribe(p) => p,
            Self::SubAck(p) => p,
            Self::Unsubscribe(p) => p,
            Self::UnsubAck(p) => p,
            Self::PingReq(p) => p,
            Self::PingResp(p) => p,
            Self::Disconnect(p) => p,
            Self::Auth(p) => p,
        }
    }

    pub fn as_packet_mut(&mut self) -> &mut dyn MqttPacket {
        match self {
            Self::Connect(p) => p.as_mut(),
            Self::ConnAck(p) => p,
            Self::Publish(p) => p,
            Self::PubAck(p) => p,
            Self::PubRec(p) => p,
            Self::PubRel(p) => p,
            Self::PubComp(p) => p,
            Self::Subscribe(p) => p,
            Self::SubAck(p) => p,
            Self::Unsubscribe(p) => p,
            Self::UnsubAck(p) => p,
            Self::PingReq(p) => p,
            Self::PingResp(p) => p,
            Self::Disconnect(p) => p,
            Self::Auth(p) => p,
        }
    }

    #[must_use]
    pub fn packet_type(&self) -> PacketType {
        self.as_packet().packet_type()
    }

    /// Packet identifier for the variants that carry one
    ///
    /// PUBLISH reports one only at `QoS` 1 and 2.
    #[must_use]
    pub fn packet_id(&self) -> Option<u16> {
        match self {
            Self::Publish(p) => p.packet_id,
            Self::PubAck(p) => Some(p.packet_id),
            Self::PubRec(p) => Some(p.packet_id),
            Self::PubRel(p) => Some(p.packet_id),
            Self::PubComp(p) => Some(p.packet_id),
            Self::Subscribe(p) => Some(p.packet_id),
            Self::SubAck(p) => Some(p.packet_id),
            Self::Unsubscribe(p) => Some(p.packet_id),
            Self::UnsubAck(p) => Some(p.packet_id),
            Self::Connect(_)
            | Self::ConnAck(_)
            | Self::PingReq(_)
            | Self::PingResp(_)
            | Self::Disconnect(_)
            | Self::Auth(_) => None,
        }
    }
}

/// Trait for MQTT packets
///
/// Encoding produces an ordered list of body segments; the fixed header is
/// computed from their total length at write time.
pub trait MqttPacket {
    /// Returns the packet type
    fn packet_type(&self) -> PacketType;

    /// Returns the fixed header flags
    fn flags(&self) -> u8 {
        self.packet_type().fixed_flags()
    }

    /// Decodes the packet body (without fixed header) into `self`
    ///
    /// `buf` holds exactly the remaining length of the packet. A present
    /// property bag selects the 5.0 layout.
    ///
    /// # Errors
    ///
    /// Returns an error if the body is malformed
    fn decode_body(&mut self, buf: &mut Bytes, fixed_header: &FixedHeader) -> Result<()>;

    /// Serializes the body as an ordered list of segments
    ///
    /// # Errors
    ///
    /// Returns an error if a field cannot be represented on the wire
    fn segments(&self) -> Result<Vec<Bytes>>;

    /// Writes the complete packet (with fixed header) and returns the byte count
    ///
    /// # Errors
    ///
    /// Returns an error if encoding or writing fails
    fn write_to<W: Write>(&self, writer: &mut W) -> Result<usize>
    where
        Self: Sized,
    {
        write_segments(writer, self.packet_type(), self.flags(), &self.segments()?)
    }
}

/// Fixed header for a body made of `segments`
///
/// # Errors
///
/// Returns `MalformedLength` if the body exceeds the Variable Byte Integer range
pub fn header_for(packet_type: PacketType, flags: u8, segments: &[Bytes]) -> Result<FixedHeader> {
    let body_len: usize = segments.iter().map(Bytes::len).sum();
    let remaining_length = VariableInt::try_from(body_len)?.value();
    Ok(FixedHeader::new(packet_type, flags, remaining_length))
}

/// Writes a fixed header and body segments with vectored writes
///
/// # Errors
///
/// Returns `MalformedLength` if the body is too large and `Io` if the writer fails
pub fn write_segments<W: Write>(
    writer: &mut W,
    packet_type: PacketType,
    flags: u8,
    segments: &[Bytes],
) -> Result<usize> {
    let header = header_for(packet_type, flags, segments)?;
    let mut header_buf = BytesMut::with_capacity(header.encoded_len());
    header.encode(&mut header_buf)?;

    let total = header_buf.len() + header.remaining_length as usize;

    let mut slices: Vec<IoSlice<'_>> = std::iter::once(&header_buf[..])
        .chain(segments.iter().map(|s| &s[..]))
        .filter(|s| !s.is_empty())
        .map(IoSlice::new)
        .collect();
    let mut bufs = &mut slices[..];

    while !bufs.is_empty() {
        match writer.write_vectored(bufs) {
            Ok(0) => {
                return Err(io::Error::new(
                    io::ErrorKind::WriteZero,
                    "failed to write whole packet",
                )
                .into());
            }
            Ok(n) => IoSlice::advance_slices(&mut bufs, n),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e.into()),
        }
    }

    Ok(total)
}

/// Property bag matching `version`, reusing `existing` when one is kept
pub(crate) fn bag_for_version(
    version: ProtocolVersion,
    existing: Option<Properties>,
) -> Option<Properties> {
    version
        .has_properties()
        .then(|| existing.unwrap_or_default())
}

/// Decodes a property block into `properties` if the bag is present
pub(crate) fn decode_properties(
    buf: &mut Bytes,
    properties: &mut Option<Properties>,
    context: PropertyContext,
) -> Result<()> {
    if properties.is_some() {
        *properties = Some(Properties::decode(buf, context)?);
    }
    Ok(())
}

/// Validates and appends the property block segment if the bag is present
pub(crate) fn push_properties(
    segments: &mut Vec<Bytes>,
    properties: Option<&Properties>,
    context: PropertyContext,
) -> Result<()> {
    if let Some(properties) = properties {
        properties.validate_for(context)?;
        segments.push(properties.to_segment()?);
    }
    Ok(())
}

/// Consumes and returns everything left in the body
pub(crate) fn take_remaining(buf: &mut Bytes) -> Bytes {
    buf.split_to(buf.len())
}
