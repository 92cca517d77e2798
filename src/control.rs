//! Control packet envelope: dispatch on the wire type byte, framing and
//! whole-packet reads and writes
//!
//! A [`ControlPacket`] pairs the fixed header seen on the wire with the
//! decoded [`Packet`]. On write the header is always recomputed from the
//! content, so the stored header only matters for packets that were read.

use crate::config::CodecConfig;
use crate::constants::limits::LARGE_PACKET_THRESHOLD;
use crate::error::{MqttError, Result};
use crate::packet::auth::AuthPacket;
use crate::packet::connack::ConnAckPacket;
use crate::packet::connect::ConnectPacket;
use crate::packet::disconnect::DisconnectPacket;
use crate::packet::pingreq::PingReqPacket;
use crate::packet::pingresp::PingRespPacket;
use crate::packet::puback::PubAckPacket;
use crate::packet::pubcomp::PubCompPacket;
use crate::packet::publish::PublishPacket;
use crate::packet::pubrec::PubRecPacket;
use crate::packet::pubrel::PubRelPacket;
use crate::packet::suback::SubAckPacket;
use crate::packet::subscribe::SubscribePacket;
use crate::packet::unsuback::UnsubAckPacket;
use crate::packet::unsubscribe::UnsubscribePacket;
use crate::packet::{header_for, write_segments, FixedHeader, Packet, PacketType};
use crate::protocol::ProtocolVersion;
use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::io::Read;
use std::io::Write;

/// A control packet with its fixed header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlPacket {
    /// Header as read from the wire, or as derived when built locally
    pub fixed_header: FixedHeader,
    pub content: Packet,
}

/// Builds a zero-valued packet for a wire type tag
///
/// Returns `None` if `type_tag` is not one of the fifteen packet types.
///
/// ```
/// use mqtt_packets::{new_control_packet, PacketType, ProtocolVersion};
///
/// let packet = new_control_packet(8, ProtocolVersion::V311).unwrap();
/// assert_eq!(packet.fixed_header.packet_type, PacketType::Subscribe);
/// assert_eq!(packet.fixed_header.flags, 0b0010);
/// assert!(new_control_packet(0, ProtocolVersion::V5).is_none());
/// ```
#[must_use]
pub fn new_control_packet(type_tag: u8, version: ProtocolVersion) -> Option<ControlPacket> {
    PacketType::from_u8(type_tag).map(|packet_type| ControlPacket::new(packet_type, version))
}

impl ControlPacket {
    /// Zero-valued packet of `packet_type` laid out for `version`
    #[must_use]
    pub fn new(packet_type: PacketType, version: ProtocolVersion) -> Self {
        Self::from(Packet::new(packet_type, version))
    }

    #[must_use]
    pub fn packet_type(&self) -> PacketType {
        self.content.packet_type()
    }

    /// Upper-case packet name, e.g. "PUBLISH"
    #[must_use]
    pub fn packet_type_name(&self) -> &'static str {
        self.packet_type().name()
    }

    /// Packet identifier, for the packet types that carry one
    #[must_use]
    pub fn packet_id(&self) -> Option<u16> {
        self.content.packet_id()
    }

    /// Fixed header the content would be written with
    ///
    /// # Errors
    ///
    /// Returns an error if the content cannot be encoded
    pub fn header(&self) -> Result<FixedHeader> {
        let content = self.content.as_packet();
        header_for(content.packet_type(), content.flags(), &content.segments()?)
    }

    /// Writes the packet as one vectored write and returns the byte count
    ///
    /// # Errors
    ///
    /// Returns an error if the content cannot be encoded or the writer fails
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<usize> {
        let content = self.content.as_packet();
        let segments = content.segments()?;
        write_segments(writer, content.packet_type(), content.flags(), &segments)
    }

    /// Encodes the packet into a contiguous buffer
    ///
    /// # Errors
    ///
    /// Returns an error if the content cannot be encoded
    pub fn encode<B: BufMut>(&self, buf: &mut B) -> Result<()> {
        let content = self.content.as_packet();
        let segments = content.segments()?;
        let header = header_for(content.packet_type(), content.flags(), &segments)?;

        header.encode(buf)?;
        for segment in &segments {
            buf.put_slice(segment);
        }
        Ok(())
    }

    /// Encodes the packet into a new `Bytes`
    ///
    /// # Errors
    ///
    /// Returns an error if the content cannot be encoded
    pub fn to_bytes(&self) -> Result<Bytes> {
        let mut buf = BytesMut::new();
        self.encode(&mut buf)?;
        Ok(buf.freeze())
    }

    /// Decodes one frame from the front of `buf`
    ///
    /// On success exactly one frame is consumed. If the buffer does not yet
    /// hold a whole frame nothing is consumed and `TruncatedInput` is
    /// returned.
    ///
    /// # Errors
    ///
    /// Returns `TruncatedInput` for incomplete input, `PacketTooLarge` above
    /// the configured limit, and any decode error of the packet body
    pub fn decode(buf: &mut Bytes, config: &CodecConfig) -> Result<Self> {
        let (fixed_header, header_len) = FixedHeader::parse(buf)?;
        check_size(&fixed_header, config)?;

        let frame_len = header_len + fixed_header.remaining_length as usize;
        if buf.len() < frame_len {
            return Err(MqttError::TruncatedInput {
                needed: frame_len,
                available: buf.len(),
            });
        }

        let mut frame = buf.split_to(frame_len);
        frame.advance(header_len);
        Self::decode_frame(fixed_header, frame, config.protocol_version)
    }

    /// Builds the packet for `fixed_header` and decodes `body` into it
    ///
    /// `body` must hold exactly the remaining length.
    pub(crate) fn decode_frame(
        fixed_header: FixedHeader,
        mut body: Bytes,
        version: ProtocolVersion,
    ) -> Result<Self> {
        let mut packet = Self::new(fixed_header.packet_type, version);
        packet
            .content
            .as_packet_mut()
            .decode_body(&mut body, &fixed_header)?;

        if body.has_remaining() {
            let declared = fixed_header.remaining_length as usize;
            return Err(MqttError::LengthMismatch {
                declared,
                actual: declared - body.remaining(),
            });
        }

        packet.fixed_header = fixed_header;
        Ok(packet)
    }
}

pub(crate) fn check_size(fixed_header: &FixedHeader, config: &CodecConfig) -> Result<()> {
    if fixed_header.remaining_length > config.maximum_packet_size {
        return Err(MqttError::PacketTooLarge {
            size: fixed_header.remaining_length as usize,
            max: config.maximum_packet_size as usize,
        });
    }
    if fixed_header.remaining_length > LARGE_PACKET_THRESHOLD {
        tracing::debug!(
            packet_type = %fixed_header.packet_type,
            remaining_length = fixed_header.remaining_length,
            "Receiving large packet"
        );
    }
    Ok(())
}

/// Reads one complete packet from a blocking reader
///
/// CONNECT takes its layout from its own protocol-version byte; every other
/// packet is decoded for `version`.
///
/// # Errors
///
/// Returns `Io` for reader failures, `LengthMismatch` if the stream ends
/// inside the body, and any decode error of the packet
pub fn read_packet<R: Read>(reader: &mut R, version: ProtocolVersion) -> Result<ControlPacket> {
    read_packet_with_config(reader, &CodecConfig::new(version))
}

/// Reads one complete packet, enforcing `config.maximum_packet_size`
///
/// # Errors
///
/// Returns `PacketTooLarge` before reading the body if the remaining length
/// exceeds the limit, plus everything [`read_packet`] returns
pub fn read_packet_with_config<R: Read>(
    reader: &mut R,
    config: &CodecConfig,
) -> Result<ControlPacket> {
    let fixed_header = FixedHeader::read_from(reader)?;
    check_size(&fixed_header, config)?;

    let declared = fixed_header.remaining_length as usize;
    let mut body = Vec::with_capacity(declared);
    let actual = reader
        .by_ref()
        .take(u64::from(fixed_header.remaining_length))
        .read_to_end(&mut body)?;
    if actual < declared {
        return Err(MqttError::LengthMismatch { declared, actual });
    }

    ControlPacket::decode_frame(fixed_header, Bytes::from(body), config.protocol_version)
}

impl From<Packet> for ControlPacket {
    fn from(content: Packet) -> Self {
        let packet_type = content.packet_type();
        let flags = content.as_packet().flags();
        Self {
            fixed_header: FixedHeader::new(packet_type, flags, 0),
            content,
        }
    }
}

macro_rules! impl_from_variant {
    ($($packet:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$packet> for ControlPacket {
                fn from(packet: $packet) -> Self {
                    Self::from(Packet::$variant(packet))
                }
            }
        )*
    };
}

impl_from_variant! {
    ConnAckPacket => ConnAck,
    PublishPacket => Publish,
    PubAckPacket => PubAck,
    PubRecPacket => PubRec,
    PubRelPacket => PubRel,
    PubCompPacket => PubComp,
    SubscribePacket => Subscribe,
    SubAckPacket => SubAck,
    UnsubscribePacket => Unsubscribe,
    UnsubAckPacket => UnsubAck,
    PingReqPacket => PingReq,
    PingRespPacket => PingResp,
    DisconnectPacket => Disconnect,
    AuthPacket => Auth,
}

impl From<ConnectPacket> for ControlPacket {
    fn from(packet: ConnectPacket) -> Self {
        Self::from(Packet::Connect(Box::new(packet)))
    }
}
