//! Body layout shared by PUBACK, PUBREC, PUBREL and PUBCOMP
//!
//! 5.0 bodies have three forms: packet identifier only (reason Success, no
//! properties), identifier plus reason code, or identifier, reason code and
//! property block. Pre-5.0 bodies carry the identifier only.

use crate::encoding::decode_u16;
use crate::error::{MqttError, Result};
use crate::packet::{push_properties, FixedHeader, PacketType};
use crate::protocol::v5::properties::Properties;
use crate::protocol::v5::reason_codes::ReasonCode;
use bebytes::BeBytes;
use bytes::{Buf, Bytes};

/// Packet identifier and reason code, the long-form prefix of an ack body
#[derive(Debug, Clone, Copy, PartialEq, Eq, BeBytes)]
pub struct AckPacketHeader {
    #[bebytes(big_endian)]
    pub packet_id: u16,
    pub reason_code: u8,
}

/// Decoded ack body
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct AckBody {
    pub packet_id: u16,
    pub reason_code: ReasonCode,
    pub properties: Option<Properties>,
}

/// Decodes an ack body; the 5.0 layout is used iff `with_properties`
pub(crate) fn decode(
    buf: &mut Bytes,
    fixed_header: &FixedHeader,
    with_properties: bool,
) -> Result<AckBody> {
    let packet_type = fixed_header.packet_type;
    tracing::trace!(
        fixed_header_remaining = fixed_header.remaining_length,
        buf_remaining = buf.remaining(),
        "{packet_type} decode started"
    );

    let packet_id = decode_u16(buf, "packet identifier")?;

    if !with_properties {
        if buf.has_remaining() {
            tracing::debug!(
                skipped = buf.remaining(),
                "Skipping trailing bytes after {packet_type} packet identifier"
            );
            buf.advance(buf.remaining());
        }
        return Ok(AckBody {
            packet_id,
            reason_code: ReasonCode::Success,
            properties: None,
        });
    }

    if !buf.has_remaining() {
        tracing::debug!(packet_id, "{packet_type} short form: packet identifier only");
        return Ok(AckBody {
            packet_id,
            reason_code: ReasonCode::Success,
            properties: Some(Properties::new()),
        });
    }

    let reason_code = ReasonCode::decode_for(buf.get_u8(), packet_type)?;

    let properties = if buf.has_remaining() {
        Properties::decode(buf, packet_type.into())?
    } else {
        tracing::debug!(packet_id, "{packet_type} short form: no properties");
        Properties::new()
    };

    Ok(AckBody {
        packet_id,
        reason_code,
        properties: Some(properties),
    })
}

/// Serializes an ack body, choosing the shortest form that keeps every field
pub(crate) fn segments(
    packet_type: PacketType,
    packet_id: u16,
    reason_code: ReasonCode,
    properties: Option<&Properties>,
) -> Result<Vec<Bytes>> {
    let Some(properties) = properties else {
        return Ok(vec![Bytes::copy_from_slice(&packet_id.to_be_bytes())]);
    };

    if !reason_code.is_valid_for(packet_type) {
        return Err(MqttError::ProtocolError(format!(
            "Reason code {reason_code:?} is not valid in {packet_type}"
        )));
    }

    if properties.is_empty() {
        let body = if reason_code == ReasonCode::Success {
            Bytes::copy_from_slice(&packet_id.to_be_bytes())
        } else {
            Bytes::from(
                AckPacketHeader {
                    packet_id,
                    reason_code: u8::from(reason_code),
                }
                .to_be_bytes(),
            )
        };
        return Ok(vec![body]);
    }

    let header = AckPacketHeader {
        packet_id,
        reason_code: u8::from(reason_code),
    };
    let mut segments = vec![Bytes::from(header.to_be_bytes())];
    push_properties(&mut segments, Some(properties), packet_type.into())?;
    Ok(segments)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(packet_type: PacketType, len: usize) -> FixedHeader {
        FixedHeader::new(packet_type, packet_type.fixed_flags(), len as u32)
    }

    fn flatten(segments: &[Bytes]) -> Vec<u8> {
        segments.iter().flat_map(|s| s.iter().copied()).collect()
    }

    #[test]
    fn test_header_layout() {
        let header = AckPacketHeader {
            packet_id: 0x1234,
            reason_code: 0x10,
        };
        assert_eq!(header.to_be_bytes(), vec![0x12, 0x34, 0x10]);
    }

    #[test]
    fn test_encode_forms() {
        let empty = Properties::new();

        let short = segments(PacketType::PubAck, 0x1234, ReasonCode::Success, Some(&empty)).unwrap();
        assert_eq!(flatten(&short), vec![0x12, 0x34]);

        let reason = segments(
            PacketType::PubAck,
            0x1234,
            ReasonCode::NoMatchingSubscribers,
            Some(&empty),
        )
        .unwrap();
        assert_eq!(flatten(&reason), vec![0x12, 0x34, 0x10]);

        let mut props = Properties::new();
        props.set_reason_string("ok".to_string());
        let long = segments(PacketType::PubAck, 0x1234, ReasonCode::Success, Some(&props)).unwrap();
        assert_eq!(
            flatten(&long),
            vec![0x12, 0x34, 0x00, 0x05, 0x1F, 0x00, 0x02, b'o', b'k']
        );

        let v3 = segments(PacketType::PubAck, 0x1234, ReasonCode::Success, None).unwrap();
        assert_eq!(flatten(&v3), vec![0x12, 0x34]);
    }

    #[test]
    fn test_encode_rejects_wrong_reason() {
        let result = segments(
            PacketType::PubRel,
            1,
            ReasonCode::QuotaExceeded,
            Some(&Properties::new()),
        );
        assert!(matches!(result, Err(MqttError::ProtocolError(_))));
    }

    #[test]
    fn test_decode_forms() {
        let mut buf = Bytes::from_static(&[0x00, 0x07]);
        let body = decode(&mut buf, &header(PacketType::PubRec, 2), true).unwrap();
        assert_eq!(body.reason_code, ReasonCode::Success);
        assert_eq!(body.properties, Some(Properties::new()));

        let mut buf = Bytes::from_static(&[0x00, 0x07, 0x92]);
        let body = decode(&mut buf, &header(PacketType::PubComp, 3), true).unwrap();
        assert_eq!(body.reason_code, ReasonCode::PacketIdentifierNotFound);
        assert_eq!(body.properties, Some(Properties::new()));

        let mut buf = Bytes::from_static(&[0x00, 0x07, 0x00, 0x00]);
        let body = decode(&mut buf, &header(PacketType::PubAck, 4), true).unwrap();
        assert_eq!(body.reason_code, ReasonCode::Success);
        assert!(!buf.has_remaining());
    }

    #[test]
    fn test_decode_pre_v5_skips_trailing_bytes() {
        let mut buf = Bytes::from_static(&[0x00, 0x07, 0x80, 0x01]);
        let body = decode(&mut buf, &header(PacketType::PubAck, 4), false).unwrap();
        assert_eq!(body.packet_id, 7);
        assert!(body.properties.is_none());
        assert!(!buf.has_remaining());
    }

    #[test]
    fn test_decode_errors() {
        let mut buf = Bytes::from_static(&[0x00]);
        assert!(matches!(
            decode(&mut buf, &header(PacketType::PubAck, 1), true),
            Err(MqttError::MalformedPacket(_))
        ));

        // PacketIdentifierNotFound is not a PUBACK reason
        let mut buf = Bytes::from_static(&[0x00, 0x01, 0x92]);
        assert!(matches!(
            decode(&mut buf, &header(PacketType::PubAck, 3), true),
            Err(MqttError::MalformedPacket(_))
        ));

        // Topic Alias is not allowed in PUBREC properties
        let mut buf = Bytes::from_static(&[0x00, 0x01, 0x00, 0x03, 0x23, 0x00, 0x01]);
        assert!(matches!(
            decode(&mut buf, &header(PacketType::PubRec, 7), true),
            Err(MqttError::ProtocolError(_))
        ));
    }
}
