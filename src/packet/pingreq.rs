use crate::error::Result;
use crate::packet::{FixedHeader, MqttPacket, PacketType};
use bytes::{Buf, Bytes};

/// MQTT PINGREQ packet
///
/// The body is always empty. Leftover bytes are reported by the envelope
/// as a length mismatch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PingReqPacket;

impl MqttPacket for PingReqPacket {
    fn packet_type(&self) -> PacketType {
        PacketType::PingReq
    }

    fn decode_body(&mut self, buf: &mut Bytes, fixed_header: &FixedHeader) -> Result<()> {
        tracing::trace!(
            fixed_header_remaining = fixed_header.remaining_length,
            buf_remaining = buf.remaining(),
            "PINGREQ decode started"
        );
        Ok(())
    }

    fn segments(&self) -> Result<Vec<Bytes>> {
        Ok(Vec::new())
    }
}
