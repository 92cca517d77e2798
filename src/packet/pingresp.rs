use crate::error::Result;
use crate::packet::{FixedHeader, MqttPacket, PacketType};
use bytes::{Buf, Bytes};

/// MQTT PINGRESP packet
///
/// The body is always empty. Leftover bytes are reported by the envelope
/// as a length mismatch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PingRespPacket;

impl MqttPacket for PingRespPacket {
    fn packet_type(&self) -> PacketType {
        PacketType::PingResp
    }

    fn decode_body(&mut self, buf: &mut Bytes, fixed_header: &FixedHeader) -> Result<()> {
        tracing::trace!(
            fixed_header_remaining = fixed_header.remaining_length,
            buf_remaining = buf.remaining(),
            "PINGRESP decode started"
        );
        Ok(())
    }

    fn segments(&self) -> Result<Vec<Bytes>> {
        Ok(Vec::new())
    }
}
