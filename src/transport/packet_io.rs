//! Async packet I/O over tokio streams
//!
//! Mirrors the blocking envelope: the same framing, size limit and error
//! mapping, with reads and writes awaited on `AsyncRead`/`AsyncWrite`.

use crate::config::CodecConfig;
use crate::constants::limits::MAX_VARIABLE_INT_BYTES;
use crate::constants::masks::{CONTINUATION_BIT, VARIABLE_BYTE_VALUE};
use crate::control::{check_size, ControlPacket};
use crate::error::{MqttError, Result};
use crate::packet::{header_for, FixedHeader};
use bytes::{Bytes, BytesMut};
use std::future::Future;
use std::io;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

async fn read_remaining_length<R: AsyncRead + Unpin>(reader: &mut R) -> Result<u32> {
    let mut value = 0u32;
    for position in 0..MAX_VARIABLE_INT_BYTES {
        let byte = match reader.read_u8().await {
            Ok(byte) => byte,
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                return Err(MqttError::MalformedLength(
                    "stream ended inside variable byte integer".to_string(),
                ));
            }
            Err(e) => return Err(e.into()),
        };
        value |= u32::from(byte & VARIABLE_BYTE_VALUE) << (7 * position);
        if byte & CONTINUATION_BIT == 0 {
            return Ok(value);
        }
    }

    Err(MqttError::MalformedLength(
        "variable byte integer exceeds 4 bytes".to_string(),
    ))
}

/// Reads one complete packet from an async reader
///
/// # Errors
///
/// Same as the blocking `read_packet_with_config`: `Io` for reader
/// failures, `PacketTooLarge` before the body is read, `LengthMismatch` if
/// the stream ends inside the body, and any decode error of the packet
pub async fn read_packet_async<R: AsyncRead + Unpin>(
    reader: &mut R,
    config: &CodecConfig,
) -> Result<ControlPacket> {
    let first = reader.read_u8().await?;
    let (packet_type, flags) = FixedHeader::split_first_byte(first)?;
    let remaining_length = read_remaining_length(reader).await?;

    let fixed_header = FixedHeader::new(packet_type, flags, remaining_length);
    check_size(&fixed_header, config)?;

    let declared = remaining_length as usize;
    let mut body = Vec::with_capacity(declared);
    let actual = (&mut *reader)
        .take(u64::from(remaining_length))
        .read_to_end(&mut body)
        .await?;
    if actual < declared {
        return Err(MqttError::LengthMismatch { declared, actual });
    }

    ControlPacket::decode_frame(fixed_header, Bytes::from(body), config.protocol_version)
}

impl ControlPacket {
    /// Writes the header and each segment in order, then flushes
    ///
    /// # Errors
    ///
    /// Returns an error if the content cannot be encoded or the writer fails
    pub async fn write_to_async<W: AsyncWrite + Unpin>(&self, writer: &mut W) -> Result<usize> {
        let (header, segments) = {
            let content = self.content.as_packet();
            let segments = content.segments()?;
            let header = header_for(content.packet_type(), content.flags(), &segments)?;
            (header, segments)
        };

        let mut header_buf = BytesMut::with_capacity(header.encoded_len());
        header.encode(&mut header_buf)?;
        writer.write_all(&header_buf).await?;
        for segment in &segments {
            writer.write_all(segment).await?;
        }
        writer.flush().await?;

        Ok(header_buf.len() + header.remaining_length as usize)
    }
}

/// Packet reads and writes on any async byte stream
pub trait PacketIo: AsyncRead + AsyncWrite + Unpin + Send + Sized {
    /// Reads a complete MQTT packet
    ///
    /// # Errors
    ///
    /// Returns an error if reading or decoding fails
    fn read_packet<'a>(
        &'a mut self,
        config: &'a CodecConfig,
    ) -> impl Future<Output = Result<ControlPacket>> + Send + 'a {
        async move { read_packet_async(self, config).await }
    }

    /// Writes a complete MQTT packet and returns the byte count
    ///
    /// # Errors
    ///
    /// Returns an error if encoding or writing fails
    fn write_packet<'a>(
        &'a mut self,
        packet: &'a ControlPacket,
    ) -> impl Future<Output = Result<usize>> + Send + 'a {
        async move { packet.write_to_async(self).await }
    }
}

impl<T: AsyncRead + AsyncWrite + Unpin + Send> PacketIo for T {}
